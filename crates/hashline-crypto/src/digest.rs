use std::sync::Arc;

use hashline_types::{preimage, ChainHash, RecordNum};
use sha2::{Digest as _, Sha256};

/// Hashing strategy used to chain records.
///
/// Implementations produce digests of a fixed width. The all-zero value of
/// that width is reserved as the `prev_hash` of record #1 and as the summary
/// hash of an empty ledger.
pub trait DigestAlgorithm: Send + Sync {
    /// Short name, used in logs and configuration.
    fn name(&self) -> &'static str;

    /// Width of every digest in bytes.
    fn size(&self) -> usize;

    /// Hash raw bytes.
    fn digest(&self, data: &[u8]) -> ChainHash;

    /// The "no predecessor" marker: `size()` zero bytes.
    fn reserved(&self) -> ChainHash {
        ChainHash::zeroed(self.size())
    }

    /// Whether `hash` could have been produced by this algorithm.
    fn is_well_formed(&self, hash: &ChainHash) -> bool {
        hash.len() == self.size()
    }

    /// Hash of a record with the given fields.
    fn hash_record(&self, prev_hash: &ChainHash, num: RecordNum, data: &[u8]) -> ChainHash {
        self.digest(&preimage(prev_hash, num, data))
    }
}

/// Digest handle shared between the ledger, codec, and server tasks.
pub type SharedDigest = Arc<dyn DigestAlgorithm>;

/// BLAKE3, 32-byte output.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3Digest;

impl DigestAlgorithm for Blake3Digest {
    fn name(&self) -> &'static str {
        "blake3"
    }

    fn size(&self) -> usize {
        blake3::OUT_LEN
    }

    fn digest(&self, data: &[u8]) -> ChainHash {
        ChainHash::from_slice(blake3::hash(data).as_bytes())
    }
}

/// SHA-256, 32-byte output.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Digest;

impl DigestAlgorithm for Sha256Digest {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn size(&self) -> usize {
        32
    }

    fn digest(&self, data: &[u8]) -> ChainHash {
        ChainHash::from_slice(Sha256::digest(data).as_slice())
    }
}
