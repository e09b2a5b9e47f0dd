use serde::{Deserialize, Serialize};

use crate::hash::ChainHash;

/// Position of a record in its chain, starting at 1.
///
/// Record numbers travel as two little-endian bytes both in the hash
/// preimage and on the wire, which caps a chain at `u16::MAX` records.
pub type RecordNum = u16;

/// Width in bytes of an encoded [`RecordNum`].
pub const NUM_SIZE: usize = 2;

/// A single chain entry.
///
/// `hash` is expected to equal `digest(prev_hash ‖ num_le ‖ data)` and
/// `prev_hash` to equal the hash of the record at `num - 1` (or the reserved
/// zero hash for record #1). The struct does not enforce either.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub hash: ChainHash,
    pub prev_hash: ChainHash,
    pub num: RecordNum,
    pub data: Vec<u8>,
}

impl Record {
    pub fn new(hash: ChainHash, prev_hash: ChainHash, num: RecordNum, data: Vec<u8>) -> Self {
        Self {
            hash,
            prev_hash,
            num,
            data,
        }
    }

    /// Bytes fed to the digest to produce this record's hash.
    pub fn preimage(&self) -> Vec<u8> {
        preimage(&self.prev_hash, self.num, &self.data)
    }
}

/// `prev_hash ‖ num (2 bytes, little-endian) ‖ data`.
pub fn preimage(prev_hash: &ChainHash, num: RecordNum, data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(prev_hash.len() + NUM_SIZE + data.len());
    buf.extend_from_slice(prev_hash.as_bytes());
    buf.extend_from_slice(&num.to_le_bytes());
    buf.extend_from_slice(data);
    buf
}

/// Summary of a ledger: hash and number of its last record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerHeader {
    pub hash: ChainHash,
    pub num: RecordNum,
}

impl LedgerHeader {
    pub fn new(hash: ChainHash, num: RecordNum) -> Self {
        Self { hash, num }
    }
}

/// The full chain plus its summary fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub hash: ChainHash,
    pub num: RecordNum,
    pub records: Vec<Record>,
}

impl Ledger {
    /// An empty ledger whose summary hash is the given reserved value.
    pub fn empty(reserved: ChainHash) -> Self {
        Self {
            hash: reserved,
            num: 0,
            records: Vec::new(),
        }
    }

    /// A ledger that so far only knows its summary (used while downloading).
    pub fn from_header(header: LedgerHeader) -> Self {
        Self {
            hash: header.hash,
            num: header.num,
            records: Vec::new(),
        }
    }

    pub fn header(&self) -> LedgerHeader {
        LedgerHeader::new(self.hash.clone(), self.num)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn preimage_layout() {
        let prev = ChainHash::from_slice(&[9, 9]);
        let record = Record::new(ChainHash::default(), prev, 0x0102, b"ab".to_vec());
        assert_eq!(record.preimage(), vec![9, 9, 0x02, 0x01, b'a', b'b']);
    }

    #[test]
    fn empty_ledger_summary() {
        let ledger = Ledger::empty(ChainHash::zeroed(32));
        assert!(ledger.is_empty());
        assert_eq!(ledger.num, 0);
        assert!(ledger.hash.is_zero());
        assert!(ledger.last().is_none());
    }

    #[test]
    fn header_from_ledger() {
        let ledger = Ledger {
            hash: ChainHash::from_slice(&[7; 4]),
            num: 3,
            records: vec![],
        };
        assert_eq!(ledger.header(), LedgerHeader::new(ChainHash::from_slice(&[7; 4]), 3));
        let restored = Ledger::from_header(ledger.header());
        assert_eq!(restored.num, 3);
        assert!(restored.records.is_empty());
    }

    proptest! {
        #[test]
        fn preimage_length_is_sum_of_parts(
            prev in proptest::collection::vec(any::<u8>(), 0..64),
            num in any::<u16>(),
            data in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let bytes = preimage(&ChainHash::from_vec(prev.clone()), num, &data);
            prop_assert_eq!(bytes.len(), prev.len() + NUM_SIZE + data.len());
            prop_assert_eq!(&bytes[prev.len()..prev.len() + NUM_SIZE], &num.to_le_bytes()[..]);
        }
    }
}
