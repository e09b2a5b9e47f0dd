//! Digest algorithms for Hashline.
//!
//! Record identity is a hash over the predecessor hash, the record number and
//! the record data. Which hash function computes it is a deployment choice:
//! the ledger and the wire codec only ever see a [`DigestAlgorithm`] trait
//! object, so switching algorithms never touches validation code.
//!
//! All digest operations wrap established libraries.

pub mod digest;
pub mod kind;

pub use digest::{Blake3Digest, DigestAlgorithm, Sha256Digest, SharedDigest};
pub use kind::{DigestKind, UnknownDigest};
