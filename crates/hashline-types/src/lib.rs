//! Foundation types for Hashline.
//!
//! This crate holds the plain data carried by every other Hashline crate.
//! Nothing here validates itself: a [`Record`] or [`Ledger`] may describe a
//! broken chain, and it is the job of `hashline-ledger` to decide whether it
//! is acceptable.
//!
//! # Key Types
//!
//! - [`ChainHash`] -- Digest output of whatever algorithm the node runs with
//! - [`Record`] -- One chain entry linked to its predecessor by hash
//! - [`Ledger`] -- The ordered chain plus a summary of its last record
//! - [`LedgerHeader`] -- The summary alone, as exchanged between peers

pub mod error;
pub mod hash;
pub mod record;

pub use error::TypeError;
pub use hash::ChainHash;
pub use record::{preimage, Ledger, LedgerHeader, Record, RecordNum, NUM_SIZE};
