//! Hash-linked record chain for Hashline.
//!
//! This crate is the heart of the node. It provides:
//! - [`Validator`] for single records, links, and whole ledgers
//! - [`ChainLedger`], the in-memory chain whose every edit re-links and
//!   re-hashes all following records
//! - [`SyncLedger`] for assembling a chain downloaded newest-first
//! - [`StoredLedger`], a `ChainLedger` mirrored to a persistence backend
//!
//! A record's hash covers its predecessor's hash and its own position, so any
//! structural edit at position `p` changes the identity of every record at
//! `p` and after. `ChainLedger` recomputes that suffix on each edit.

pub mod chain;
pub mod error;
pub mod stored;
pub mod sync;
pub mod validator;

pub use chain::ChainLedger;
pub use error::{LedgerError, LedgerResult};
pub use stored::StoredLedger;
pub use sync::SyncLedger;
pub use validator::{LinkTarget, Validator};
