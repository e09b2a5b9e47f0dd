//! Persistence for the Hashline ledger.
//!
//! The in-memory chain is the source of truth while a node runs; a
//! [`LedgerStore`] mirrors every mutation so the chain survives a restart.
//!
//! # Storage Backends
//!
//! - [`InMemoryLedgerStore`] -- keeps a copy of the chain in memory; for tests
//!   and embedding
//! - [`FileLedgerStore`] -- one file per record plus a header file, written
//!   atomically through a temp file and rename
//!
//! # Design Rules
//!
//! 1. A store never validates hashes. It only tracks positions.
//! 2. The stored header always reflects the last stored record.
//! 3. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileLedgerStore;
pub use memory::InMemoryLedgerStore;
pub use traits::LedgerStore;
