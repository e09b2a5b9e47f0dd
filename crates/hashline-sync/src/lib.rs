//! Client side of the Hashline protocol.
//!
//! [`PeerClient`] dials a trusted peer and [`PeerSession`] runs requests over
//! an open connection: ask for the header or a single record, download the
//! whole chain into a [`hashline_ledger::SyncLedger`], or submit new data as
//! the next record.

pub mod client;
pub mod error;

pub use client::{scan, ClientOptions, PeerClient, PeerSession, ScanEntry};
pub use error::{SyncError, SyncResult};
