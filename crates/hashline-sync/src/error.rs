use std::time::Duration;

use hashline_protocol::Operation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("peer denied request: {0}")]
    Denied(String),

    #[error("unexpected response: wanted {expected}, got {actual}")]
    UnexpectedResponse {
        expected: Operation,
        actual: Operation,
    },

    #[error("peer did not answer within {0:?}")]
    Timeout(Duration),

    #[error("chain is full, no record can follow {0}")]
    ChainFull(u16),

    #[error("protocol error: {0}")]
    Protocol(#[from] hashline_protocol::ProtocolError),

    #[error("ledger error: {0}")]
    Ledger(#[from] hashline_ledger::LedgerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;
