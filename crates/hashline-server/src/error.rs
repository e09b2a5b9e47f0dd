use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] hashline_protocol::ProtocolError),

    #[error("ledger error: {0}")]
    Ledger(#[from] hashline_ledger::LedgerError),

    #[error("store error: {0}")]
    Store(#[from] hashline_store::StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;
