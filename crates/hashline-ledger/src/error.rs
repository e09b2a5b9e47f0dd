use hashline_store::StoreError;

/// Errors produced by ledger operations.
///
/// The four validation kinds are what a peer sees in a `DENY` reply, so
/// their messages are kept short and human readable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("invalid record number: {0}")]
    InvalidNumber(String),

    #[error("invalid record order: {0}")]
    InvalidOrder(String),

    #[error("invalid link: {0}")]
    InvalidLink(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("ledger lock poisoned")]
    LockPoisoned,
}

impl LedgerError {
    /// Returns `true` for the four chain validation kinds.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidHash(_) | Self::InvalidNumber(_) | Self::InvalidOrder(_) | Self::InvalidLink(_)
        )
    }
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        Self::Store(e.to_string())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
