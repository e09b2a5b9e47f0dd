use hashline_types::RecordNum;

/// Errors from ledger store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A position outside `1..=len` was addressed.
    #[error("record {num} out of range (stored: {len})")]
    OutOfRange { num: RecordNum, len: RecordNum },

    /// An append did not carry the next record number.
    #[error("append out of order: expected record {expected}, got {actual}")]
    OutOfOrder { expected: RecordNum, actual: RecordNum },

    /// The header names a record that has no file on disk.
    #[error("missing record file for {0}")]
    MissingRecord(RecordNum),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A thread panicked while holding the store lock.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
