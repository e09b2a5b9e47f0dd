use hashline_types::{Ledger, Record, RecordNum};

use crate::error::StoreResult;

/// Durable mirror of a ledger.
///
/// All positions are 1-based. Implementations must satisfy:
/// - After every successful call the stored header equals the hash and
///   number of the last stored record (or the reserved hash and 0).
/// - `remove(num)` shifts every later record down by one position. The
///   shifted records keep their old contents until the caller rewrites them
///   with `replace`.
/// - Failed calls leave previously stored records readable.
pub trait LedgerStore: Send + Sync {
    /// Read the whole stored chain.
    fn load(&self) -> StoreResult<Ledger>;

    /// Store `record` after the current last one. `record.num` must be the
    /// next position.
    fn append(&self, record: &Record) -> StoreResult<()>;

    /// Overwrite the record at `num`.
    fn replace(&self, record: &Record, num: RecordNum) -> StoreResult<()>;

    /// Drop the record at `num`.
    fn remove(&self, num: RecordNum) -> StoreResult<()>;

    /// Drop every record.
    fn clear(&self) -> StoreResult<()>;
}
