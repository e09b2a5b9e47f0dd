use std::sync::RwLock;

use hashline_types::{ChainHash, Ledger, Record, RecordNum};

use crate::error::{StoreError, StoreResult};
use crate::traits::LedgerStore;

/// In-memory ledger store.
///
/// Intended for tests and embedding. Holds a full copy of the chain behind a
/// `RwLock`; records are cloned on write and on load.
pub struct InMemoryLedgerStore {
    reserved: ChainHash,
    ledger: RwLock<Ledger>,
}

impl InMemoryLedgerStore {
    /// Create an empty store whose empty-ledger hash is `reserved`.
    pub fn new(reserved: ChainHash) -> Self {
        Self {
            ledger: RwLock::new(Ledger::empty(reserved.clone())),
            reserved,
        }
    }

    /// Create a store pre-populated with `ledger`.
    pub fn with_ledger(reserved: ChainHash, ledger: Ledger) -> Self {
        Self {
            reserved,
            ledger: RwLock::new(ledger),
        }
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.ledger.read().map(|l| l.records.len()).unwrap_or(0)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn refresh_summary(&self, ledger: &mut Ledger) {
        ledger.num = ledger.records.len() as RecordNum;
        ledger.hash = match ledger.records.last() {
            Some(last) => last.hash.clone(),
            None => self.reserved.clone(),
        };
    }
}

fn check_range(ledger: &Ledger, num: RecordNum) -> StoreResult<usize> {
    let len = ledger.records.len();
    if num == 0 || usize::from(num) > len {
        return Err(StoreError::OutOfRange {
            num,
            len: len as RecordNum,
        });
    }
    Ok(usize::from(num) - 1)
}

impl LedgerStore for InMemoryLedgerStore {
    fn load(&self) -> StoreResult<Ledger> {
        let ledger = self.ledger.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(ledger.clone())
    }

    fn append(&self, record: &Record) -> StoreResult<()> {
        let mut ledger = self.ledger.write().map_err(|_| StoreError::LockPoisoned)?;
        let len = ledger.records.len() as RecordNum;
        let expected = len.checked_add(1).ok_or(StoreError::OutOfRange {
            num: record.num,
            len,
        })?;
        if record.num != expected {
            return Err(StoreError::OutOfOrder {
                expected,
                actual: record.num,
            });
        }
        ledger.records.push(record.clone());
        self.refresh_summary(&mut ledger);
        Ok(())
    }

    fn replace(&self, record: &Record, num: RecordNum) -> StoreResult<()> {
        let mut ledger = self.ledger.write().map_err(|_| StoreError::LockPoisoned)?;
        let index = check_range(&ledger, num)?;
        ledger.records[index] = record.clone();
        self.refresh_summary(&mut ledger);
        Ok(())
    }

    fn remove(&self, num: RecordNum) -> StoreResult<()> {
        let mut ledger = self.ledger.write().map_err(|_| StoreError::LockPoisoned)?;
        let index = check_range(&ledger, num)?;
        ledger.records.remove(index);
        self.refresh_summary(&mut ledger);
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        let mut ledger = self.ledger.write().map_err(|_| StoreError::LockPoisoned)?;
        ledger.records.clear();
        self.refresh_summary(&mut ledger);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedgerStore")
            .field("record_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashline_crypto::{Blake3Digest, DigestAlgorithm};

    fn record(num: RecordNum, tag: u8) -> Record {
        Record::new(
            ChainHash::from_slice(&[tag; 32]),
            ChainHash::zeroed(32),
            num,
            vec![tag],
        )
    }

    fn store() -> InMemoryLedgerStore {
        InMemoryLedgerStore::new(Blake3Digest.reserved())
    }

    #[test]
    fn empty_store_loads_empty_ledger() {
        let s = store();
        let ledger = s.load().unwrap();
        assert_eq!(ledger.num, 0);
        assert!(ledger.hash.is_zero());
        assert!(s.is_empty());
    }

    #[test]
    fn append_tracks_header() {
        let s = store();
        s.append(&record(1, 1)).unwrap();
        s.append(&record(2, 2)).unwrap();
        let ledger = s.load().unwrap();
        assert_eq!(ledger.num, 2);
        assert_eq!(ledger.hash, ChainHash::from_slice(&[2; 32]));
    }

    #[test]
    fn append_out_of_order_rejected() {
        let s = store();
        let err = s.append(&record(2, 1)).unwrap_err();
        assert!(matches!(err, StoreError::OutOfOrder { expected: 1, actual: 2 }));
    }

    #[test]
    fn replace_and_remove_check_range() {
        let s = store();
        s.append(&record(1, 1)).unwrap();
        assert!(matches!(
            s.replace(&record(2, 9), 2),
            Err(StoreError::OutOfRange { num: 2, len: 1 })
        ));
        assert!(matches!(s.remove(0), Err(StoreError::OutOfRange { num: 0, .. })));
    }

    #[test]
    fn remove_last_resets_to_reserved() {
        let s = store();
        s.append(&record(1, 1)).unwrap();
        s.remove(1).unwrap();
        let ledger = s.load().unwrap();
        assert_eq!(ledger.num, 0);
        assert!(ledger.hash.is_zero());
    }

    #[test]
    fn replace_last_updates_header() {
        let s = store();
        s.append(&record(1, 1)).unwrap();
        s.replace(&record(1, 7), 1).unwrap();
        assert_eq!(s.load().unwrap().hash, ChainHash::from_slice(&[7; 32]));
    }

    #[test]
    fn clear_empties_store() {
        let s = store();
        s.append(&record(1, 1)).unwrap();
        s.clear().unwrap();
        assert!(s.is_empty());
    }
}
