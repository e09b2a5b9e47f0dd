use std::sync::Arc;

use hashline_crypto::SharedDigest;
use hashline_store::{LedgerStore, StoreResult};
use hashline_types::{Ledger, LedgerHeader, Record, RecordNum};
use tracing::{debug, error, info, warn};

use crate::chain::ChainLedger;
use crate::error::LedgerResult;

/// A [`ChainLedger`] whose every mutation is mirrored to a [`LedgerStore`].
///
/// The in-memory chain only changes once the store has accepted the write.
/// When a multi-step write fails part way, the store is rewritten from the
/// unchanged chain so both sides stay in step.
pub struct StoredLedger {
    chain: ChainLedger,
    store: Arc<dyn LedgerStore>,
}

impl StoredLedger {
    /// Load the persisted chain and check it before serving it.
    pub fn open(digest: SharedDigest, store: Arc<dyn LedgerStore>) -> LedgerResult<Self> {
        let ledger = store.load()?;
        let chain = ChainLedger::from_ledger(digest, ledger)?;
        info!(num = chain.num(), hash = %chain.header().hash.short_hex(), "ledger loaded");
        Ok(Self { chain, store })
    }

    pub fn chain(&self) -> &ChainLedger {
        &self.chain
    }

    pub fn ledger(&self) -> &Ledger {
        self.chain.ledger()
    }

    pub fn header(&self) -> LedgerHeader {
        self.chain.header()
    }

    pub fn num(&self) -> RecordNum {
        self.chain.num()
    }

    pub fn get(&self, num: RecordNum) -> LedgerResult<&Record> {
        self.chain.get(num)
    }

    pub fn next_record(&self, data: Vec<u8>) -> LedgerResult<Record> {
        self.chain.next_record(data)
    }

    /// Validate a record received from a peer and append it unchanged.
    ///
    /// The record must already be the exact continuation of the current
    /// tail; nothing is recomputed on its behalf.
    pub fn accept(&mut self, record: Record) -> LedgerResult<()> {
        self.chain.validator().validate_append(self.chain.ledger(), &record)?;
        self.append(record).map(|_| ())
    }

    pub fn append(&mut self, record: Record) -> LedgerResult<&Record> {
        self.chain.append(record)?;
        let index = self.chain.len() - 1;
        if let Err(e) = self.store.append(&self.chain.records()[index]) {
            warn!(error = %e, "store rejected append, rolling back");
            self.chain.pop();
            return Err(e.into());
        }
        debug!(num = self.chain.num(), "record appended");
        Ok(&self.chain.records()[index])
    }

    pub fn replace(&mut self, record: Record, num: RecordNum) -> LedgerResult<()> {
        let mut next = self.chain.clone();
        next.replace(record, num)?;
        if let Err(e) = self.rewrite_from(&next, num) {
            self.restore_store();
            return Err(e.into());
        }
        self.chain = next;
        debug!(num, "record replaced");
        Ok(())
    }

    pub fn remove(&mut self, num: RecordNum) -> LedgerResult<Record> {
        let mut next = self.chain.clone();
        let removed = next.remove(num)?;
        let written = self
            .store
            .remove(num)
            .and_then(|()| self.rewrite_from(&next, num));
        if let Err(e) = written {
            self.restore_store();
            return Err(e.into());
        }
        self.chain = next;
        debug!(num, "record removed");
        Ok(removed)
    }

    pub fn clear(&mut self) -> LedgerResult<()> {
        self.store.clear()?;
        self.chain.clear();
        debug!("ledger cleared");
        Ok(())
    }

    /// Write every record of `next` from position `num` onwards.
    fn rewrite_from(&self, next: &ChainLedger, num: RecordNum) -> StoreResult<()> {
        next.records()
            .iter()
            .skip(usize::from(num) - 1)
            .try_for_each(|changed| self.store.replace(changed, changed.num))
    }

    /// Put the store back in step with the in-memory chain after a
    /// multi-step write failed part way.
    fn restore_store(&self) {
        let restored = self
            .store
            .clear()
            .and_then(|()| self.chain.records().iter().try_for_each(|r| self.store.append(r)));
        match restored {
            Ok(()) => warn!(num = self.chain.num(), "store rewritten after failed update"),
            Err(e) => error!(error = %e, "store could not be restored"),
        }
    }
}

impl std::fmt::Debug for StoredLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredLedger")
            .field("num", &self.chain.num())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use hashline_crypto::{Blake3Digest, DigestAlgorithm};
    use hashline_store::{FileLedgerStore, InMemoryLedgerStore, StoreError, StoreResult};
    use hashline_types::ChainHash;

    use super::*;
    use crate::error::LedgerError;

    fn digest() -> SharedDigest {
        Arc::new(Blake3Digest)
    }

    fn memory() -> Arc<InMemoryLedgerStore> {
        Arc::new(InMemoryLedgerStore::new(Blake3Digest.reserved()))
    }

    fn fill(ledger: &mut StoredLedger, count: u8) {
        for i in 0..count {
            let record = ledger.next_record(vec![i]).unwrap();
            ledger.append(record).unwrap();
        }
    }

    /// Store that refuses every write.
    struct FailingStore;

    impl LedgerStore for FailingStore {
        fn load(&self) -> StoreResult<Ledger> {
            Ok(Ledger::empty(Blake3Digest.reserved()))
        }
        fn append(&self, _: &Record) -> StoreResult<()> {
            Err(StoreError::LockPoisoned)
        }
        fn replace(&self, _: &Record, _: RecordNum) -> StoreResult<()> {
            Err(StoreError::LockPoisoned)
        }
        fn remove(&self, _: RecordNum) -> StoreResult<()> {
            Err(StoreError::LockPoisoned)
        }
        fn clear(&self) -> StoreResult<()> {
            Err(StoreError::LockPoisoned)
        }
    }

    /// Store whose `replace` always fails; everything else is delegated.
    struct ReplaceFails<S>(S);

    impl<S: LedgerStore> LedgerStore for ReplaceFails<S> {
        fn load(&self) -> StoreResult<Ledger> {
            self.0.load()
        }
        fn append(&self, record: &Record) -> StoreResult<()> {
            self.0.append(record)
        }
        fn replace(&self, _: &Record, _: RecordNum) -> StoreResult<()> {
            Err(StoreError::LockPoisoned)
        }
        fn remove(&self, num: RecordNum) -> StoreResult<()> {
            self.0.remove(num)
        }
        fn clear(&self) -> StoreResult<()> {
            self.0.clear()
        }
    }

    #[test]
    fn appends_reach_store() {
        let store = memory();
        let mut ledger = StoredLedger::open(digest(), store.clone()).unwrap();
        fill(&mut ledger, 3);
        assert_eq!(&store.load().unwrap(), ledger.ledger());
    }

    #[test]
    fn replace_rewrites_suffix_in_store() {
        let store = memory();
        let mut ledger = StoredLedger::open(digest(), store.clone()).unwrap();
        fill(&mut ledger, 4);
        let replacement = Record::new(ChainHash::default(), ChainHash::default(), 0, b"z".to_vec());
        ledger.replace(replacement, 2).unwrap();
        assert_eq!(&store.load().unwrap(), ledger.ledger());
        ledger.chain().validate().unwrap();
    }

    #[test]
    fn remove_keeps_store_in_step() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileLedgerStore::open(dir.path(), Blake3Digest.reserved()).unwrap());
        let mut ledger = StoredLedger::open(digest(), store.clone()).unwrap();
        fill(&mut ledger, 4);

        let removed = ledger.remove(2).unwrap();
        assert_eq!(removed.data, vec![1]);
        assert_eq!(&store.load().unwrap(), ledger.ledger());

        let reopened = StoredLedger::open(digest(), store).unwrap();
        assert_eq!(reopened.ledger(), ledger.ledger());
    }

    #[test]
    fn accept_requires_exact_continuation() {
        let mut ledger = StoredLedger::open(digest(), memory()).unwrap();
        fill(&mut ledger, 2);

        let good = ledger.next_record(b"ok".to_vec()).unwrap();
        let mut bad = good.clone();
        bad.prev_hash = ChainHash::from_slice(&[7; 32]);
        bad.hash = Blake3Digest.hash_record(&bad.prev_hash, bad.num, &bad.data);

        assert!(matches!(ledger.accept(bad), Err(LedgerError::InvalidLink(_))));
        assert_eq!(ledger.num(), 2);
        ledger.accept(good).unwrap();
        assert_eq!(ledger.num(), 3);
    }

    #[test]
    fn store_failure_rolls_back() {
        let mut ledger = StoredLedger::open(digest(), Arc::new(FailingStore)).unwrap();
        let record = ledger.next_record(b"x".to_vec()).unwrap();
        assert!(matches!(ledger.append(record), Err(LedgerError::Store(_))));
        assert_eq!(ledger.num(), 0);
        assert_eq!(ledger.header().hash, Blake3Digest.reserved());
    }

    #[test]
    fn corrupt_store_refused_on_open() {
        let store = memory();
        let bogus = Record::new(
            ChainHash::from_slice(&[1; 32]),
            Blake3Digest.reserved(),
            1,
            b"x".to_vec(),
        );
        store.append(&bogus).unwrap();
        assert!(matches!(
            StoredLedger::open(digest(), store),
            Err(LedgerError::InvalidHash(_))
        ));
    }

    #[test]
    fn clear_empties_both_sides() {
        let store = memory();
        let mut ledger = StoredLedger::open(digest(), store.clone()).unwrap();
        fill(&mut ledger, 2);
        ledger.clear().unwrap();
        assert_eq!(ledger.num(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn failed_remove_restores_store() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileLedgerStore::open(dir.path(), Blake3Digest.reserved()).unwrap();
        let store = Arc::new(ReplaceFails(files));
        let mut ledger = StoredLedger::open(digest(), store.clone()).unwrap();
        fill(&mut ledger, 3);
        let before = ledger.ledger().clone();

        assert!(matches!(ledger.remove(1), Err(LedgerError::Store(_))));
        assert_eq!(ledger.ledger(), &before);
        assert_eq!(store.load().unwrap(), before);

        let reopened = StoredLedger::open(digest(), store).unwrap();
        assert_eq!(reopened.ledger(), &before);
    }

    #[test]
    fn failed_replace_restores_store() {
        let store = Arc::new(ReplaceFails(InMemoryLedgerStore::new(Blake3Digest.reserved())));
        let mut ledger = StoredLedger::open(digest(), store.clone()).unwrap();
        fill(&mut ledger, 3);
        let before = ledger.ledger().clone();

        let replacement = Record::new(ChainHash::default(), ChainHash::default(), 0, b"z".to_vec());
        assert!(matches!(ledger.replace(replacement, 2), Err(LedgerError::Store(_))));
        assert_eq!(ledger.ledger(), &before);
        assert_eq!(store.load().unwrap(), before);
    }
}
