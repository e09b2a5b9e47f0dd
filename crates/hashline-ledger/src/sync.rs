use std::collections::VecDeque;

use hashline_crypto::SharedDigest;
use hashline_types::{Ledger, LedgerHeader, Record, RecordNum};

use crate::error::{LedgerError, LedgerResult};
use crate::validator::{LinkTarget, Validator};

/// Assembles a chain downloaded newest-first.
///
/// Starts from a peer's header and accepts records in descending order. The
/// first record must be the one the header describes; each later record must
/// be the predecessor of the current front.
#[derive(Debug)]
pub struct SyncLedger {
    validator: Validator,
    header: LedgerHeader,
    records: VecDeque<Record>,
}

impl SyncLedger {
    pub fn new(digest: SharedDigest, header: LedgerHeader) -> Self {
        let capacity = usize::from(header.num);
        Self {
            validator: Validator::new(digest),
            header,
            records: VecDeque::with_capacity(capacity),
        }
    }

    pub fn header(&self) -> &LedgerHeader {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether record #1 has arrived (or the header describes an empty chain).
    pub fn is_complete(&self) -> bool {
        match self.records.front() {
            Some(first) => first.num == 1,
            None => self.header.num == 0,
        }
    }

    /// How many records are still expected.
    pub fn remaining(&self) -> RecordNum {
        match self.records.front() {
            Some(first) => first.num.saturating_sub(1),
            None => self.header.num,
        }
    }

    /// Validate and prepend `record`.
    ///
    /// Returns `true` while more records are expected and `false` once record
    /// #1 has been inserted.
    pub fn insert_record(&mut self, record: Record) -> LedgerResult<bool> {
        if self.is_complete() {
            return Err(LedgerError::InvalidOrder(format!(
                "received record {} after the chain was complete",
                record.num
            )));
        }

        self.validator.validate_record(&record)?;
        let target = match self.records.front() {
            Some(front) => LinkTarget::ToRecord(front),
            None => LinkTarget::ToHeader(&self.header),
        };
        self.validator.validate_link(&record, target)?;

        let more = record.num != 1;
        self.records.push_front(record);
        Ok(more)
    }

    /// Validate the assembled chain as a whole and hand it over.
    pub fn finish(self) -> LedgerResult<Ledger> {
        if !self.is_complete() {
            return Err(LedgerError::InvalidOrder(format!(
                "download incomplete, {} records missing",
                self.remaining()
            )));
        }
        let ledger = Ledger {
            hash: self.header.hash,
            num: self.header.num,
            records: self.records.into(),
        };
        self.validator.validate_ledger(&ledger)?;
        Ok(ledger)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hashline_crypto::{Blake3Digest, DigestAlgorithm};

    use super::*;
    use crate::chain::ChainLedger;

    fn source(count: usize) -> Ledger {
        let mut chain = ChainLedger::new(Arc::new(Blake3Digest));
        for i in 0..count {
            let record = chain.next_record(vec![i as u8; 4]).unwrap();
            chain.append(record).unwrap();
        }
        chain.into_ledger()
    }

    fn sync_for(ledger: &Ledger) -> SyncLedger {
        SyncLedger::new(Arc::new(Blake3Digest), ledger.header())
    }

    #[test]
    fn descending_download_reports_first_record() {
        let ledger = source(3);
        let mut sync = sync_for(&ledger);

        let results: Vec<bool> = ledger
            .records
            .iter()
            .rev()
            .map(|r| sync.insert_record(r.clone()).unwrap())
            .collect();
        assert_eq!(results, vec![true, true, false]);
        assert!(sync.is_complete());
        assert_eq!(sync.finish().unwrap(), ledger);
    }

    #[test]
    fn remaining_counts_down() {
        let ledger = source(3);
        let mut sync = sync_for(&ledger);
        assert_eq!(sync.remaining(), 3);
        sync.insert_record(ledger.records[2].clone()).unwrap();
        assert_eq!(sync.remaining(), 2);
        assert_eq!(sync.len(), 1);
    }

    #[test]
    fn first_insert_must_match_header() {
        let ledger = source(3);
        let mut sync = sync_for(&ledger);
        assert!(matches!(
            sync.insert_record(ledger.records[1].clone()),
            Err(LedgerError::InvalidLink(_))
        ));
        assert!(sync.is_empty());
    }

    #[test]
    fn skipped_record_breaks_link() {
        let ledger = source(3);
        let mut sync = sync_for(&ledger);
        sync.insert_record(ledger.records[2].clone()).unwrap();
        assert!(matches!(
            sync.insert_record(ledger.records[0].clone()),
            Err(LedgerError::InvalidLink(_))
        ));
    }

    #[test]
    fn tampered_record_rejected() {
        let ledger = source(2);
        let mut sync = sync_for(&ledger);
        let mut last = ledger.records[1].clone();
        last.data.push(0);
        assert!(matches!(sync.insert_record(last), Err(LedgerError::InvalidHash(_))));
    }

    #[test]
    fn empty_header_is_complete() {
        let sync = SyncLedger::new(
            Arc::new(Blake3Digest),
            LedgerHeader::new(Blake3Digest.reserved(), 0),
        );
        assert!(sync.is_complete());
        assert_eq!(sync.finish().unwrap().num, 0);
    }

    #[test]
    fn insert_after_complete_rejected() {
        let ledger = source(1);
        let mut sync = sync_for(&ledger);
        assert!(!sync.insert_record(ledger.records[0].clone()).unwrap());
        assert!(matches!(
            sync.insert_record(ledger.records[0].clone()),
            Err(LedgerError::InvalidOrder(_))
        ));
    }

    #[test]
    fn finish_requires_all_records() {
        let ledger = source(2);
        let mut sync = sync_for(&ledger);
        sync.insert_record(ledger.records[1].clone()).unwrap();
        assert!(matches!(sync.finish(), Err(LedgerError::InvalidOrder(_))));
    }
}
