use hashline_crypto::SharedDigest;
use hashline_types::{Ledger, LedgerHeader, Record, RecordNum};

use crate::error::{LedgerError, LedgerResult};
use crate::validator::Validator;

/// An in-memory chain that keeps itself consistent across edits.
///
/// Every structural edit (append, replace, remove) is followed by a
/// recompute pass from the edited position to the end: each record is
/// renumbered to its position, re-linked to its predecessor's hash and
/// re-hashed. Only `data` survives the pass untouched. After every public
/// method returns, the wrapped [`Ledger`] passes [`Validator::validate_ledger`].
#[derive(Clone, Debug)]
pub struct ChainLedger {
    validator: Validator,
    ledger: Ledger,
}

impl ChainLedger {
    /// An empty chain.
    pub fn new(digest: SharedDigest) -> Self {
        let ledger = Ledger::empty(digest.reserved());
        Self {
            validator: Validator::new(digest),
            ledger,
        }
    }

    /// Adopt an existing ledger, rejecting it unless it validates as is.
    pub fn from_ledger(digest: SharedDigest, ledger: Ledger) -> LedgerResult<Self> {
        let validator = Validator::new(digest);
        validator.validate_ledger(&ledger)?;
        Ok(Self { validator, ledger })
    }

    /// Build a chain from raw records, renumbering and re-hashing all of them.
    pub fn from_records(digest: SharedDigest, records: Vec<Record>) -> LedgerResult<Self> {
        if records.len() > usize::from(RecordNum::MAX) {
            return Err(LedgerError::InvalidNumber(format!(
                "{} records exceed the chain limit of {}",
                records.len(),
                RecordNum::MAX
            )));
        }
        let mut chain = Self::new(digest);
        chain.ledger.records = records;
        chain.recalculate(0);
        Ok(chain)
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn into_ledger(self) -> Ledger {
        self.ledger
    }

    pub fn header(&self) -> LedgerHeader {
        self.ledger.header()
    }

    pub fn records(&self) -> &[Record] {
        &self.ledger.records
    }

    pub fn num(&self) -> RecordNum {
        self.ledger.num
    }

    pub fn len(&self) -> usize {
        self.ledger.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.records.is_empty()
    }

    pub fn last(&self) -> Option<&Record> {
        self.ledger.records.last()
    }

    /// Record at 1-based position `num`.
    pub fn get(&self, num: RecordNum) -> LedgerResult<&Record> {
        self.validator.validate_position(&self.ledger, num)?;
        Ok(&self.ledger.records[usize::from(num) - 1])
    }

    /// Re-run full validation over the current state.
    pub fn validate(&self) -> LedgerResult<()> {
        self.validator.validate_ledger(&self.ledger)
    }

    /// The record that appending `data` would produce, without inserting it.
    pub fn next_record(&self, data: Vec<u8>) -> LedgerResult<Record> {
        let num = self.next_num()?;
        let prev_hash = self.ledger.hash.clone();
        let hash = self
            .validator
            .digest()
            .hash_record(&prev_hash, num, &data);
        Ok(Record::new(hash, prev_hash, num, data))
    }

    /// Append `record` at the end and recompute it in place.
    pub fn append(&mut self, record: Record) -> LedgerResult<&Record> {
        self.next_num()?;
        self.ledger.records.push(record);
        let index = self.ledger.records.len() - 1;
        self.recalculate(index);
        Ok(&self.ledger.records[index])
    }

    /// Swap the record at `num` for `record`; every later record is re-hashed.
    pub fn replace(&mut self, record: Record, num: RecordNum) -> LedgerResult<()> {
        self.validator.validate_position(&self.ledger, num)?;
        let index = usize::from(num) - 1;
        self.ledger.records[index] = record;
        self.recalculate(index);
        Ok(())
    }

    /// Drop the record at `num` and return it; later records shift down.
    pub fn remove(&mut self, num: RecordNum) -> LedgerResult<Record> {
        self.validator.validate_position(&self.ledger, num)?;
        let index = usize::from(num) - 1;
        let removed = self.ledger.records.remove(index);
        self.recalculate(index);
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.ledger.records.clear();
        self.refresh_summary();
    }

    /// Undo the most recent `append`.
    pub(crate) fn pop(&mut self) -> Option<Record> {
        let popped = self.ledger.records.pop();
        self.refresh_summary();
        popped
    }

    fn next_num(&self) -> LedgerResult<RecordNum> {
        self.ledger.num.checked_add(1).ok_or_else(|| {
            LedgerError::InvalidNumber(format!("chain is full at {} records", self.ledger.num))
        })
    }

    /// Renumber, re-link and re-hash records from index `start` to the end.
    fn recalculate(&mut self, start: usize) {
        let digest = self.validator.digest().clone();
        let reserved = digest.reserved();
        let records = &mut self.ledger.records;

        for index in start..records.len() {
            let prev_hash = match index {
                0 => reserved.clone(),
                _ => records[index - 1].hash.clone(),
            };
            let record = &mut records[index];
            record.num = (index + 1) as RecordNum;
            record.prev_hash = prev_hash;
            record.hash = digest.hash_record(&record.prev_hash, record.num, &record.data);
        }
        self.refresh_summary();
    }

    fn refresh_summary(&mut self) {
        match self.ledger.records.last() {
            Some(last) => {
                self.ledger.hash = last.hash.clone();
                self.ledger.num = last.num;
            }
            None => {
                self.ledger.hash = self.validator.digest().reserved();
                self.ledger.num = 0;
            }
        }
    }
}
