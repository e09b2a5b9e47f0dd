use hashline_crypto::SharedDigest;
use hashline_types::{Ledger, LedgerHeader, Record, RecordNum};

use crate::error::{LedgerError, LedgerResult};

/// What a record is expected to link to.
///
/// A record is either the last record of a ledger (checked against the
/// ledger summary) or the immediate predecessor of another record.
#[derive(Clone, Copy, Debug)]
pub enum LinkTarget<'a> {
    ToHeader(&'a LedgerHeader),
    ToRecord(&'a Record),
}

/// Chain validator bound to one digest algorithm.
///
/// All checks are pure: they read their arguments and return the first
/// violation found.
#[derive(Clone)]
pub struct Validator {
    digest: SharedDigest,
}

impl Validator {
    pub fn new(digest: SharedDigest) -> Self {
        Self { digest }
    }

    pub fn digest(&self) -> &SharedDigest {
        &self.digest
    }

    /// Check a record on its own: number, predecessor hash shape, own hash.
    pub fn validate_record(&self, record: &Record) -> LedgerResult<()> {
        if record.num < 1 {
            return Err(LedgerError::InvalidNumber(format!(
                "record number {} is below 1",
                record.num
            )));
        }

        if record.num == 1 {
            if record.prev_hash != self.digest.reserved() {
                return Err(LedgerError::InvalidHash(
                    "first record must reference the reserved hash".into(),
                ));
            }
        } else if !self.digest.is_well_formed(&record.prev_hash) {
            return Err(LedgerError::InvalidHash(format!(
                "record {} has a malformed previous hash",
                record.num
            )));
        }

        let computed = self
            .digest
            .hash_record(&record.prev_hash, record.num, &record.data);
        if computed != record.hash {
            return Err(LedgerError::InvalidHash(format!(
                "record {} hash does not match its contents",
                record.num
            )));
        }
        Ok(())
    }

    /// Check hash and number continuity between `record` and what follows it.
    pub fn validate_link(&self, record: &Record, target: LinkTarget<'_>) -> LedgerResult<()> {
        match target {
            LinkTarget::ToHeader(header) => {
                if record.hash != header.hash || record.num != header.num {
                    return Err(LedgerError::InvalidLink(format!(
                        "record {} is not the last record of ledger {}",
                        record.num, header.num
                    )));
                }
            }
            LinkTarget::ToRecord(successor) => {
                if successor.prev_hash != record.hash {
                    return Err(LedgerError::InvalidLink(format!(
                        "record {} does not reference record {}",
                        successor.num, record.num
                    )));
                }
                if record.num.checked_add(1) != Some(successor.num) {
                    return Err(LedgerError::InvalidLink(format!(
                        "record {} cannot follow record {}",
                        successor.num, record.num
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check a whole ledger: summary fields, ordering, links, and every record.
    pub fn validate_ledger(&self, ledger: &Ledger) -> LedgerResult<()> {
        let Some(last) = ledger.records.last() else {
            if ledger.hash != self.digest.reserved() {
                return Err(LedgerError::InvalidHash(
                    "empty ledger must carry the reserved hash".into(),
                ));
            }
            if ledger.num != 0 {
                return Err(LedgerError::InvalidNumber(format!(
                    "empty ledger claims {} records",
                    ledger.num
                )));
            }
            return Ok(());
        };

        if ledger.hash != last.hash {
            return Err(LedgerError::InvalidHash(
                "ledger hash does not match its last record".into(),
            ));
        }
        if ledger.num != last.num {
            return Err(LedgerError::InvalidNumber(format!(
                "ledger number {} does not match last record {}",
                ledger.num, last.num
            )));
        }
        if usize::from(ledger.num) != ledger.records.len() {
            return Err(LedgerError::InvalidOrder(format!(
                "ledger holds {} records but ends at record {}",
                ledger.records.len(),
                ledger.num
            )));
        }

        // Walk newest to oldest; `expected` is the prev_hash of the record
        // one position above.
        let mut expected = None;
        for (index, record) in ledger.records.iter().enumerate().rev() {
            let position = (index + 1) as RecordNum;
            if record.num != position {
                return Err(LedgerError::InvalidOrder(format!(
                    "record at position {position} is numbered {}",
                    record.num
                )));
            }
            if let Some(prev_hash) = expected {
                if prev_hash != &record.hash {
                    return Err(LedgerError::InvalidLink(format!(
                        "record {} does not reference record {position}",
                        position + 1
                    )));
                }
            }
            self.validate_record(record)?;
            expected = Some(&record.prev_hash);
        }

        if ledger.records[0].prev_hash != self.digest.reserved() {
            return Err(LedgerError::InvalidLink(
                "first record must reference the reserved hash".into(),
            ));
        }
        Ok(())
    }

    /// Check that `num` addresses an existing record of `ledger`.
    pub fn validate_position(&self, ledger: &Ledger, num: RecordNum) -> LedgerResult<()> {
        if num < 1 || num > ledger.num {
            return Err(LedgerError::InvalidNumber(format!(
                "record {num} outside 1..={}",
                ledger.num
            )));
        }
        Ok(())
    }

    /// Check that `record` may be appended to `ledger` as is.
    ///
    /// Used for records arriving from peers: the record must be valid on its
    /// own and must continue the current last record. On an empty ledger it
    /// must be record #1.
    pub fn validate_append(&self, ledger: &Ledger, record: &Record) -> LedgerResult<()> {
        self.validate_record(record)?;
        match ledger.records.last() {
            Some(last) => self.validate_link(last, LinkTarget::ToRecord(record)),
            None if record.num == 1 => Ok(()),
            None => Err(LedgerError::InvalidLink(format!(
                "record {} cannot start an empty ledger",
                record.num
            ))),
        }
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("digest", &self.digest.name())
            .finish()
    }
}
