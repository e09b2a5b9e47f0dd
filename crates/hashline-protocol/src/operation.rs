use std::fmt;

/// Every operation a Hashline packet can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    ServerAccept,
    ServerDeny,
    RecordSpread,
    RecordAdd,
    LedgerRespondHeader,
    LedgerRespondRecord,
    LedgerAskHeader,
    LedgerAskRecord,
    LedgerAskAll,
}

impl Operation {
    pub const ALL: [Operation; 9] = [
        Self::ServerAccept,
        Self::ServerDeny,
        Self::RecordSpread,
        Self::RecordAdd,
        Self::LedgerRespondHeader,
        Self::LedgerRespondRecord,
        Self::LedgerAskHeader,
        Self::LedgerAskRecord,
        Self::LedgerAskAll,
    ];

    /// ASCII tag written on the wire. No tag is a prefix of another.
    pub fn tag(self) -> &'static str {
        match self {
            Self::ServerAccept => "SERVER_ACCEPT",
            Self::ServerDeny => "SERVER_DENY",
            Self::RecordSpread => "RECORD_SPREAD",
            Self::RecordAdd => "RECORD_ADD",
            Self::LedgerRespondHeader => "LEDGER_RESPOND_HEADER",
            Self::LedgerRespondRecord => "LEDGER_RESPOND_RECORD",
            Self::LedgerAskHeader => "LEDGER_ASK_HEADER",
            Self::LedgerAskRecord => "LEDGER_ASK_RECORD",
            Self::LedgerAskAll => "LEDGER_ASK_ALL",
        }
    }

    pub fn tag_bytes(self) -> &'static [u8] {
        self.tag().as_bytes()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The operations a deployment accepts.
///
/// A packet whose operation is outside the set cannot be constructed, and
/// `recv` only recognises tags from the set it was given.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperationSet(&'static [Operation]);

impl OperationSet {
    /// Bare acknowledgement: accept and deny.
    pub const BASE: Self = Self(&[Operation::ServerAccept, Operation::ServerDeny]);

    /// The full ledger protocol.
    pub const LEDGER: Self = Self(&Operation::ALL);

    pub fn contains(&self, op: Operation) -> bool {
        self.0.contains(&op)
    }

    pub fn iter(&self) -> impl Iterator<Item = Operation> + '_ {
        self.0.iter().copied()
    }

    /// The allowed operation whose tag begins `data`.
    pub fn match_prefix(&self, data: &[u8]) -> Option<Operation> {
        self.iter().find(|op| data.starts_with(op.tag_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::MAX_OPERATION_LEN;

    #[test]
    fn tags_are_prefix_free() {
        for a in Operation::ALL {
            for b in Operation::ALL {
                if a != b {
                    assert!(!a.tag().starts_with(b.tag()), "{a} starts with {b}");
                }
            }
        }
    }

    #[test]
    fn tags_fit_operation_field() {
        for op in Operation::ALL {
            assert!(op.tag().len() <= MAX_OPERATION_LEN, "{op}");
        }
    }

    #[test]
    fn base_set_is_accept_and_deny() {
        assert!(OperationSet::BASE.contains(Operation::ServerAccept));
        assert!(OperationSet::BASE.contains(Operation::ServerDeny));
        assert!(!OperationSet::BASE.contains(Operation::RecordAdd));
        assert!(Operation::ALL.iter().all(|op| OperationSet::LEDGER.contains(*op)));
    }

    #[test]
    fn prefix_lookup() {
        let set = OperationSet::LEDGER;
        assert_eq!(
            set.match_prefix(b"LEDGER_ASK_RECORD\x01\x00\r\n"),
            Some(Operation::LedgerAskRecord)
        );
        assert_eq!(set.match_prefix(b"LEDGER_ASK_ALL\r\n"), Some(Operation::LedgerAskAll));
        assert_eq!(set.match_prefix(b"LEDGER_ASK"), None);
        assert_eq!(OperationSet::BASE.match_prefix(b"RECORD_ADD\r\n"), None);
    }
}
