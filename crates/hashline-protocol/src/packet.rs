use hashline_types::{LedgerHeader, Record, RecordNum};

use crate::codec::LedgerCodec;
use crate::error::{ProtocolError, ProtocolResult};
use crate::operation::{Operation, OperationSet};

/// Longest operation tag the framing budgets for.
pub const MAX_OPERATION_LEN: usize = 32;
/// Largest payload a packet may carry.
pub const MAX_PAYLOAD: usize = 1024;
/// Fixed end-of-packet marker.
pub const TERMINATOR: &[u8; 2] = b"\r\n";
/// Upper bound of the size prefix.
pub const MAX_PACKET_SIZE: usize = MAX_OPERATION_LEN + MAX_PAYLOAD + TERMINATOR.len();

/// A validated protocol message.
///
/// `size` always equals `tag.len() + payload.len() + 2` and never exceeds
/// [`MAX_PACKET_SIZE`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    size: u16,
    operation: Operation,
    payload: Vec<u8>,
}

impl Packet {
    /// Build a packet with the standard terminator.
    pub fn new(allowed: OperationSet, operation: Operation, payload: Vec<u8>) -> ProtocolResult<Self> {
        Self::from_parts(allowed, operation, payload, TERMINATOR, None)
    }

    /// Build a packet from its wire parts, checking each of them.
    ///
    /// `size`, when given, is the length announced by the sender.
    pub fn from_parts(
        allowed: OperationSet,
        operation: Operation,
        payload: Vec<u8>,
        terminator: &[u8],
        size: Option<usize>,
    ) -> ProtocolResult<Self> {
        if !allowed.contains(operation) {
            return Err(ProtocolError::UnknownOperation(operation.tag().into()));
        }
        if payload.len() > MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            });
        }
        if terminator != TERMINATOR {
            return Err(ProtocolError::MissingTerminator);
        }

        let computed = operation.tag().len() + payload.len() + TERMINATOR.len();
        if let Some(announced) = size {
            if announced > MAX_PACKET_SIZE {
                return Err(ProtocolError::SizeTooLarge {
                    size: announced,
                    max: MAX_PACKET_SIZE,
                });
            }
            if announced != computed {
                return Err(ProtocolError::SizeMismatch {
                    expected: computed,
                    actual: announced,
                });
            }
        }

        Ok(Self {
            size: computed as u16,
            operation,
            payload,
        })
    }

    pub fn accept() -> Self {
        Self::bare(Operation::ServerAccept)
    }

    /// A denial carrying a human-readable reason, cut to fit one packet.
    pub fn deny(reason: &str) -> Self {
        let mut end = reason.len().min(MAX_PAYLOAD);
        while !reason.is_char_boundary(end) {
            end -= 1;
        }
        Self {
            size: (Operation::ServerDeny.tag().len() + end + TERMINATOR.len()) as u16,
            operation: Operation::ServerDeny,
            payload: reason.as_bytes()[..end].to_vec(),
        }
    }

    pub fn ask_header() -> Self {
        Self::bare(Operation::LedgerAskHeader)
    }

    pub fn ask_all() -> Self {
        Self::bare(Operation::LedgerAskAll)
    }

    pub fn ask_record(num: RecordNum) -> Self {
        let payload = LedgerCodec::encode_num(num);
        Self {
            size: (Operation::LedgerAskRecord.tag().len() + payload.len() + TERMINATOR.len()) as u16,
            operation: Operation::LedgerAskRecord,
            payload,
        }
    }

    pub fn respond_header(header: &LedgerHeader) -> ProtocolResult<Self> {
        Self::new(
            OperationSet::LEDGER,
            Operation::LedgerRespondHeader,
            LedgerCodec::encode_header(header),
        )
    }

    pub fn respond_record(record: &Record) -> ProtocolResult<Self> {
        Self::record(Operation::LedgerRespondRecord, record)
    }

    pub fn add(record: &Record) -> ProtocolResult<Self> {
        Self::record(Operation::RecordAdd, record)
    }

    pub fn spread(record: &Record) -> ProtocolResult<Self> {
        Self::record(Operation::RecordSpread, record)
    }

    fn record(operation: Operation, record: &Record) -> ProtocolResult<Self> {
        Self::new(OperationSet::LEDGER, operation, LedgerCodec::encode_record(record))
    }

    fn bare(operation: Operation) -> Self {
        Self {
            size: (operation.tag().len() + TERMINATOR.len()) as u16,
            operation,
            payload: Vec::new(),
        }
    }

    pub fn size(&self) -> u16 {
        self.size
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    pub fn terminator(&self) -> &'static [u8] {
        TERMINATOR
    }

    /// The payload of a `SERVER_DENY`, read as text.
    pub fn reason(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// `size (u16 LE) ‖ tag ‖ payload ‖ terminator`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(2 + usize::from(self.size));
        buf.extend_from_slice(&self.size.to_le_bytes());
        buf.extend_from_slice(self.operation.tag_bytes());
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(TERMINATOR);
        buf
    }
}
