use hashline_crypto::DigestAlgorithm;
use hashline_types::{ChainHash, LedgerHeader, Record, RecordNum, NUM_SIZE};

use crate::error::{ProtocolError, ProtocolResult};

/// Encodes ledger headers and records into packet payloads.
///
/// Layouts (numbers are 2 bytes, little-endian):
/// ```text
/// header  num ‖ hash
/// record  num ‖ hash ‖ prev_hash ‖ data
/// number  num
/// ```
/// Hashes carry no length prefix, so decoding needs the digest width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerCodec {
    hash_size: usize,
}

impl LedgerCodec {
    pub fn new(hash_size: usize) -> Self {
        Self { hash_size }
    }

    pub fn for_digest(digest: &dyn DigestAlgorithm) -> Self {
        Self::new(digest.size())
    }

    pub fn hash_size(&self) -> usize {
        self.hash_size
    }

    pub fn encode_num(num: RecordNum) -> Vec<u8> {
        num.to_le_bytes().to_vec()
    }

    pub fn encode_header(header: &LedgerHeader) -> Vec<u8> {
        let mut buf = Vec::with_capacity(NUM_SIZE + header.hash.len());
        buf.extend_from_slice(&header.num.to_le_bytes());
        buf.extend_from_slice(header.hash.as_bytes());
        buf
    }

    pub fn encode_record(record: &Record) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            NUM_SIZE + record.hash.len() + record.prev_hash.len() + record.data.len(),
        );
        buf.extend_from_slice(&record.num.to_le_bytes());
        buf.extend_from_slice(record.hash.as_bytes());
        buf.extend_from_slice(record.prev_hash.as_bytes());
        buf.extend_from_slice(&record.data);
        buf
    }

    pub fn decode_num(&self, payload: &[u8]) -> ProtocolResult<RecordNum> {
        if payload.len() != NUM_SIZE {
            return Err(ProtocolError::MalformedPayload(format!(
                "record number needs {NUM_SIZE} bytes, got {}",
                payload.len()
            )));
        }
        Ok(read_num(payload))
    }

    pub fn decode_header(&self, payload: &[u8]) -> ProtocolResult<LedgerHeader> {
        let expected = NUM_SIZE + self.hash_size;
        if payload.len() != expected {
            return Err(ProtocolError::MalformedPayload(format!(
                "header needs {expected} bytes, got {}",
                payload.len()
            )));
        }
        Ok(LedgerHeader::new(
            ChainHash::from_slice(&payload[NUM_SIZE..]),
            read_num(payload),
        ))
    }

    pub fn decode_record(&self, payload: &[u8]) -> ProtocolResult<Record> {
        let fixed = NUM_SIZE + 2 * self.hash_size;
        if payload.len() < fixed {
            return Err(ProtocolError::MalformedPayload(format!(
                "record needs at least {fixed} bytes, got {}",
                payload.len()
            )));
        }
        let hash_end = NUM_SIZE + self.hash_size;
        Ok(Record::new(
            ChainHash::from_slice(&payload[NUM_SIZE..hash_end]),
            ChainHash::from_slice(&payload[hash_end..fixed]),
            read_num(payload),
            payload[fixed..].to_vec(),
        ))
    }
}

fn read_num(payload: &[u8]) -> RecordNum {
    RecordNum::from_le_bytes([payload[0], payload[1]])
}
