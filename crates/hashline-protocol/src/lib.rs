//! Wire protocol for Hashline.
//!
//! Every message is a [`Packet`]: an ASCII operation tag, up to 1024 bytes of
//! payload and a `\r\n` terminator, sent behind a 2-byte little-endian length
//! prefix. [`ChannelManager`] moves packets over any async byte stream and
//! [`LedgerCodec`] turns ledger headers and records into payloads and back.

pub mod channel;
pub mod codec;
pub mod error;
pub mod operation;
pub mod packet;

pub use channel::ChannelManager;
pub use codec::LedgerCodec;
pub use error::{ProtocolError, ProtocolResult};
pub use operation::{Operation, OperationSet};
pub use packet::{Packet, MAX_OPERATION_LEN, MAX_PACKET_SIZE, MAX_PAYLOAD, TERMINATOR};
