use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::{ProtocolError, ProtocolResult};
use crate::operation::OperationSet;
use crate::packet::{Packet, MAX_PACKET_SIZE, TERMINATOR};

/// Sends and receives [`Packet`]s over a byte stream.
///
/// Frame: `size (u16 LE) ‖ tag ‖ payload ‖ terminator`, where `size` counts
/// everything after the prefix. Incoming tags are matched against the
/// channel's allow-list.
pub struct ChannelManager<S> {
    stream: S,
    allowed: OperationSet,
}

impl<S> ChannelManager<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, allowed: OperationSet) -> Self {
        Self { stream, allowed }
    }

    pub fn allowed(&self) -> OperationSet {
        self.allowed
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    pub async fn send(&mut self, packet: &Packet) -> ProtocolResult<()> {
        self.stream.write_all(&packet.to_bytes()).await?;
        self.stream.flush().await?;
        trace!(op = %packet.operation(), size = packet.size(), "sent packet");
        Ok(())
    }

    /// Read one packet.
    ///
    /// The terminator is taken positionally from the end of the frame and
    /// checked when the packet is constructed.
    pub async fn recv(&mut self) -> ProtocolResult<Packet> {
        let mut len_buf = [0u8; 2];
        match self.stream.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(ProtocolError::ConnectionClosed);
            }
            Err(e) => return Err(e.into()),
        }

        let size = usize::from(u16::from_le_bytes(len_buf));
        if size > MAX_PACKET_SIZE {
            return Err(ProtocolError::SizeTooLarge {
                size,
                max: MAX_PACKET_SIZE,
            });
        }

        let mut body = vec![0u8; size];
        let mut filled = 0;
        while filled < size {
            let n = self.stream.read(&mut body[filled..]).await?;
            if n == 0 {
                return Err(ProtocolError::SizeMismatch {
                    expected: size,
                    actual: filled,
                });
            }
            filled += n;
        }

        let operation = self.allowed.match_prefix(&body).ok_or_else(|| {
            let shown = &body[..body.len().min(crate::packet::MAX_OPERATION_LEN)];
            ProtocolError::UnknownOperation(String::from_utf8_lossy(shown).into_owned())
        })?;

        let rest = &body[operation.tag().len()..];
        let split = rest.len().saturating_sub(TERMINATOR.len());
        let (payload, terminator) = rest.split_at(split);

        let packet = Packet::from_parts(self.allowed, operation, payload.to_vec(), terminator, Some(size))?;
        trace!(op = %operation, size, "received packet");
        Ok(packet)
    }

    pub async fn shutdown(&mut self) -> ProtocolResult<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

impl<S> std::fmt::Debug for ChannelManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelManager")
            .field("allowed", &self.allowed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use hashline_types::{ChainHash, Record};
    use tokio::io::duplex;

    use super::*;
    use crate::codec::LedgerCodec;
    use crate::operation::Operation;

    fn pair() -> (ChannelManager<tokio::io::DuplexStream>, ChannelManager<tokio::io::DuplexStream>) {
        let (a, b) = duplex(4096);
        (
            ChannelManager::new(a, OperationSet::LEDGER),
            ChannelManager::new(b, OperationSet::LEDGER),
        )
    }

    #[tokio::test]
    async fn packets_cross_the_channel() {
        let (mut a, mut b) = pair();
        let record = Record::new(ChainHash::from_slice(&[5; 32]), ChainHash::zeroed(32), 1, b"hi".to_vec());

        a.send(&Packet::add(&record).unwrap()).await.unwrap();
        a.send(&Packet::ask_all()).await.unwrap();

        let first = b.recv().await.unwrap();
        assert_eq!(first.operation(), Operation::RecordAdd);
        assert_eq!(LedgerCodec::new(32).decode_record(first.payload()).unwrap(), record);
        assert_eq!(b.recv().await.unwrap(), Packet::ask_all());
    }

    #[tokio::test]
    async fn closed_stream_reports_closed() {
        let (a, mut b) = pair();
        drop(a);
        assert!(matches!(b.recv().await, Err(ProtocolError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn oversized_prefix_rejected() {
        let (mut raw, b) = duplex(64);
        let mut b = ChannelManager::new(b, OperationSet::LEDGER);
        raw.write_all(&((MAX_PACKET_SIZE + 1) as u16).to_le_bytes()).await.unwrap();
        assert!(matches!(b.recv().await, Err(ProtocolError::SizeTooLarge { .. })));
    }

    #[tokio::test]
    async fn truncated_body_is_size_mismatch() {
        let (mut raw, b) = duplex(64);
        let mut b = ChannelManager::new(b, OperationSet::LEDGER);
        raw.write_all(&20u16.to_le_bytes()).await.unwrap();
        raw.write_all(b"SERVER_ACCEPT").await.unwrap();
        drop(raw);
        assert!(matches!(
            b.recv().await,
            Err(ProtocolError::SizeMismatch { expected: 20, actual: 13 })
        ));
    }

    #[tokio::test]
    async fn unknown_tag_rejected() {
        let (mut raw, b) = duplex(64);
        let mut b = ChannelManager::new(b, OperationSet::LEDGER);
        let body = b"HELLO_THERE\r\n";
        raw.write_all(&(body.len() as u16).to_le_bytes()).await.unwrap();
        raw.write_all(body).await.unwrap();
        assert!(matches!(b.recv().await, Err(ProtocolError::UnknownOperation(_))));
    }

    #[tokio::test]
    async fn tag_outside_allow_list_rejected() {
        let (a, b) = duplex(256);
        let mut a = ChannelManager::new(a, OperationSet::LEDGER);
        let mut b = ChannelManager::new(b, OperationSet::BASE);
        a.send(&Packet::ask_header()).await.unwrap();
        assert!(matches!(b.recv().await, Err(ProtocolError::UnknownOperation(_))));
    }

    #[tokio::test]
    async fn bad_terminator_caught_by_construction() {
        let (mut raw, b) = duplex(64);
        let mut b = ChannelManager::new(b, OperationSet::LEDGER);
        let body = b"SERVER_ACCEPT\n\n";
        raw.write_all(&(body.len() as u16).to_le_bytes()).await.unwrap();
        raw.write_all(body).await.unwrap();
        assert!(matches!(b.recv().await, Err(ProtocolError::MissingTerminator)));
    }

    #[tokio::test]
    async fn deny_reason_survives() {
        let (mut a, mut b) = pair();
        a.send(&Packet::deny("invalid link: record 3 does not reference record 2"))
            .await
            .unwrap();
        let p = b.recv().await.unwrap();
        assert_eq!(p.operation(), Operation::ServerDeny);
        assert_eq!(p.reason(), "invalid link: record 3 does not reference record 2");
    }
}
