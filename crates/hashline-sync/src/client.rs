use std::net::SocketAddr;
use std::time::Duration;

use hashline_crypto::SharedDigest;
use hashline_ledger::SyncLedger;
use hashline_protocol::{ChannelManager, LedgerCodec, Operation, OperationSet, Packet};
use hashline_types::{Ledger, LedgerHeader, Record, RecordNum};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

/// Timeouts applied by [`PeerClient`] and [`PeerSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(1000),
            read_timeout: Duration::from_millis(2000),
        }
    }
}

/// Dials one peer. Every call opens a fresh connection.
#[derive(Clone)]
pub struct PeerClient {
    addr: SocketAddr,
    digest: SharedDigest,
    options: ClientOptions,
}

impl PeerClient {
    pub fn new(addr: SocketAddr, digest: SharedDigest, options: ClientOptions) -> Self {
        Self {
            addr,
            digest,
            options,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn connect(&self) -> SyncResult<PeerSession<TcpStream>> {
        let stream = tokio::time::timeout(self.options.connect_timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| SyncError::Timeout(self.options.connect_timeout))??;
        debug!(peer = %self.addr, "connected");
        Ok(PeerSession::new(stream, self.digest.clone(), self.options.read_timeout))
    }

    pub async fn fetch_header(&self) -> SyncResult<LedgerHeader> {
        self.connect().await?.header().await
    }

    pub async fn fetch_record(&self, num: RecordNum) -> SyncResult<Record> {
        self.connect().await?.record(num).await
    }

    pub async fn download(&self) -> SyncResult<Ledger> {
        let ledger = self.connect().await?.download().await?;
        info!(peer = %self.addr, num = ledger.num, "downloaded ledger");
        Ok(ledger)
    }

    pub async fn submit(&self, data: Vec<u8>) -> SyncResult<Record> {
        let record = self.connect().await?.submit(data).await?;
        info!(peer = %self.addr, num = record.num, "record accepted");
        Ok(record)
    }
}

impl std::fmt::Debug for PeerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerClient")
            .field("addr", &self.addr)
            .field("digest", &self.digest.name())
            .finish()
    }
}

/// Requests over one open connection.
pub struct PeerSession<S> {
    channel: ChannelManager<S>,
    digest: SharedDigest,
    codec: LedgerCodec,
    read_timeout: Duration,
}

impl<S> PeerSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, digest: SharedDigest, read_timeout: Duration) -> Self {
        let codec = LedgerCodec::for_digest(digest.as_ref());
        Self {
            channel: ChannelManager::new(stream, OperationSet::LEDGER),
            digest,
            codec,
            read_timeout,
        }
    }

    pub async fn header(&mut self) -> SyncResult<LedgerHeader> {
        self.channel.send(&Packet::ask_header()).await?;
        let reply = self.expect(Operation::LedgerRespondHeader).await?;
        Ok(self.codec.decode_header(reply.payload())?)
    }

    pub async fn record(&mut self, num: RecordNum) -> SyncResult<Record> {
        self.channel.send(&Packet::ask_record(num)).await?;
        let reply = self.expect(Operation::LedgerRespondRecord).await?;
        Ok(self.codec.decode_record(reply.payload())?)
    }

    /// Fetch the header, then every record newest-first, checking each link.
    pub async fn download(&mut self) -> SyncResult<Ledger> {
        let header = self.header().await?;
        let mut sync = SyncLedger::new(self.digest.clone(), header);
        if sync.is_complete() {
            return Ok(sync.finish()?);
        }

        self.channel.send(&Packet::ask_all()).await?;
        loop {
            let reply = self.expect(Operation::LedgerRespondRecord).await?;
            let record = self.codec.decode_record(reply.payload())?;
            debug!(num = record.num, remaining = sync.remaining(), "received record");
            if !sync.insert_record(record)? {
                break;
            }
        }
        Ok(sync.finish()?)
    }

    /// Build the record that continues the peer's chain and ask it to add it.
    pub async fn submit(&mut self, data: Vec<u8>) -> SyncResult<Record> {
        let header = self.header().await?;
        let num = header.num.checked_add(1).ok_or(SyncError::ChainFull(header.num))?;
        let hash = self.digest.hash_record(&header.hash, num, &data);
        let record = Record::new(hash, header.hash, num, data);

        self.channel.send(&Packet::add(&record)?).await?;
        self.expect(Operation::ServerAccept).await?;
        Ok(record)
    }

    /// Send an already built record.
    pub async fn add(&mut self, record: &Record) -> SyncResult<()> {
        self.channel.send(&Packet::add(record)?).await?;
        self.expect(Operation::ServerAccept).await?;
        Ok(())
    }

    pub fn into_channel(self) -> ChannelManager<S> {
        self.channel
    }

    async fn expect(&mut self, expected: Operation) -> SyncResult<Packet> {
        let packet = tokio::time::timeout(self.read_timeout, self.channel.recv())
            .await
            .map_err(|_| SyncError::Timeout(self.read_timeout))??;
        match packet.operation() {
            op if op == expected => Ok(packet),
            Operation::ServerDeny => Err(SyncError::Denied(packet.reason())),
            actual => Err(SyncError::UnexpectedResponse { expected, actual }),
        }
    }
}

/// Outcome of asking one peer for its header.
#[derive(Debug)]
pub struct ScanEntry {
    pub addr: SocketAddr,
    pub header: SyncResult<LedgerHeader>,
}

/// Ask every peer in turn for its header. Unreachable peers are reported,
/// not skipped.
pub async fn scan(peers: &[SocketAddr], digest: SharedDigest, options: ClientOptions) -> Vec<ScanEntry> {
    let mut entries = Vec::with_capacity(peers.len());
    for &addr in peers {
        let header = PeerClient::new(addr, digest.clone(), options).fetch_header().await;
        if let Err(e) = &header {
            warn!(peer = %addr, error = %e, "peer did not answer scan");
        }
        entries.push(ScanEntry { addr, header });
    }
    entries
}
