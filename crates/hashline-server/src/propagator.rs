use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use hashline_protocol::{ChannelManager, OperationSet, Packet, ProtocolError};
use hashline_types::Record;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::config::TrustedPeers;

/// Which peers a spread reached.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpreadReport {
    pub delivered: Vec<SocketAddr>,
    pub failed: Vec<SocketAddr>,
}

/// Forwards accepted records to the rest of the network.
#[async_trait]
pub trait Propagate: Send + Sync {
    async fn spread(&self, record: &Record) -> SpreadReport;
}

/// Sends `RECORD_SPREAD` to every trusted peer except this node, one fresh
/// connection each. Failures are logged and not retried.
#[derive(Clone, Debug)]
pub struct TcpPropagator {
    peers: TrustedPeers,
    connect_timeout: Duration,
}

impl TcpPropagator {
    pub fn new(peers: TrustedPeers, connect_timeout: Duration) -> Self {
        Self {
            peers,
            connect_timeout,
        }
    }

    async fn deliver(&self, addr: SocketAddr, packet: &Packet) -> Result<(), ProtocolError> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                ProtocolError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "connect timed out",
                ))
            })??;
        let mut channel = ChannelManager::new(stream, OperationSet::LEDGER);
        channel.send(packet).await?;
        channel.shutdown().await
    }
}

#[async_trait]
impl Propagate for TcpPropagator {
    async fn spread(&self, record: &Record) -> SpreadReport {
        let mut report = SpreadReport::default();
        let packet = match Packet::spread(record) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(num = record.num, error = %e, "record cannot be spread");
                report.failed.extend(self.peers.others());
                return report;
            }
        };

        for addr in self.peers.others() {
            match self.deliver(addr, &packet).await {
                Ok(()) => {
                    debug!(peer = %addr, num = record.num, "record spread");
                    report.delivered.push(addr);
                }
                Err(e) => {
                    warn!(peer = %addr, num = record.num, error = %e, "peer unreachable, skipping");
                    report.failed.push(addr);
                }
            }
        }
        report
    }
}
