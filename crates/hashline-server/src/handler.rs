use std::net::SocketAddr;
use std::sync::Arc;

use hashline_protocol::{ChannelManager, Operation, OperationSet, Packet, ProtocolError};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::error::ServerResult;
use crate::state::{NodeState, SpreadOutcome};

/// Where a connection is in its lifecycle.
#[derive(Debug)]
enum HandlerState {
    AwaitRequest,
    Dispatch(Packet),
    Closed,
}

/// Result of dispatching one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

/// Serves one peer connection until it closes, errs, or idles past the
/// watchdog.
pub struct ConnectionHandler<S> {
    channel: ChannelManager<S>,
    peer: SocketAddr,
    state: Arc<NodeState>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: SocketAddr, state: Arc<NodeState>) -> Self {
        Self {
            channel: ChannelManager::new(stream, OperationSet::LEDGER),
            peer,
            state,
        }
    }

    pub async fn run(mut self) {
        let mut current = HandlerState::AwaitRequest;
        loop {
            current = match current {
                HandlerState::AwaitRequest => self.await_request().await,
                HandlerState::Dispatch(packet) => match self.dispatch(packet).await {
                    Ok(Flow::Continue) => HandlerState::AwaitRequest,
                    Ok(Flow::Close) => HandlerState::Closed,
                    Err(e) => {
                        warn!(peer = %self.peer, error = %e, "request failed");
                        HandlerState::Closed
                    }
                },
                HandlerState::Closed => break,
            };
        }
        let _ = self.channel.shutdown().await;
        debug!(peer = %self.peer, "connection closed");
    }

    async fn await_request(&mut self) -> HandlerState {
        let watchdog = self.state.watchdog();
        match tokio::time::timeout(watchdog, self.channel.recv()).await {
            Ok(Ok(packet)) => HandlerState::Dispatch(packet),
            Ok(Err(ProtocolError::ConnectionClosed)) => HandlerState::Closed,
            Ok(Err(e)) => {
                warn!(peer = %self.peer, error = %e, "bad packet");
                HandlerState::Closed
            }
            Err(_) => {
                debug!(peer = %self.peer, ?watchdog, "watchdog expired");
                HandlerState::Closed
            }
        }
    }

    async fn dispatch(&mut self, packet: Packet) -> ServerResult<Flow> {
        debug!(peer = %self.peer, op = %packet.operation(), "request");
        match packet.operation() {
            Operation::LedgerAskHeader => {
                let header = self.state.header()?;
                self.channel.send(&Packet::respond_header(&header)?).await?;
                Ok(Flow::Continue)
            }
            Operation::LedgerAskRecord => {
                let num = self.state.codec().decode_num(packet.payload())?;
                match self.state.record(num) {
                    Ok(record) => self.channel.send(&Packet::respond_record(&record)?).await?,
                    Err(e) if e.is_validation() => self.channel.send(&Packet::deny(&e.to_string())).await?,
                    Err(e) => return Err(e.into()),
                }
                Ok(Flow::Continue)
            }
            Operation::LedgerAskAll => {
                for record in self.state.snapshot_desc()? {
                    self.channel.send(&Packet::respond_record(&record)?).await?;
                }
                Ok(Flow::Continue)
            }
            Operation::RecordAdd => self.handle_add(packet).await,
            Operation::RecordSpread => self.handle_spread(packet),
            other => {
                debug!(peer = %self.peer, op = %other, "not a request, closing");
                Ok(Flow::Close)
            }
        }
    }

    async fn handle_add(&mut self, packet: Packet) -> ServerResult<Flow> {
        let record = self.state.codec().decode_record(packet.payload())?;
        match self.state.accept(record.clone()) {
            Ok(()) => {
                // Stored records always propagate, even if the reply is lost.
                info!(peer = %self.peer, num = record.num, "added record");
                self.state.spawn_spread(record);
                self.channel.send(&Packet::accept()).await?;
                Ok(Flow::Continue)
            }
            Err(e) => {
                warn!(peer = %self.peer, num = record.num, error = %e, "record denied");
                self.channel.send(&Packet::deny(&e.to_string())).await?;
                Ok(Flow::Close)
            }
        }
    }

    fn handle_spread(&mut self, packet: Packet) -> ServerResult<Flow> {
        if !self.state.peers().is_trusted(&self.peer) {
            warn!(peer = %self.peer, "spread from untrusted address");
            return Ok(Flow::Close);
        }
        let record = self.state.codec().decode_record(packet.payload())?;
        match self.state.accept_spread(record.clone()) {
            Ok(SpreadOutcome::Appended) => {
                self.state.spawn_spread(record);
                Ok(Flow::Continue)
            }
            Ok(SpreadOutcome::Duplicate) => Ok(Flow::Continue),
            Err(e) if e.is_validation() => {
                warn!(peer = %self.peer, num = record.num, error = %e, "spread record rejected");
                Ok(Flow::Close)
            }
            Err(e) => Err(e.into()),
        }
    }
}
