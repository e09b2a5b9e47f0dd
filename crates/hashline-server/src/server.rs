use std::net::SocketAddr;
use std::sync::Arc;

use hashline_ledger::StoredLedger;
use hashline_store::FileLedgerStore;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::NodeConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::ConnectionHandler;
use crate::propagator::TcpPropagator;
use crate::state::NodeState;

/// Hashline node: accepts peer connections and runs one handler task each.
pub struct LedgerServer {
    listener: TcpListener,
    state: Arc<NodeState>,
    limit: Arc<Semaphore>,
}

impl LedgerServer {
    pub async fn bind(addr: SocketAddr, state: Arc<NodeState>, max_connections: usize) -> ServerResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, state, max_connections))
    }

    pub fn from_listener(listener: TcpListener, state: Arc<NodeState>, max_connections: usize) -> Self {
        Self {
            listener,
            state,
            limit: Arc::new(Semaphore::new(max_connections)),
        }
    }

    /// Open the file store named by `config`, load and check the ledger, and
    /// bind the node's own peer address.
    pub async fn from_config(config: &NodeConfig) -> ServerResult<Self> {
        config.validate()?;
        let digest = config.digest.build();
        let store = Arc::new(FileLedgerStore::open(&config.data_dir, digest.reserved())?);
        let ledger = StoredLedger::open(digest, store)?;

        let peers = config.trusted_peers()?;
        let propagator = Arc::new(TcpPropagator::new(peers.clone(), config.connect_timeout()));
        let state = Arc::new(NodeState::new(ledger, peers, config.watchdog(), propagator));
        Self::bind(config.listen_addr()?, state, config.max_connections).await
    }

    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn state(&self) -> &Arc<NodeState> {
        &self.state
    }

    /// Accept connections until the task is dropped.
    pub async fn serve(self) -> ServerResult<()> {
        info!(addr = %self.local_addr()?, "hashline node listening");
        loop {
            let permit = self
                .limit
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| ServerError::Internal(e.to_string()))?;

            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            };
            debug!(peer = %peer, "connection accepted");

            let state = self.state.clone();
            tokio::spawn(async move {
                ConnectionHandler::new(stream, peer, state).run().await;
                drop(permit);
            });
        }
    }
}
