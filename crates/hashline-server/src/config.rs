use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hashline_crypto::DigestKind;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Node configuration, read from TOML.
///
/// ```toml
/// peers = ["127.0.0.1:7000", "127.0.0.1:7001", "127.0.0.1:7002"]
/// local_index = 0
/// data_dir = "data/node0"
/// digest = "blake3"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Every trusted node, this one included.
    pub peers: Vec<SocketAddr>,
    /// Position of this node in `peers`; also its listen address.
    pub local_index: usize,
    pub data_dir: PathBuf,
    #[serde(default)]
    pub digest: DigestKind,
    #[serde(default = "default_watchdog_ms")]
    pub watchdog_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_watchdog_ms() -> u64 {
    2000
}

fn default_connect_timeout_ms() -> u64 {
    1000
}

fn default_max_connections() -> usize {
    256
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            peers: vec![SocketAddr::from(([127, 0, 0, 1], 7000))],
            local_index: 0,
            data_dir: PathBuf::from("data"),
            digest: DigestKind::default(),
            watchdog_ms: default_watchdog_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_connections: default_max_connections(),
        }
    }
}

impl NodeConfig {
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.peers.is_empty() {
            return Err(ServerError::Config("peer list is empty".into()));
        }
        if self.local_index >= self.peers.len() {
            return Err(ServerError::Config(format!(
                "local_index {} out of range for {} peers",
                self.local_index,
                self.peers.len()
            )));
        }
        if self.max_connections == 0 {
            return Err(ServerError::Config("max_connections must be positive".into()));
        }
        if self.watchdog_ms == 0 {
            return Err(ServerError::Config("watchdog_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn trusted_peers(&self) -> ServerResult<TrustedPeers> {
        TrustedPeers::new(self.peers.clone(), self.local_index)
    }

    pub fn listen_addr(&self) -> ServerResult<SocketAddr> {
        self.peers.get(self.local_index).copied().ok_or_else(|| {
            ServerError::Config(format!("no peer at local_index {}", self.local_index))
        })
    }

    pub fn watchdog(&self) -> Duration {
        Duration::from_millis(self.watchdog_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// The fixed, ordered set of nodes allowed to spread records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrustedPeers {
    peers: Vec<SocketAddr>,
    local_index: usize,
}

impl TrustedPeers {
    pub fn new(peers: Vec<SocketAddr>, local_index: usize) -> ServerResult<Self> {
        if local_index >= peers.len() {
            return Err(ServerError::Config(format!(
                "local_index {local_index} out of range for {} peers",
                peers.len()
            )));
        }
        Ok(Self { peers, local_index })
    }

    pub fn local(&self) -> SocketAddr {
        self.peers[self.local_index]
    }

    pub fn local_index(&self) -> usize {
        self.local_index
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<SocketAddr> {
        self.peers.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = SocketAddr> + '_ {
        self.peers.iter().copied()
    }

    /// Every peer except this node.
    pub fn others(&self) -> impl Iterator<Item = SocketAddr> + '_ {
        self.peers
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != self.local_index)
            .map(|(_, addr)| *addr)
    }

    /// Membership by IP address only; outgoing connections use ephemeral
    /// source ports.
    pub fn is_trusted(&self, addr: &SocketAddr) -> bool {
        self.peers.iter().any(|peer| peer.ip() == addr.ip())
    }
}
