//! Hashline node server.
//!
//! A node listens on its own entry in the trusted peer list. Each accepted
//! connection gets a [`ConnectionHandler`] task that answers header and
//! record queries, validates submitted records, and accepts records spread by
//! trusted peers. Newly accepted records are forwarded to every other peer by
//! the [`Propagate`] implementation held in [`NodeState`].

pub mod config;
pub mod error;
pub mod handler;
pub mod propagator;
pub mod server;
pub mod state;

pub use config::{NodeConfig, TrustedPeers};
pub use error::{ServerError, ServerResult};
pub use handler::ConnectionHandler;
pub use propagator::{Propagate, SpreadReport, TcpPropagator};
pub use server::LedgerServer;
pub use state::{NodeState, SpreadOutcome};
