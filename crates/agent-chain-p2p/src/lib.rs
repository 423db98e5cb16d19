//! agent-chain-p2p
//!
//! libp2p networking layer for agent-chain nodes: a single request/response
//! protocol (`/agent-chain/1.0.0`) carrying typed messages, plus identify and
//! ping for connection metadata and liveness. Peer discovery runs as three
//! cooperative periodic loops (§4.4) layered over a known-address table
//! distinct from the live peer table.

pub mod config;
pub mod known_addr;
pub mod message;
pub mod network;
pub mod peer_table;

pub use config::P2pConfig;
pub use known_addr::{KnownAddress, KnownAddressTable};
pub use message::{msg_type, Message};
pub use network::{run_addr_exchange_loop, run_discovery_loop, run_maintenance_loop, Handler, Overlay, OverlayHandle};
pub use peer_table::{PeerRecord, PeerTable};
