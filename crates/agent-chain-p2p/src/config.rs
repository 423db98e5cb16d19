use agent_chain_core::constants::{DEFAULT_P2P_PORT, WIRE_PROTOCOL};

/// Configuration for the overlay (§4.4, §6).
#[derive(Debug, Clone)]
pub struct P2pConfig {
    /// Local TCP port to listen on.
    pub port: u16,
    /// Legacy boot node multiaddresses from config (`boot_nodes`).
    pub boot_nodes: Vec<String>,
    /// Hardcoded seed `host:port` strings compiled into the binary, used by
    /// bootstrap seeding alongside `boot_nodes` (§4.4.1). Devnet-only
    /// loopback defaults (§9 "Hardcoded loopback seeds").
    pub compiled_seeds: Vec<String>,
    /// DNS hostnames resolved at bootstrap time, each paired with `port`.
    pub dns_seeds: Vec<String>,
    /// Fixed wire protocol identifier (§6).
    pub protocol: String,
    /// Whether this node advertises itself as a bootstrap node (informational
    /// only, §4.4).
    pub is_bootstrap: bool,
    /// Whether the three discovery loops are enabled at all.
    pub enable_discovery: bool,
}

impl Default for P2pConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_P2P_PORT,
            boot_nodes: Vec::new(),
            compiled_seeds: vec!["127.0.0.1:30333".to_string()],
            dns_seeds: Vec::new(),
            protocol: WIRE_PROTOCOL.to_string(),
            is_bootstrap: false,
            enable_discovery: true,
        }
    }
}
