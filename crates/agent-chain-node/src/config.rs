use std::path::{Path, PathBuf};

use agent_chain_core::config::ChainConfig;
use agent_chain_core::constants::{DEFAULT_P2P_PORT, DEFAULT_RPC_PORT};
use agent_chain_core::types::Address;
use agent_chain_core::Account;
use anyhow::{Context, Result};
use serde::Deserialize;

/// Resolved node configuration (§6, §4.7). Accepts either the flat YAML
/// shape (`p2p_port`, `rpc_port`, ...) or the nested `p2p.*`/`rpc.*` shape;
/// a nested section wins over its flat counterpart when both are present.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub data_dir: PathBuf,
    pub p2p_port: u16,
    pub rpc_port: u16,
    pub private_key: Option<String>,
    pub boot_nodes: Vec<String>,
    pub is_validator: bool,
    pub is_bootstrap: bool,
    pub enable_discovery: bool,
    pub chain: ChainConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawNodeConfig {
    data_dir: Option<String>,
    p2p_port: Option<u16>,
    rpc_port: Option<u16>,
    private_key: Option<String>,
    boot_nodes: Vec<String>,
    is_validator: Option<bool>,
    is_bootstrap: Option<bool>,
    enable_discovery: Option<bool>,
    p2p: Option<RawP2pSection>,
    rpc: Option<RawRpcSection>,
    chain_id: Option<String>,
    block_time: Option<u64>,
    max_block_size: Option<usize>,
    max_tx_per_block: Option<usize>,
    initial_reward: Option<i64>,
    reward_decay: Option<f64>,
    genesis_accounts: Vec<RawGenesisAccount>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawP2pSection {
    port: Option<u16>,
    boot_nodes: Vec<String>,
    enable_discovery: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawRpcSection {
    port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct RawGenesisAccount {
    /// `0x`-prefixed hex address, as the wallet and operators write it.
    address: String,
    #[serde(default)]
    balance: i64,
    #[serde(default)]
    nonce: i64,
}

impl NodeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let raw: RawNodeConfig =
            serde_yaml::from_str(&text).with_context(|| format!("parsing YAML config {}", path.display()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawNodeConfig) -> Result<Self> {
        let mut genesis_accounts = Vec::with_capacity(raw.genesis_accounts.len());
        for entry in raw.genesis_accounts {
            let address = Address::from_hex(&entry.address)
                .with_context(|| format!("invalid genesis account address {}", entry.address))?;
            genesis_accounts.push(Account { address, balance: entry.balance, nonce: entry.nonce });
        }

        let mut chain = ChainConfig::default();
        if let Some(v) = raw.chain_id {
            chain.chain_id = v;
        }
        if let Some(v) = raw.block_time {
            chain.block_time = v;
        }
        if let Some(v) = raw.max_block_size {
            chain.max_block_size = v;
        }
        if let Some(v) = raw.max_tx_per_block {
            chain.max_tx_per_block = v;
        }
        if let Some(v) = raw.initial_reward {
            chain.initial_reward = v;
        }
        if let Some(v) = raw.reward_decay {
            chain.reward_decay = v;
        }
        if !genesis_accounts.is_empty() {
            chain.genesis_accounts = genesis_accounts;
        }

        let p2p_port = raw.p2p.as_ref().and_then(|s| s.port).or(raw.p2p_port).unwrap_or(DEFAULT_P2P_PORT);
        let rpc_port = raw.rpc.as_ref().and_then(|s| s.port).or(raw.rpc_port).unwrap_or(DEFAULT_RPC_PORT);
        let boot_nodes = match raw.p2p.as_ref() {
            Some(s) if !s.boot_nodes.is_empty() => s.boot_nodes.clone(),
            _ => raw.boot_nodes,
        };
        let enable_discovery =
            raw.p2p.as_ref().and_then(|s| s.enable_discovery).or(raw.enable_discovery).unwrap_or(true);

        Ok(NodeConfig {
            data_dir: raw.data_dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./data")),
            p2p_port,
            rpc_port,
            private_key: raw.private_key,
            boot_nodes,
            is_validator: raw.is_validator.unwrap_or(true),
            is_bootstrap: raw.is_bootstrap.unwrap_or(false),
            enable_discovery,
            chain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_shape_parses() {
        let yaml = r#"
data_dir: /tmp/agent-chain
p2p_port: 40000
rpc_port: 9000
is_bootstrap: true
boot_nodes: ["127.0.0.1:40001"]
"#;
        let raw: RawNodeConfig = serde_yaml::from_str(yaml).unwrap();
        let cfg = NodeConfig::from_raw(raw).unwrap();
        assert_eq!(cfg.p2p_port, 40000);
        assert_eq!(cfg.rpc_port, 9000);
        assert!(cfg.is_bootstrap);
        assert_eq!(cfg.boot_nodes, vec!["127.0.0.1:40001".to_string()]);
    }

    #[test]
    fn nested_shape_wins_over_flat() {
        let yaml = r#"
p2p_port: 1
rpc_port: 1
p2p:
  port: 40000
  boot_nodes: ["127.0.0.1:40001"]
rpc:
  port: 9000
"#;
        let raw: RawNodeConfig = serde_yaml::from_str(yaml).unwrap();
        let cfg = NodeConfig::from_raw(raw).unwrap();
        assert_eq!(cfg.p2p_port, 40000);
        assert_eq!(cfg.rpc_port, 9000);
    }

    #[test]
    fn defaults_apply_when_omitted() {
        let raw: RawNodeConfig = serde_yaml::from_str("data_dir: /tmp/x").unwrap();
        let cfg = NodeConfig::from_raw(raw).unwrap();
        assert_eq!(cfg.p2p_port, DEFAULT_P2P_PORT);
        assert_eq!(cfg.rpc_port, DEFAULT_RPC_PORT);
        assert!(cfg.is_validator);
        assert!(cfg.enable_discovery);
    }
}
