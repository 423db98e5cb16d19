use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::constants::*;

/// Genesis and block-production parameters for a chain (§3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: String,

    #[serde(default = "default_block_time")]
    pub block_time: u64,

    #[serde(default = "default_max_block_size")]
    pub max_block_size: usize,

    #[serde(default = "default_max_tx_per_block")]
    pub max_tx_per_block: usize,

    #[serde(default = "default_initial_reward")]
    pub initial_reward: i64,

    #[serde(default = "default_reward_decay")]
    pub reward_decay: f64,

    #[serde(default)]
    pub genesis_accounts: Vec<Account>,
}

fn default_block_time() -> u64 {
    DEFAULT_BLOCK_TIME_SECS
}
fn default_max_block_size() -> usize {
    DEFAULT_MAX_BLOCK_SIZE
}
fn default_max_tx_per_block() -> usize {
    DEFAULT_MAX_TX_PER_BLOCK
}
fn default_initial_reward() -> i64 {
    DEFAULT_INITIAL_REWARD
}
fn default_reward_decay() -> f64 {
    DEFAULT_REWARD_DECAY
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: "agent-chain-devnet".into(),
            block_time: default_block_time(),
            max_block_size: default_max_block_size(),
            max_tx_per_block: default_max_tx_per_block(),
            initial_reward: default_initial_reward(),
            reward_decay: default_reward_decay(),
            genesis_accounts: Vec::new(),
        }
    }
}

impl ChainConfig {
    /// Reward actually paid for the `n`th (0-indexed) produced block, with
    /// `reward_decay` applied multiplicatively per block and floored at
    /// `MIN_REWARD` (§9 Open Question — reward semantics).
    pub fn reward_at(&self, block_index: u64) -> i64 {
        if self.reward_decay >= 1.0 {
            return self.initial_reward;
        }
        let decayed = (self.initial_reward as f64) * self.reward_decay.powi(block_index as i32);
        (decayed.round() as i64).max(MIN_REWARD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_decay_is_constant_reward() {
        let cfg = ChainConfig::default();
        assert_eq!(cfg.reward_at(0), cfg.reward_at(100));
    }

    #[test]
    fn decay_floors_at_min_reward() {
        let mut cfg = ChainConfig::default();
        cfg.reward_decay = 0.5;
        cfg.initial_reward = 1000;
        assert!(cfg.reward_at(1000) >= MIN_REWARD);
    }
}
