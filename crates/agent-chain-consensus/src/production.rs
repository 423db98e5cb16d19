use std::sync::Arc;
use std::time::Duration;

use agent_chain_core::block::Block;
use agent_chain_core::config::ChainConfig;
use agent_chain_core::constants::FIXED_DIFFICULTY;
use agent_chain_core::types::Hash;
use agent_chain_core::BlockHeader;
use agent_chain_crypto::KeyPair;
use agent_chain_p2p::{msg_type, OverlayHandle};
use agent_chain_state::{finalize_header, StateEngine};
use tokio::sync::watch;
use tracing::{error, info};

/// Drive periodic block production on this node (§4.5). Only run when the
/// node is configured as a validator (all nodes in the devnet by default,
/// per §6 `is_validator`).
pub async fn run_production_loop(
    engine: Arc<StateEngine>,
    overlay: OverlayHandle,
    config: ChainConfig,
    validator: Arc<KeyPair>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(config.block_time));
    // The first tick fires immediately; skip it so genesis has a full
    // block-time window before the first production attempt.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("production loop shutting down");
                    break;
                }
            }
            _ = interval.tick() => {
                produce_once(&engine, &overlay, &config, &validator).await;
            }
        }
    }
}

async fn produce_once(
    engine: &Arc<StateEngine>,
    overlay: &OverlayHandle,
    config: &ChainConfig,
    validator: &Arc<KeyPair>,
) {
    let pending = engine.get_pending_transactions(config.max_tx_per_block);
    let last = engine.get_last_block();

    let tx_hashes: Vec<Hash> = pending.iter().map(|t| t.hash).collect();
    let header = BlockHeader {
        height: last.header.height + 1,
        prev_hash: last.header.hash,
        merkle_root: Hash::ZERO,
        timestamp: now(),
        difficulty: FIXED_DIFFICULTY,
        nonce: 0,
        validator: validator.address,
        hash: Hash::ZERO,
    };
    let header = finalize_header(header, &tx_hashes);
    let block = Block { header, transactions: pending };

    match engine.add_block(block.clone()) {
        Ok(()) => {
            info!(height = block.header.height, txs = block.transactions.len(), "produced block");
            let payload = bincode::serialize(&block).expect("block serialization is infallible");
            overlay.broadcast(msg_type::BLOCK, payload).await;
        }
        Err(e) => {
            error!(error = %e, "block production failed, will retry next tick");
        }
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
