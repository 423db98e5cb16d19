use std::time::Duration;

use agent_chain_core::constants::SYNC_POLL_INTERVAL_SECS;
use agent_chain_p2p::message::msg_type;
use agent_chain_p2p::OverlayHandle;
use tokio::sync::watch;
use tracing::warn;

/// Every `SYNC_POLL_INTERVAL_SECS`, if any peers are connected, ask an
/// arbitrary one for its height (§4.5). The reply (and any resulting
/// `get_blocks` request) is handled by `handlers::register_handlers`.
pub async fn run_sync_loop(overlay: OverlayHandle, mut shutdown_rx: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(Duration::from_secs(SYNC_POLL_INTERVAL_SECS));
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => { if *shutdown_rx.borrow() { break; } }
            _ = interval.tick() => {
                let peers = overlay.peer_ids().await;
                if let Some(peer) = peers.first() {
                    if let Err(e) = overlay.send_to(peer, msg_type::GET_HEIGHT, Vec::new()).await {
                        warn!(error = %e, peer, "sync-poll get_height failed");
                    }
                }
            }
        }
    }
}
