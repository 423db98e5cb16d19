use std::sync::Arc;

use agent_chain_core::block::Block;
use agent_chain_core::transaction::Transaction;
use agent_chain_p2p::message::{msg_type, GetBlocks, Height};
use agent_chain_p2p::OverlayHandle;
use agent_chain_state::StateEngine;
use tracing::{info, warn};

/// Register every inbound handler named in §4.5. Handlers run synchronously
/// inside the overlay's dispatch path, so anything that needs to send a
/// reply spawns its own task rather than awaiting there directly (the
/// overlay's `Handler` type is a plain `Fn`, not `async fn`).
pub async fn register_handlers(engine: Arc<StateEngine>, overlay: OverlayHandle) {
    {
        let engine = Arc::clone(&engine);
        overlay
            .register_handler(
                msg_type::BLOCK,
                Arc::new(move |msg| match bincode::deserialize::<Block>(&msg.data) {
                    Ok(block) => {
                        if let Err(e) = engine.add_block(block) {
                            warn!(error = %e, "inbound block rejected");
                        }
                    }
                    Err(e) => warn!(error = %e, "inbound block payload did not decode"),
                }),
            )
            .await;
    }

    {
        let engine = Arc::clone(&engine);
        overlay
            .register_handler(
                msg_type::TRANSACTION,
                Arc::new(move |msg| match bincode::deserialize::<Transaction>(&msg.data) {
                    Ok(tx) => {
                        if let Err(e) = engine.add_transaction(tx) {
                            warn!(error = %e, "inbound transaction rejected");
                        }
                    }
                    Err(e) => warn!(error = %e, "inbound transaction payload did not decode"),
                }),
            )
            .await;
    }

    {
        let engine = Arc::clone(&engine);
        let overlay_reply = overlay.clone();
        overlay
            .register_handler(
                msg_type::GET_HEIGHT,
                Arc::new(move |msg| {
                    let height = engine.get_height();
                    let overlay_reply = overlay_reply.clone();
                    let from = msg.from.clone();
                    tokio::spawn(async move {
                        let payload = bincode::serialize(&Height { height })
                            .expect("height serialization is infallible");
                        if let Err(e) = overlay_reply.send_to(&from, msg_type::HEIGHT, payload).await {
                            warn!(error = %e, "failed to reply to get_height");
                        }
                    });
                }),
            )
            .await;
    }

    {
        let engine = Arc::clone(&engine);
        let overlay_reply = overlay.clone();
        overlay
            .register_handler(
                msg_type::HEIGHT,
                Arc::new(move |msg| match bincode::deserialize::<Height>(&msg.data) {
                    Ok(remote) => {
                        info!(remote_height = remote.height, peer = %msg.from, "received height");
                        let local_height = engine.get_height();
                        if remote.height > local_height {
                            let overlay_reply = overlay_reply.clone();
                            let from = msg.from.clone();
                            tokio::spawn(async move {
                                let payload = bincode::serialize(&GetBlocks { from_height: local_height })
                                    .expect("get_blocks serialization is infallible");
                                if let Err(e) =
                                    overlay_reply.send_to(&from, msg_type::GET_BLOCKS, payload).await
                                {
                                    warn!(error = %e, "failed to request blocks above height");
                                }
                            });
                        }
                    }
                    Err(e) => warn!(error = %e, "height payload did not decode"),
                }),
            )
            .await;
    }

    {
        let engine = Arc::clone(&engine);
        let overlay_reply = overlay.clone();
        overlay
            .register_handler(
                msg_type::GET_BLOCKS,
                Arc::new(move |msg| match bincode::deserialize::<GetBlocks>(&msg.data) {
                    Ok(req) => {
                        let blocks = engine.get_blocks_above(req.from_height);
                        let overlay_reply = overlay_reply.clone();
                        let from = msg.from.clone();
                        tokio::spawn(async move {
                            for block in blocks {
                                let payload =
                                    bincode::serialize(&block).expect("block serialization is infallible");
                                if let Err(e) = overlay_reply.send_to(&from, msg_type::BLOCK, payload).await {
                                    warn!(error = %e, "failed to send block in get_blocks reply");
                                    break;
                                }
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "get_blocks payload did not decode"),
                }),
            )
            .await;
    }
}
