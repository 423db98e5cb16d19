//! agent-chain-node — the devnet validator binary.
//!
//! Startup sequence (§4.7):
//!   1. load YAML configuration
//!   2. ensure the data directory exists
//!   3. load or generate the node key
//!   4. initialize the chain engine
//!   5. initialize the P2P overlay
//!   6. initialize the consensus loop, bound to engine and overlay
//!   7. start the overlay
//!   8. connect to configured legacy boot nodes (best-effort)
//!   9. start the consensus loop
//!  10. start the RPC server
//!  11. log node identifier, derived address, and bound ports
//!
//! Shutdown on SIGINT/SIGTERM stops the RPC server (5s grace), the
//! consensus loops, and the overlay, then flushes the engine to disk.

mod config;
mod keys;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use agent_chain_consensus::{register_handlers, run_production_loop, run_sync_loop};
use agent_chain_p2p::{run_addr_exchange_loop, run_discovery_loop, run_maintenance_loop, Overlay, P2pConfig};
use agent_chain_rpc::{RpcServer, RpcServerState};
use agent_chain_state::StateEngine;

use crate::config::NodeConfig;

#[derive(Parser, Debug)]
#[command(name = "agent-chain-node", version, about = "agent-chain devnet validator node")]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override the configured data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "fatal startup error");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    // ── 1. Config ─────────────────────────────────────────────────────────────
    let mut node_config = NodeConfig::load(&args.config).context("loading node configuration")?;
    if let Some(dir) = args.data_dir {
        node_config.data_dir = dir;
    }
    info!(chain_id = %node_config.chain.chain_id, "agent-chain node starting");

    // ── 2. Data directory ────────────────────────────────────────────────────
    std::fs::create_dir_all(&node_config.data_dir)
        .with_context(|| format!("creating data dir {}", node_config.data_dir.display()))?;

    // ── 3. Node key ───────────────────────────────────────────────────────────
    let keypair =
        keys::load_or_generate(&node_config.data_dir, node_config.private_key.as_deref()).context("loading node key")?;
    let node_id = keypair.address.to_hex();

    // ── 4. Chain engine ───────────────────────────────────────────────────────
    let engine = Arc::new(
        StateEngine::initialize(node_config.chain.clone(), &node_config.data_dir).context("initializing chain engine")?,
    );

    // ── 5. P2P overlay ────────────────────────────────────────────────────────
    let p2p_config = P2pConfig {
        port: node_config.p2p_port,
        boot_nodes: node_config.boot_nodes.clone(),
        is_bootstrap: node_config.is_bootstrap,
        enable_discovery: node_config.enable_discovery,
        ..P2pConfig::default()
    };
    let (overlay, overlay_handle) =
        Overlay::new(p2p_config.clone()).map_err(|e| anyhow::anyhow!("building overlay: {e}"))?;
    overlay.seed_bootstrap().await;

    // Root cancellation signal (§5): shared by every periodic loop spawned
    // below. The overlay's own run-loop is stopped separately via
    // `overlay_handle.shutdown()`, which closes all peer streams.
    let (root_shutdown_tx, root_shutdown_rx) = tokio::sync::watch::channel(false);

    // ── 6. Consensus loop registration ───────────────────────────────────────
    register_handlers(Arc::clone(&engine), overlay_handle.clone()).await;

    // ── 7. Start overlay ──────────────────────────────────────────────────────
    tokio::spawn(overlay.run());

    if node_config.enable_discovery {
        spawn_discovery_loops(overlay_handle.clone(), p2p_config.clone(), &root_shutdown_rx);
    }

    // ── 8. Legacy boot nodes, best-effort ─────────────────────────────────────
    for boot in &node_config.boot_nodes {
        if let Some((host, port)) =
            boot.rsplit_once(':').and_then(|(h, p)| p.parse::<u16>().ok().map(|p| (h.to_string(), p)))
        {
            overlay_handle.dial(&host, port).await;
        }
    }

    // ── 9. Consensus loop ──────────────────────────────────────────────────────
    if node_config.is_validator {
        let engine = Arc::clone(&engine);
        let overlay_handle = overlay_handle.clone();
        let chain_config = node_config.chain.clone();
        let validator = Arc::new(keypair);
        tokio::spawn(run_production_loop(engine, overlay_handle, chain_config, validator, root_shutdown_rx.clone()));
    }
    tokio::spawn(run_sync_loop(overlay_handle.clone(), root_shutdown_rx.clone()));

    // ── 10. RPC server ────────────────────────────────────────────────────────
    let rpc_state = Arc::new(RpcServerState {
        engine: Arc::clone(&engine),
        overlay: Some(overlay_handle.clone()),
        node_id: node_id.clone(),
    });
    let rpc_addr = std::net::SocketAddr::from(([0, 0, 0, 0], node_config.rpc_port));
    let rpc_handle = RpcServer::new(rpc_state).start(rpc_addr).await.context("starting RPC server")?;

    // ── 11. Ready ──────────────────────────────────────────────────────────────
    info!(
        node_id = %node_id,
        p2p_port = node_config.p2p_port,
        rpc_port = node_config.rpc_port,
        peer_id = %overlay_handle.local_peer_id(),
        "node ready"
    );

    wait_for_shutdown_signal().await;
    info!("shutdown signal received");

    rpc_handle.stop().await;
    let _ = root_shutdown_tx.send(true);
    overlay_handle.shutdown();

    Ok(())
}

fn spawn_discovery_loops(
    handle: agent_chain_p2p::OverlayHandle,
    config: P2pConfig,
    shutdown_rx: &tokio::sync::watch::Receiver<bool>,
) {
    tokio::spawn(run_discovery_loop(handle.clone(), config.clone(), shutdown_rx.clone()));
    tokio::spawn(run_addr_exchange_loop(handle.clone(), shutdown_rx.clone()));
    tokio::spawn(run_maintenance_loop(handle, config, shutdown_rx.clone()));
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
