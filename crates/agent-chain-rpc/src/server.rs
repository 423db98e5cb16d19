use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use agent_chain_core::constants::RPC_SHUTDOWN_GRACE_SECS;
use agent_chain_p2p::OverlayHandle;
use agent_chain_state::StateEngine;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::api::{self, ApiError};
use crate::types::{HealthResponse, RpcErrorBody, RpcRequest};

/// Shared state behind every RPC handler (§4.6). `overlay` is optional so
/// the crate's unit/integration tests can exercise the chain-query methods
/// without standing up a full libp2p swarm.
pub struct RpcServerState {
    pub engine: Arc<StateEngine>,
    pub overlay: Option<OverlayHandle>,
    pub node_id: String,
}

/// A single HTTP server: `POST /` for JSON method dispatch, `GET /health`
/// for liveness (§4.6, §6). No authentication — devnet scope.
pub struct RpcServer {
    state: Arc<RpcServerState>,
}

pub struct RpcServerHandle {
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    join: tokio::task::JoinHandle<()>,
}

impl RpcServerHandle {
    /// Best-effort graceful shutdown with a fixed deadline (§4.7, §5).
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if tokio::time::timeout(Duration::from_secs(RPC_SHUTDOWN_GRACE_SECS), &mut self.join)
            .await
            .is_err()
        {
            error!("RPC server did not shut down within the grace period; aborting");
            self.join.abort();
        }
    }
}

impl RpcServer {
    pub fn new(state: Arc<RpcServerState>) -> Self {
        Self { state }
    }

    pub async fn start(self, addr: SocketAddr) -> std::io::Result<RpcServerHandle> {
        let app = Router::new()
            .route("/", post(handle_rpc))
            .route("/health", get(handle_health))
            .layer(ServiceBuilder::new().layer(CorsLayer::new().allow_methods(Any).allow_origin(Any)))
            .with_state(self.state);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, "RPC server listening");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let join = tokio::spawn(async move {
            let graceful = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = graceful.await {
                error!(error = %e, "RPC server exited with error");
            }
        });

        Ok(RpcServerHandle { shutdown_tx: Some(shutdown_tx), join })
    }
}

async fn handle_health(State(state): State<Arc<RpcServerState>>) -> Json<HealthResponse> {
    let peers = match &state.overlay {
        Some(overlay) => overlay.peer_count().await,
        None => 0,
    };
    Json(HealthResponse {
        status: "ok",
        height: state.engine.get_height(),
        peers,
        node_id: state.node_id.clone(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

async fn handle_rpc(State(state): State<Arc<RpcServerState>>, Json(req): Json<RpcRequest>) -> Response {
    match req.method.as_str() {
        "get_height" => Json(api::get_height(&state.engine)).into_response(),
        "get_balance" => match api::get_balance(&state.engine, req.params) {
            Ok(result) => Json(result).into_response(),
            Err(e) => error_response(e),
        },
        "submit_transaction" => match api::submit_transaction(&state.engine, req.params) {
            Ok(result) => Json(result).into_response(),
            Err(e) => error_response(e),
        },
        other => (
            StatusCode::BAD_REQUEST,
            Json(RpcErrorBody { error: format!("unknown method: {other}") }),
        )
            .into_response(),
    }
}

/// Decoding errors are caller mistakes (HTTP 400); engine validation errors
/// are surfaced as HTTP 500 with the error text (§4.6, §7).
fn error_response(err: ApiError) -> Response {
    let status = match &err {
        ApiError::Decoding(_) => StatusCode::BAD_REQUEST,
        ApiError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(RpcErrorBody { error: err.to_string() })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_chain_core::config::ChainConfig;
    use agent_chain_core::Account;
    use agent_chain_crypto::KeyPair;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("agent_chain_rpc_test_{}_{}", name, std::process::id()))
    }

    #[tokio::test]
    async fn server_starts_and_stops_on_loopback() {
        let dir = temp_dir("startstop");
        let kp = KeyPair::generate();
        let mut config = ChainConfig::default();
        config.genesis_accounts.push(Account { address: kp.address, balance: 1000, nonce: 0 });
        let engine = Arc::new(StateEngine::initialize(config, &dir).unwrap());
        let state = Arc::new(RpcServerState { engine, overlay: None, node_id: "test-node".into() });
        let handle = RpcServer::new(state).start("127.0.0.1:0".parse().unwrap()).await.unwrap();
        handle.stop().await;
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn health_reports_zero_peers_without_overlay() {
        let dir = temp_dir("health");
        let engine = Arc::new(StateEngine::initialize(ChainConfig::default(), &dir).unwrap());
        let state = Arc::new(RpcServerState { engine, overlay: None, node_id: "n1".into() });
        let resp = handle_health(State(state)).await;
        assert_eq!(resp.0.peers, 0);
        assert_eq!(resp.0.status, "ok");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn get_balance_rejects_invalid_address() {
        let dir = temp_dir("badaddr");
        let engine = Arc::new(StateEngine::initialize(ChainConfig::default(), &dir).unwrap());
        let err = api::get_balance(&engine, serde_json::json!({"address": "not-hex"})).unwrap_err();
        assert!(matches!(err, ApiError::Decoding(_)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn get_balance_returns_zero_account_for_unknown_address() {
        let dir = temp_dir("zeroacct");
        let engine = Arc::new(StateEngine::initialize(ChainConfig::default(), &dir).unwrap());
        let addr = agent_chain_core::types::Address::from_bytes([9u8; 20]);
        let result = api::get_balance(&engine, serde_json::json!({"address": addr.to_hex()})).unwrap();
        assert_eq!(result.balance, 0);
        assert_eq!(result.nonce, 0);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
