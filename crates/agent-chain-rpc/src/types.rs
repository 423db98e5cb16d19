use serde::{Deserialize, Serialize};

/// Top-level request body for `POST /` (§4.6, §6): `{method, params}`, no
/// JSON-RPC 2.0 envelope.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct GetHeightResult {
    pub height: i64,
}

#[derive(Debug, Deserialize)]
pub struct GetBalanceParams {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct GetBalanceResult {
    pub balance: i64,
    pub nonce: i64,
}

#[derive(Debug, Deserialize)]
pub struct SubmitTransactionParams {
    pub transaction: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct SubmitTransactionResult {
    pub tx_hash: String,
}

/// Body of `GET /health` (§4.6). HTTP 200 whenever the process is alive;
/// absence of the endpoint is the only external failure signal (§7).
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub height: i64,
    pub peers: usize,
    pub node_id: String,
    pub timestamp: i64,
}

/// Error body returned alongside a non-2xx status.
#[derive(Debug, Serialize)]
pub struct RpcErrorBody {
    pub error: String,
}
