//! agent-chain-rpc
//!
//! The RPC surface (§4.6): a single `POST /` endpoint dispatching
//! `{method, params}` JSON bodies, plus a dedicated `GET /health`. No JSON-RPC
//! 2.0 envelope, no authentication — devnet scope.
//!
//! Methods: `get_height`, `get_balance`, `submit_transaction`.

pub mod api;
pub mod server;
pub mod types;

pub use server::{RpcServer, RpcServerHandle, RpcServerState};
pub use types::{GetBalanceResult, GetHeightResult, HealthResponse, SubmitTransactionResult};
