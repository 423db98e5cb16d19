use agent_chain_core::error::ChainError;
use agent_chain_core::transaction::Transaction;
use agent_chain_core::types::Address;
use agent_chain_state::StateEngine;

use crate::types::{
    GetBalanceParams, GetBalanceResult, GetHeightResult, SubmitTransactionParams, SubmitTransactionResult,
};

/// Errors surfaced to RPC callers (§4.6, §7): caller-side decoding mistakes
/// map to HTTP 400, engine validation errors map to HTTP 500.
pub enum ApiError {
    Decoding(String),
    Engine(ChainError),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Decoding(s) => write!(f, "{s}"),
            ApiError::Engine(e) => write!(f, "{e}"),
        }
    }
}

pub fn get_height(engine: &StateEngine) -> GetHeightResult {
    GetHeightResult { height: engine.get_height() }
}

pub fn get_balance(engine: &StateEngine, params: serde_json::Value) -> Result<GetBalanceResult, ApiError> {
    let params: GetBalanceParams =
        serde_json::from_value(params).map_err(|e| ApiError::Decoding(format!("bad params: {e}")))?;
    let address = Address::from_hex(&params.address)
        .map_err(|_| ApiError::Decoding(format!("invalid address: {}", params.address)))?;
    let account = engine.get_account(&address);
    Ok(GetBalanceResult { balance: account.balance, nonce: account.nonce })
}

pub fn submit_transaction(
    engine: &StateEngine,
    params: serde_json::Value,
) -> Result<SubmitTransactionResult, ApiError> {
    let params: SubmitTransactionParams =
        serde_json::from_value(params).map_err(|e| ApiError::Decoding(format!("bad params: {e}")))?;
    let tx: Transaction = serde_json::from_value(params.transaction)
        .map_err(|e| ApiError::Decoding(format!("bad transaction: {e}")))?;
    let hash = engine.add_transaction(tx).map_err(ApiError::Engine)?;
    Ok(SubmitTransactionResult { tx_hash: hash.to_hex() })
}
