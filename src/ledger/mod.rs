//! Ledger boundary
//!
//! Authenticated operators invoke contract methods on a remote ledger node.
//! Calls are opaque: they either return a JSON result or a revert reason.
//! Nothing here retries; the caller decides whether to try again.

use axum::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Call reverted: {0}")]
    Reverted(String),

    #[error("Ledger transport error: {0}")]
    Transport(String),

    #[error("Invalid ledger response: {0}")]
    InvalidResponse(String),
}

impl LedgerError {
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::Reverted(_) => "LEDGER_REVERTED",
            LedgerError::Transport(_) => "LEDGER_UNAVAILABLE",
            LedgerError::InvalidResponse(_) => "LEDGER_INVALID_RESPONSE",
        }
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LedgerError::InvalidResponse(err.to_string())
        } else {
            LedgerError::Transport(err.to_string())
        }
    }
}

/// Remote contract endpoint addressed by a stable contract identifier
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn call(&self, contract: &str, method: &str, params: Value) -> Result<Value, LedgerError>;
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize, Serialize)]
struct RpcError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl RpcError {
    fn reason(&self) -> String {
        match &self.data {
            Some(Value::String(data)) if !data.is_empty() => data.clone(),
            _ => self.message.clone(),
        }
    }
}

/// JSON-RPC 2.0 client for a ledger node
pub struct JsonRpcLedger {
    rpc_url: String,
    client: Client,
    next_id: AtomicU64,
}

impl JsonRpcLedger {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }
}

#[async_trait]
impl LedgerGateway for JsonRpcLedger {
    async fn call(&self, contract: &str, method: &str, params: Value) -> Result<Value, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": {
                "contract": contract,
                "args": params,
            }
        });

        tracing::debug!(contract, method, id, "Calling ledger");

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await?
            .json::<RpcResponse>()
            .await?;

        if let Some(err) = response.error {
            let reason = err.reason();
            tracing::warn!(contract, method, code = err.code, reason = %reason, "Ledger call reverted");
            return Err(LedgerError::Reverted(reason));
        }

        response
            .result
            .ok_or_else(|| LedgerError::InvalidResponse("No result in RPC response".to_string()))
    }
}
