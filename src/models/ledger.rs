//! Ledger call models

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operator request to invoke a contract method
#[derive(Debug, Serialize, Deserialize)]
pub struct LedgerCallRequest {
    pub contract: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LedgerCallResponse {
    pub result: Value,
}
