//! Admin-only HTTP handlers

use axum::{extract::State, Json};
use axum_extra::extract::WithRejection;

use super::AdminUser;
use crate::error::ApiError;
use crate::models::{ChallengeStatsResponse, LedgerCallRequest, LedgerCallResponse};
use crate::state::AppState;

/// GET /admin/challenges - Count of challenges that can still be signed
pub async fn challenge_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Json<ChallengeStatsResponse> {
    Json(ChallengeStatsResponse {
        outstanding: state.auth_service.outstanding_challenges(),
    })
}

/// POST /admin/ledger/call - Invoke a contract method on the configured ledger
pub async fn ledger_call(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    WithRejection(Json(req), _): WithRejection<Json<LedgerCallRequest>, ApiError>,
) -> Result<Json<LedgerCallResponse>, ApiError> {
    let ledger = state
        .ledger
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("No ledger endpoint configured".to_string()))?;

    tracing::info!(
        wallet = %admin.wallet_address,
        contract = %req.contract,
        method = %req.method,
        "Ledger call requested"
    );

    let result = ledger.call(&req.contract, &req.method, req.params).await?;

    Ok(Json(LedgerCallResponse { result }))
}
