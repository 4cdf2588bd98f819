//! Authentication HTTP handlers
//!
//! Endpoints for wallet-based authentication.

use axum::{extract::State, Json};
use axum_extra::extract::WithRejection;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::{
    AuthTokens, ChallengeRequest, ChallengeResponse, LoginRequest, LoginResponse, MeResponse,
    RefreshResponse, RefreshTokenRequest,
};
use crate::state::AppState;

/// POST /auth/challenge - Request a challenge message for a wallet and role
pub async fn request_challenge(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<ChallengeRequest>, ApiError>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let challenge = state
        .auth_service
        .issue_challenge(&req.wallet_address, &req.role)?;

    Ok(Json(challenge.into()))
}

/// POST /auth/login - Exchange a signed challenge for a session
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = state
        .auth_service
        .login(&req.wallet_address, &req.message, &req.signature)?;

    Ok(Json(outcome.into()))
}

/// POST /auth/refresh - Rotate a session using its refresh token
pub async fn refresh_token(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RefreshTokenRequest>, ApiError>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let session = state.auth_service.refresh(&req.refresh_token)?;

    Ok(Json(RefreshResponse {
        tokens: AuthTokens::from(&session),
    }))
}

/// GET /auth/me - Identity behind the presented access token
pub async fn get_current_user(user: AuthenticatedUser) -> Json<MeResponse> {
    Json(MeResponse {
        wallet_address: user.wallet_address,
        role: user.role,
        expires_at: user.expires_at,
    })
}
