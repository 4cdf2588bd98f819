//! Centralized API error handling for the wallet auth server
//!
//! This module provides a unified error type for API responses with proper
//! HTTP status code mapping and JSON error responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::AuthError;
use crate::ledger::LedgerError;

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication failure; code and status follow the auth error kind
    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    Ledger(#[from] LedgerError),
}

/// JSON error response body
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Auth(err) => err.code(),
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::TooManyRequests => "TOO_MANY_REQUESTS",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::Ledger(err) => err.code(),
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(err) => auth_status(err),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Ledger(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidAddress(_)
        | AuthError::UnknownRole(_)
        | AuthError::MalformedChallenge(_) => StatusCode::BAD_REQUEST,
        AuthError::InvalidSignature(_)
        | AuthError::AddressMismatch { .. }
        | AuthError::InvalidToken(_)
        | AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
        AuthError::ChallengeNotFound => StatusCode::NOT_FOUND,
        AuthError::ChallengeAlreadyUsed => StatusCode::CONFLICT,
        AuthError::ChallengeExpired => StatusCode::GONE,
        AuthError::TokenError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        // Log server errors
        if status.is_server_error() {
            tracing::error!(error = %message, code = %error_code, "Server error occurred");
        } else {
            tracing::debug!(error = %message, code = %error_code, "Client error occurred");
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

// Malformed or mistyped request bodies
impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ApiError::BadRequest("test".to_string()).error_code(),
            "BAD_REQUEST"
        );
        assert_eq!(
            ApiError::Forbidden("test".to_string()).error_code(),
            "FORBIDDEN"
        );
        assert_eq!(ApiError::TooManyRequests.error_code(), "TOO_MANY_REQUESTS");
        assert_eq!(
            ApiError::from(AuthError::ChallengeAlreadyUsed).error_code(),
            "CHALLENGE_ALREADY_USED"
        );
    }

    #[test]
    fn test_auth_status_codes() {
        let cases = [
            (AuthError::InvalidAddress("x".into()), StatusCode::BAD_REQUEST),
            (AuthError::UnknownRole("x".into()), StatusCode::BAD_REQUEST),
            (AuthError::MalformedChallenge("x".into()), StatusCode::BAD_REQUEST),
            (AuthError::InvalidSignature("x".into()), StatusCode::UNAUTHORIZED),
            (
                AuthError::AddressMismatch {
                    claimed: "a".into(),
                    recovered: "b".into(),
                },
                StatusCode::UNAUTHORIZED,
            ),
            (AuthError::ChallengeNotFound, StatusCode::NOT_FOUND),
            (AuthError::ChallengeAlreadyUsed, StatusCode::CONFLICT),
            (AuthError::ChallengeExpired, StatusCode::GONE),
            (AuthError::InvalidToken("x".into()), StatusCode::UNAUTHORIZED),
            (AuthError::TokenExpired, StatusCode::UNAUTHORIZED),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("test".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::TooManyRequests.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::from(AuthError::TokenError("x".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(LedgerError::Transport("down".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(LedgerError::Reverted("nope".into())).error_code(),
            "LEDGER_REVERTED"
        );
    }
}
