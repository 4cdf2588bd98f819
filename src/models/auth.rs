//! Authentication models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Role;
use crate::auth::WalletAddress;

/// Outstanding authentication challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub wallet_address: WalletAddress,
    pub role: Role,
    pub nonce: String,
    pub message: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
}

impl Challenge {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_outstanding(&self, now: DateTime<Utc>) -> bool {
        !self.consumed && !self.is_expired(now)
    }
}

/// Tokens minted for a verified wallet
#[derive(Debug, Clone)]
pub struct Session {
    pub subject: WalletAddress,
    pub role: Role,
    pub access_token: String,
    pub refresh_token: String,
    pub issued_at: DateTime<Utc>,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Verified wallet and the role it holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub wallet_address: WalletAddress,
    pub role: Role,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub identity: Identity,
    pub session: Session,
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Request for authentication challenge
///
/// Fields stay as raw strings so the service can report
/// `INVALID_ADDRESS` / `UNKNOWN_ROLE` itself.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeRequest {
    pub wallet_address: String,
    pub role: String,
}

/// Response containing the authentication challenge
#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub message: String,
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
}

impl From<Challenge> for ChallengeResponse {
    fn from(challenge: Challenge) -> Self {
        Self {
            message: challenge.message,
            nonce: challenge.nonce,
            expires_at: challenge.expires_at,
        }
    }
}

/// Request to log in with a signed challenge
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub wallet_address: String,
    pub message: String,
    pub signature: String, // 0x-prefixed 65-byte personal_sign signature
}

/// Token pair as returned to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl From<&Session> for AuthTokens {
    fn from(session: &Session) -> Self {
        Self {
            access: session.access_token.clone(),
            refresh: session.refresh_token.clone(),
            token_type: "Bearer".to_string(),
            expires_in: (session.access_expires_at - session.issued_at).num_seconds(),
        }
    }
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub identity: Identity,
    pub tokens: AuthTokens,
}

impl From<LoginOutcome> for LoginResponse {
    fn from(outcome: LoginOutcome) -> Self {
        Self {
            identity: outcome.identity,
            tokens: AuthTokens::from(&outcome.session),
        }
    }
}

/// Refresh token request
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Refresh response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub tokens: AuthTokens,
}

/// Current identity, as seen through an access token
#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub wallet_address: WalletAddress,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// Admin view of the challenge store
#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeStatsResponse {
    pub outstanding: usize,
}

/// Liveness report
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub outstanding_challenges: usize,
}
