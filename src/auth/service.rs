//! Authentication service
//!
//! Core business logic for wallet-based authentication: challenge issuance,
//! signed-challenge login and refresh-token exchange.

use chrono::Duration;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{Challenge, Identity, LoginOutcome, Role, Session, UnknownRole};

use super::address::{AddressError, WalletAddress};
use super::challenge::{ChallengeIssuer, ChallengeMessage, MalformedChallenge};
use super::clock::Clock;
use super::crypto::{CryptoError, SignatureVerifier};
use super::jwt::{Claims, JwtError, SessionIssuer};
use super::store::{ChallengeError, NonceStore};

/// Auth service errors
///
/// Each variant is a distinct, caller-diagnosable condition and is
/// reported as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Signature belongs to {recovered}, not {claimed}")]
    AddressMismatch { claimed: String, recovered: String },

    #[error("Malformed challenge: {0}")]
    MalformedChallenge(String),

    #[error("Challenge not found")]
    ChallengeNotFound,

    #[error("Challenge expired")]
    ChallengeExpired,

    #[error("Challenge already used")]
    ChallengeAlreadyUsed,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Token error: {0}")]
    TokenError(String),
}

impl AuthError {
    /// Stable machine-readable kind
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidAddress(_) => "INVALID_ADDRESS",
            AuthError::UnknownRole(_) => "UNKNOWN_ROLE",
            AuthError::InvalidSignature(_) => "INVALID_SIGNATURE",
            AuthError::AddressMismatch { .. } => "ADDRESS_MISMATCH",
            AuthError::MalformedChallenge(_) => "MALFORMED_CHALLENGE",
            AuthError::ChallengeNotFound => "CHALLENGE_NOT_FOUND",
            AuthError::ChallengeExpired => "CHALLENGE_EXPIRED",
            AuthError::ChallengeAlreadyUsed => "CHALLENGE_ALREADY_USED",
            AuthError::InvalidToken(_) => "INVALID_TOKEN",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::TokenError(_) => "TOKEN_ERROR",
        }
    }

    fn address_mismatch(claimed: WalletAddress, recovered: WalletAddress) -> Self {
        AuthError::AddressMismatch {
            claimed: claimed.to_string(),
            recovered: recovered.to_string(),
        }
    }
}

impl From<AddressError> for AuthError {
    fn from(e: AddressError) -> Self {
        AuthError::InvalidAddress(e.to_string())
    }
}

impl From<UnknownRole> for AuthError {
    fn from(e: UnknownRole) -> Self {
        AuthError::UnknownRole(e.0)
    }
}

impl From<CryptoError> for AuthError {
    fn from(e: CryptoError) -> Self {
        AuthError::InvalidSignature(e.to_string())
    }
}

impl From<MalformedChallenge> for AuthError {
    fn from(e: MalformedChallenge) -> Self {
        AuthError::MalformedChallenge(e.0)
    }
}

impl From<ChallengeError> for AuthError {
    fn from(e: ChallengeError) -> Self {
        match e {
            ChallengeError::NotFound => AuthError::ChallengeNotFound,
            ChallengeError::Expired => AuthError::ChallengeExpired,
            ChallengeError::AlreadyUsed => AuthError::ChallengeAlreadyUsed,
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::TokenExpired => AuthError::TokenExpired,
            JwtError::InvalidToken(msg) => AuthError::InvalidToken(msg),
            JwtError::EncodingFailed(msg) => AuthError::TokenError(msg),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn NonceStore>,
    challenges: ChallengeIssuer,
    verifier: SignatureVerifier,
    sessions: SessionIssuer,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        store: Arc<dyn NonceStore>,
        clock: Arc<dyn Clock>,
        domain: String,
        jwt_secret: &str,
        nonce_ttl_seconds: i64,
        access_token_ttl_seconds: i64,
        refresh_token_ttl_days: i64,
    ) -> Self {
        Self {
            challenges: ChallengeIssuer::new(store.clone(), clock.clone(), domain, nonce_ttl_seconds),
            sessions: SessionIssuer::new(
                jwt_secret,
                clock.clone(),
                access_token_ttl_seconds,
                refresh_token_ttl_days,
            ),
            verifier: SignatureVerifier::new(),
            store,
            clock,
        }
    }

    /// Generate a challenge for a wallet to sign
    pub fn issue_challenge(&self, wallet_address: &str, role: &str) -> Result<Challenge, AuthError> {
        let wallet = WalletAddress::parse(wallet_address)?;
        let role: Role = role.parse()?;

        Ok(self.challenges.issue(wallet, role))
    }

    /// Verify a signed challenge and issue tokens
    pub fn login(
        &self,
        wallet_address: &str,
        message: &str,
        signature: &str,
    ) -> Result<LoginOutcome, AuthError> {
        let result = self.try_login(wallet_address, message, signature);

        match &result {
            Ok(outcome) => tracing::info!(
                wallet = %outcome.identity.wallet_address,
                role = %outcome.identity.role,
                "Login succeeded"
            ),
            Err(e) => tracing::warn!(
                wallet = %wallet_address,
                code = %e.code(),
                error = %e,
                "Login rejected"
            ),
        }

        result
    }

    fn try_login(
        &self,
        wallet_address: &str,
        message: &str,
        signature: &str,
    ) -> Result<LoginOutcome, AuthError> {
        let claimed = WalletAddress::parse(wallet_address)?;

        // 1. Who signed this?
        let recovered = self.verifier.verify(message, signature)?;

        // 2. Does the signer match both the claimant and the challenge subject?
        let subject = ChallengeMessage::extract_wallet(message);
        if recovered != claimed {
            return Err(match subject {
                // A genuine signature by the wallet the challenge was issued to
                Some(subject) if subject == recovered => {
                    AuthError::address_mismatch(claimed, recovered)
                }
                // Recovers to nobody involved: corrupted or forged. This also
                // covers a third wallet signing the claimant's own challenge,
                // e.g. bob submitting bob's challenge signed by alice.
                _ => AuthError::InvalidSignature(
                    "signature does not authenticate this message".to_string(),
                ),
            });
        }
        if let Some(subject) = subject {
            if subject != claimed {
                return Err(AuthError::address_mismatch(subject, recovered));
            }
        }

        // 3. Only messages rendered by this server for this domain
        let parsed = ChallengeMessage::parse(message, self.challenges.domain())?;

        // 4. Single-use, unexpired, current nonce
        let challenge = self
            .store
            .consume(&claimed, parsed.role, &parsed.nonce, self.clock.now())?;

        if challenge.message != message {
            return Err(AuthError::MalformedChallenge(
                "message differs from the issued challenge".to_string(),
            ));
        }

        // 5. Mint the session
        let session = self.sessions.issue(claimed, parsed.role)?;

        Ok(LoginOutcome {
            identity: Identity {
                wallet_address: claimed,
                role: parsed.role,
            },
            session,
        })
    }

    /// Refresh tokens using a valid refresh token
    pub fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let session = self.sessions.refresh(refresh_token).map_err(|e| {
            let e = AuthError::from(e);
            tracing::warn!(code = %e.code(), error = %e, "Refresh rejected");
            e
        })?;

        tracing::info!(wallet = %session.subject, role = %session.role, "Session refreshed");
        Ok(session)
    }

    /// Validate an access token presented on a protected route
    pub fn verify_access(&self, access_token: &str) -> Result<Claims, AuthError> {
        Ok(self.sessions.verify_access(access_token)?)
    }

    /// Number of challenges that are still signable
    pub fn outstanding_challenges(&self) -> usize {
        self.store.outstanding(self.clock.now())
    }

    /// Drop challenges that expired more than `retention` ago
    pub fn purge_expired_challenges(&self, retention: Duration) -> usize {
        self.store.purge_expired(self.clock.now() - retention)
    }

    pub fn access_token_ttl(&self) -> Duration {
        self.sessions.access_ttl()
    }
}
