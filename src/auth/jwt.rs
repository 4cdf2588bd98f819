//! JWT session issuing and validation
//!
//! Handles creation and verification of access and refresh tokens. Tokens
//! are self-contained; nothing is stored server-side.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::address::WalletAddress;
use super::clock::Clock;
use crate::models::{Role, Session};

/// Issuer claim stamped on every token
pub const TOKEN_ISSUER: &str = "wallet-auth";

/// JWT-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (wallet address, canonical lowercase)
    pub sub: String,
    /// Granted role
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// JWT ID
    pub jti: String,
    /// Token type (access or refresh)
    pub token_type: TokenType,
    pub iss: String,
}

impl Claims {
    pub fn subject(&self) -> Result<WalletAddress, JwtError> {
        WalletAddress::parse(&self.sub).map_err(|e| JwtError::InvalidToken(e.to_string()))
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Token type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Mints and checks session tokens with the service's HS256 secret
#[derive(Clone)]
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: Arc<dyn Clock>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl SessionIssuer {
    /// Create a new SessionIssuer
    ///
    /// # Arguments
    /// * `secret` - JWT signing secret
    /// * `access_ttl_seconds` - Access token lifetime in seconds
    /// * `refresh_ttl_days` - Refresh token lifetime in days
    pub fn new(
        secret: &str,
        clock: Arc<dyn Clock>,
        access_ttl_seconds: i64,
        refresh_ttl_days: i64,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            clock,
            access_ttl: Duration::seconds(access_ttl_seconds),
            refresh_ttl: Duration::days(refresh_ttl_days),
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Issue an access/refresh pair for a verified wallet
    pub fn issue(&self, subject: WalletAddress, role: Role) -> Result<Session, JwtError> {
        let now = self.clock.now();
        let issued_at = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        let access_expires_at = issued_at + self.access_ttl;
        let refresh_expires_at = issued_at + self.refresh_ttl;

        let access_token = self.encode_token(
            subject,
            role,
            issued_at,
            access_expires_at,
            TokenType::Access,
        )?;
        let refresh_token = self.encode_token(
            subject,
            role,
            issued_at,
            refresh_expires_at,
            TokenType::Refresh,
        )?;

        Ok(Session {
            subject,
            role,
            access_token,
            refresh_token,
            issued_at,
            access_expires_at,
            refresh_expires_at,
        })
    }

    /// Exchange a refresh token for a new session bound to the same
    /// subject and role. The refresh token is rotated as well.
    pub fn refresh(&self, refresh_token: &str) -> Result<Session, JwtError> {
        let claims = self.verify(refresh_token, TokenType::Refresh)?;
        let subject = claims.subject()?;
        self.issue(subject, claims.role)
    }

    /// Validate an access token presented on a protected route
    pub fn verify_access(&self, access_token: &str) -> Result<Claims, JwtError> {
        self.verify(access_token, TokenType::Access)
    }

    fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let claims = self.decode_token(token)?;

        if claims.token_type != expected {
            return Err(JwtError::InvalidToken(format!(
                "expected {} token, got {}",
                expected.as_str(),
                claims.token_type.as_str()
            )));
        }

        if claims.exp <= self.clock.now().timestamp() {
            return Err(JwtError::TokenExpired);
        }

        Ok(claims)
    }

    fn encode_token(
        &self,
        subject: WalletAddress,
        role: Role,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        token_type: TokenType,
    ) -> Result<String, JwtError> {
        let claims = Claims {
            sub: subject.to_string(),
            role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type,
            iss: TOKEN_ISSUER.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    fn decode_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock in `verify`
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.set_issuer(&[TOKEN_ISSUER]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                _ => JwtError::InvalidToken(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;

    fn wallet() -> WalletAddress {
        WalletAddress::parse("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap()
    }

    fn issuer_with_clock() -> (SessionIssuer, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let issuer = SessionIssuer::new("test-secret-key", clock.clone(), 900, 7);
        (issuer, clock)
    }

    #[test]
    fn test_issue_session() {
        let (issuer, _) = issuer_with_clock();
        let session = issuer.issue(wallet(), Role::Investor).unwrap();

        assert_eq!(session.subject, wallet());
        assert_eq!(session.role, Role::Investor);
        assert_eq!(session.access_expires_at - session.issued_at, Duration::seconds(900));
        assert_eq!(session.refresh_expires_at - session.issued_at, Duration::days(7));

        let claims = issuer.verify_access(&session.access_token).unwrap();
        assert_eq!(claims.sub, "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
        assert_eq!(claims.role, Role::Investor);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.iss, TOKEN_ISSUER);
    }

    #[test]
    fn test_refresh_rotates_tokens() {
        let (issuer, clock) = issuer_with_clock();
        let session = issuer.issue(wallet(), Role::Admin).unwrap();

        clock.advance(Duration::hours(1));
        let refreshed = issuer.refresh(&session.refresh_token).unwrap();

        assert_eq!(refreshed.subject, wallet());
        assert_eq!(refreshed.role, Role::Admin);
        assert_ne!(refreshed.refresh_token, session.refresh_token);
        assert!(refreshed.issued_at > session.issued_at);
    }

    #[test]
    fn test_token_kinds_are_not_interchangeable() {
        let (issuer, _) = issuer_with_clock();
        let session = issuer.issue(wallet(), Role::Investor).unwrap();

        assert!(matches!(
            issuer.refresh(&session.access_token),
            Err(JwtError::InvalidToken(_))
        ));
        assert!(matches!(
            issuer.verify_access(&session.refresh_token),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_expired_tokens() {
        let (issuer, clock) = issuer_with_clock();
        let session = issuer.issue(wallet(), Role::Investor).unwrap();

        clock.advance(Duration::seconds(900));
        assert_eq!(
            issuer.verify_access(&session.access_token),
            Err(JwtError::TokenExpired)
        );
        assert!(issuer.refresh(&session.refresh_token).is_ok());

        clock.advance(Duration::days(7));
        assert!(matches!(
            issuer.refresh(&session.refresh_token),
            Err(JwtError::TokenExpired)
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let (issuer, clock) = issuer_with_clock();
        let other = SessionIssuer::new("other-secret", clock, 900, 7);

        let session = issuer.issue(wallet(), Role::Investor).unwrap();
        assert!(matches!(
            other.verify_access(&session.access_token),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_invalid_token() {
        let (issuer, _) = issuer_with_clock();
        assert!(matches!(
            issuer.refresh("invalid.token.here"),
            Err(JwtError::InvalidToken(_))
        ));
    }
}
