//! Challenge message template and issuance
//!
//! The signed text is rendered from a fixed template and parsed back by
//! re-rendering, so only messages this server could have produced for the
//! configured domain are accepted.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;
use thiserror::Error;

use super::address::WalletAddress;
use super::clock::Clock;
use super::store::NonceStore;
use crate::models::{Challenge, Role};

/// Static tag binding signatures to this protocol
pub const PROTOCOL_TAG: &str = "wallet-auth/v1";

const STATEMENT: &str =
    "This is an authentication request. It will not trigger a blockchain transaction or move any funds.";

const WALLET_PREFIX: &str = "Wallet: ";
const ROLE_PREFIX: &str = "Role: ";
const NONCE_PREFIX: &str = "Nonce: ";
const ISSUED_AT_PREFIX: &str = "Issued At: ";
const EXPIRES_PREFIX: &str = "Expiration Time: ";
const PROTOCOL_PREFIX: &str = "Protocol: ";

const NONCE_BYTES: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed challenge: {0}")]
pub struct MalformedChallenge(pub String);

/// Fields carried by a challenge message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeMessage {
    pub domain: String,
    pub wallet_address: WalletAddress,
    pub role: Role,
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ChallengeMessage {
    pub fn render(&self) -> String {
        [
            format!("{} wants you to sign in with your wallet.", self.domain),
            String::new(),
            STATEMENT.to_string(),
            String::new(),
            format!("{}{}", WALLET_PREFIX, self.wallet_address),
            format!("{}{}", ROLE_PREFIX, self.role),
            format!("{}{}", NONCE_PREFIX, self.nonce),
            format!("{}{}", ISSUED_AT_PREFIX, format_time(self.issued_at)),
            format!("{}{}", EXPIRES_PREFIX, format_time(self.expires_at)),
            format!("{}{}", PROTOCOL_PREFIX, PROTOCOL_TAG),
        ]
        .join("\n")
    }

    /// Parse a message issued for `domain`.
    ///
    /// The parsed fields are rendered again and must reproduce `message`
    /// byte for byte; any reordering, extra whitespace, alternate casing or
    /// foreign domain is rejected.
    pub fn parse(message: &str, domain: &str) -> Result<Self, MalformedChallenge> {
        let lines: Vec<&str> = message.split('\n').collect();
        if lines.len() != 10 {
            return Err(MalformedChallenge(format!(
                "expected 10 lines, got {}",
                lines.len()
            )));
        }

        let header = format!("{} wants you to sign in with your wallet.", domain);
        if lines[0] != header {
            return Err(MalformedChallenge("unexpected domain header".to_string()));
        }

        let wallet_address = field(lines[4], WALLET_PREFIX)
            .and_then(|v| WalletAddress::parse(v).ok())
            .ok_or_else(|| MalformedChallenge("invalid wallet line".to_string()))?;

        let role = field(lines[5], ROLE_PREFIX)
            .and_then(|v| v.parse::<Role>().ok())
            .ok_or_else(|| MalformedChallenge("invalid role line".to_string()))?;

        let nonce = field(lines[6], NONCE_PREFIX)
            .filter(|v| is_valid_nonce(v))
            .ok_or_else(|| MalformedChallenge("invalid nonce line".to_string()))?
            .to_string();

        let issued_at = field(lines[7], ISSUED_AT_PREFIX)
            .and_then(parse_time)
            .ok_or_else(|| MalformedChallenge("invalid issued-at line".to_string()))?;

        let expires_at = field(lines[8], EXPIRES_PREFIX)
            .and_then(parse_time)
            .ok_or_else(|| MalformedChallenge("invalid expiration line".to_string()))?;

        let parsed = Self {
            domain: domain.to_string(),
            wallet_address,
            role,
            nonce,
            issued_at,
            expires_at,
        };

        if parsed.render() != message {
            return Err(MalformedChallenge(
                "message does not match the challenge template".to_string(),
            ));
        }

        Ok(parsed)
    }

    /// Find the wallet named by a message without validating the rest of it
    pub fn extract_wallet(message: &str) -> Option<WalletAddress> {
        message
            .lines()
            .find_map(|line| line.strip_prefix(WALLET_PREFIX))
            .and_then(|v| WalletAddress::parse(v).ok())
    }
}

fn field<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.strip_prefix(prefix)
}

fn is_valid_nonce(nonce: &str) -> bool {
    nonce.len() == NONCE_BYTES * 2
        && nonce
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn format_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Generate a cryptographically secure nonce
fn generate_secure_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Builds challenges and hands them to the nonce store
#[derive(Clone)]
pub struct ChallengeIssuer {
    store: Arc<dyn NonceStore>,
    clock: Arc<dyn Clock>,
    domain: String,
    ttl: Duration,
}

impl ChallengeIssuer {
    pub fn new(
        store: Arc<dyn NonceStore>,
        clock: Arc<dyn Clock>,
        domain: String,
        ttl_seconds: i64,
    ) -> Self {
        Self {
            store,
            clock,
            domain,
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn issue(&self, wallet_address: WalletAddress, role: Role) -> Challenge {
        // Whole seconds, so the rendered timestamps carry the exact value
        let now = self.clock.now();
        let issued_at = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        let expires_at = issued_at + self.ttl;

        let fields = ChallengeMessage {
            domain: self.domain.clone(),
            wallet_address,
            role,
            nonce: generate_secure_nonce(),
            issued_at,
            expires_at,
        };

        let challenge = Challenge {
            wallet_address,
            role,
            message: fields.render(),
            nonce: fields.nonce,
            issued_at,
            expires_at,
            consumed: false,
        };

        if let Some(previous) = self.store.issue(challenge.clone()) {
            tracing::debug!(
                wallet = %wallet_address,
                role = %role,
                previous_expires_at = %previous.expires_at,
                "Replaced outstanding challenge"
            );
        }

        tracing::info!(
            wallet = %wallet_address,
            role = %role,
            expires_at = %expires_at,
            "Challenge issued"
        );

        challenge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::store::InMemoryNonceStore;

    const DOMAIN: &str = "vault.example";

    fn sample() -> ChallengeMessage {
        ChallengeMessage {
            domain: DOMAIN.to_string(),
            wallet_address: WalletAddress::parse("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed")
                .unwrap(),
            role: Role::Investor,
            nonce: "ab".repeat(32),
            issued_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            expires_at: DateTime::from_timestamp(1_700_000_300, 0).unwrap(),
        }
    }

    #[test]
    fn test_render_layout() {
        let message = sample().render();
        let expected = format!(
            "vault.example wants you to sign in with your wallet.\n\
             \n\
             {}\n\
             \n\
             Wallet: 0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed\n\
             Role: INVESTOR\n\
             Nonce: {}\n\
             Issued At: 2023-11-14T22:13:20Z\n\
             Expiration Time: 2023-11-14T22:18:20Z\n\
             Protocol: wallet-auth/v1",
            STATEMENT,
            "ab".repeat(32)
        );
        assert_eq!(message, expected);
    }

    #[test]
    fn test_parse_rendered_message() {
        let fields = sample();
        let parsed = ChallengeMessage::parse(&fields.render(), DOMAIN).unwrap();
        assert_eq!(parsed, fields);
    }

    #[test]
    fn test_parse_rejects_other_domain() {
        let message = sample().render();
        assert!(ChallengeMessage::parse(&message, "evil.example").is_err());
    }

    #[test]
    fn test_parse_rejects_tampering() {
        let message = sample().render();

        let cases = [
            message.replace("INVESTOR", "ADMIN "),
            message.replace("Role: INVESTOR", "role: INVESTOR"),
            message.replace("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed", "0x5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED"),
            message.replace("wallet-auth/v1", "wallet-auth/v2"),
            message.replace("22:18:20Z", "22:18:20+00:00"),
            format!("{}\n", message),
            message.replace('\n', "\r\n"),
            "Transfer 100 tokens to 0xabc".to_string(),
        ];

        for case in cases {
            assert!(
                ChallengeMessage::parse(&case, DOMAIN).is_err(),
                "accepted tampered message: {case:?}"
            );
        }
    }

    #[test]
    fn test_extract_wallet() {
        let message = sample().render();
        assert_eq!(
            ChallengeMessage::extract_wallet(&message),
            Some(sample().wallet_address)
        );
        assert_eq!(ChallengeMessage::extract_wallet("hello"), None);
    }

    #[test]
    fn test_issuer_stores_fresh_challenge() {
        let store = Arc::new(InMemoryNonceStore::new());
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp_millis(1_700_000_000_750).unwrap(),
        ));
        let issuer = ChallengeIssuer::new(store.clone(), clock, DOMAIN.to_string(), 300);

        let wallet = sample().wallet_address;
        let first = issuer.issue(wallet, Role::Admin);
        let second = issuer.issue(wallet, Role::Admin);

        assert_ne!(first.nonce, second.nonce);
        assert_eq!(first.issued_at.timestamp_subsec_millis(), 0);
        assert_eq!(first.expires_at - first.issued_at, Duration::seconds(300));
        assert_eq!(store.len(), 1);

        let parsed = ChallengeMessage::parse(&second.message, DOMAIN).unwrap();
        assert_eq!(parsed.nonce, second.nonce);
        assert_eq!(parsed.role, Role::Admin);
        assert_eq!(parsed.expires_at, second.expires_at);
    }
}
