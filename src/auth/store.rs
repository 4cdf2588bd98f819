//! Challenge storage
//!
//! The store is keyed by `(wallet, role)` and knows nothing about message
//! formatting. All checks for one key happen under that key's entry lock,
//! so `issue` and `consume` on the same key are linearizable while
//! unrelated wallets proceed in parallel.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;

use super::address::WalletAddress;
use crate::models::{Challenge, Role};

/// Reasons a challenge cannot be consumed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeError {
    #[error("Challenge not found")]
    NotFound,

    #[error("Challenge expired")]
    Expired,

    #[error("Challenge already used")]
    AlreadyUsed,
}

pub type ChallengeKey = (WalletAddress, Role);

pub trait NonceStore: Send + Sync {
    /// Store `challenge`, replacing whatever was held for its key.
    /// Returns the replaced challenge if it was still outstanding.
    fn issue(&self, challenge: Challenge) -> Option<Challenge>;

    /// Atomically validate and mark the challenge for `(wallet, role)` as
    /// consumed. Returns the stored challenge on success.
    fn consume(
        &self,
        wallet: &WalletAddress,
        role: Role,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<Challenge, ChallengeError>;

    /// Evict every challenge whose expiry is at or before `cutoff`
    fn purge_expired(&self, cutoff: DateTime<Utc>) -> usize;

    /// Number of unconsumed, unexpired challenges
    fn outstanding(&self, now: DateTime<Utc>) -> usize;
}

/// In-process challenge store backed by a sharded concurrent map
#[derive(Debug, Default)]
pub struct InMemoryNonceStore {
    challenges: DashMap<ChallengeKey, Challenge>,
}

impl InMemoryNonceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }
}

impl NonceStore for InMemoryNonceStore {
    fn issue(&self, challenge: Challenge) -> Option<Challenge> {
        let key = (challenge.wallet_address, challenge.role);
        let issued_at = challenge.issued_at;

        match self.challenges.entry(key) {
            Entry::Occupied(mut entry) => {
                let previous = entry.insert(challenge);
                previous.is_outstanding(issued_at).then_some(previous)
            }
            Entry::Vacant(entry) => {
                entry.insert(challenge);
                None
            }
        }
    }

    fn consume(
        &self,
        wallet: &WalletAddress,
        role: Role,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<Challenge, ChallengeError> {
        // get_mut holds the shard write lock until `entry` drops
        let mut entry = self
            .challenges
            .get_mut(&(*wallet, role))
            .ok_or(ChallengeError::NotFound)?;

        if entry.nonce != nonce {
            return Err(ChallengeError::NotFound);
        }

        if entry.consumed {
            return Err(ChallengeError::AlreadyUsed);
        }

        if entry.is_expired(now) {
            return Err(ChallengeError::Expired);
        }

        entry.consumed = true;
        Ok(entry.clone())
    }

    fn purge_expired(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.challenges.len();
        self.challenges
            .retain(|_, challenge| challenge.expires_at > cutoff);
        before.saturating_sub(self.challenges.len())
    }

    fn outstanding(&self, now: DateTime<Utc>) -> usize {
        self.challenges
            .iter()
            .filter(|entry| entry.value().is_outstanding(now))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn wallet() -> WalletAddress {
        WalletAddress::parse("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap()
    }

    fn challenge(nonce: &str, issued_at: DateTime<Utc>) -> Challenge {
        Challenge {
            wallet_address: wallet(),
            role: Role::Investor,
            nonce: nonce.to_string(),
            message: format!("message for {}", nonce),
            issued_at,
            expires_at: issued_at + Duration::seconds(300),
            consumed: false,
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_consume_once() {
        let store = InMemoryNonceStore::new();
        assert!(store.issue(challenge("n1", t0())).is_none());

        let consumed = store
            .consume(&wallet(), Role::Investor, "n1", t0() + Duration::seconds(10))
            .unwrap();
        assert!(consumed.consumed);
        assert_eq!(consumed.message, "message for n1");

        assert_eq!(
            store.consume(&wallet(), Role::Investor, "n1", t0() + Duration::seconds(11)),
            Err(ChallengeError::AlreadyUsed)
        );
    }

    #[test]
    fn test_consume_classifies_failures() {
        let store = InMemoryNonceStore::new();
        assert_eq!(
            store.consume(&wallet(), Role::Investor, "n1", t0()),
            Err(ChallengeError::NotFound)
        );

        store.issue(challenge("n1", t0()));
        assert_eq!(
            store.consume(&wallet(), Role::Investor, "other", t0()),
            Err(ChallengeError::NotFound)
        );
        assert_eq!(
            store.consume(&wallet(), Role::Admin, "n1", t0()),
            Err(ChallengeError::NotFound)
        );
        assert_eq!(
            store.consume(&wallet(), Role::Investor, "n1", t0() + Duration::seconds(300)),
            Err(ChallengeError::Expired)
        );
    }

    #[test]
    fn test_reissue_invalidates_previous() {
        let store = InMemoryNonceStore::new();
        store.issue(challenge("n1", t0()));

        let replaced = store.issue(challenge("n2", t0() + Duration::seconds(5)));
        assert_eq!(replaced.map(|c| c.nonce), Some("n1".to_string()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.outstanding(t0() + Duration::seconds(5)), 1);

        let now = t0() + Duration::seconds(6);
        assert_eq!(
            store.consume(&wallet(), Role::Investor, "n1", now),
            Err(ChallengeError::NotFound)
        );
        assert!(store.consume(&wallet(), Role::Investor, "n2", now).is_ok());
    }

    #[test]
    fn test_reissue_after_expiry_reports_nothing_replaced() {
        let store = InMemoryNonceStore::new();
        store.issue(challenge("n1", t0()));
        assert!(store
            .issue(challenge("n2", t0() + Duration::seconds(301)))
            .is_none());
    }

    #[test]
    fn test_purge_expired() {
        let store = InMemoryNonceStore::new();
        store.issue(challenge("n1", t0()));

        assert_eq!(store.purge_expired(t0() + Duration::seconds(299)), 0);
        assert_eq!(store.purge_expired(t0() + Duration::seconds(300)), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_consume_has_single_winner() {
        let store = Arc::new(InMemoryNonceStore::new());
        store.issue(challenge("n1", t0()));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.consume(&wallet(), Role::Investor, "n1", t0() + Duration::seconds(1))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        let losers = results
            .iter()
            .filter(|r| matches!(r, Err(ChallengeError::AlreadyUsed)))
            .count();

        assert_eq!(winners, 1);
        assert_eq!(losers, 15);
    }
}
