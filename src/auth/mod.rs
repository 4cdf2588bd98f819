//! Wallet authentication
//!
//! Challenge-response login for secp256k1 wallets:
//! - Single-use, expiring challenges keyed by wallet and role
//! - EIP-191 signature recovery
//! - Stateless JWT access and refresh tokens

mod address;
mod challenge;
mod clock;
mod crypto;
mod jwt;
mod service;
mod store;

pub use address::{AddressError, WalletAddress};
pub use challenge::{ChallengeIssuer, ChallengeMessage, MalformedChallenge, PROTOCOL_TAG};
pub use clock::{Clock, ManualClock, SystemClock};
pub use crypto::{eip191_hash, CryptoError, SignatureVerifier};
pub use jwt::{Claims, JwtError, SessionIssuer, TokenType, TOKEN_ISSUER};
pub use service::{AuthError, AuthService};
pub use store::{ChallengeError, ChallengeKey, InMemoryNonceStore, NonceStore};
