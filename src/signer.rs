//! Client-side wallet signing
//!
//! Produces `personal_sign` signatures the same way browser wallets and
//! operator scripts do. The private key is always supplied by the caller.

use k256::ecdsa::SigningKey;
use thiserror::Error;

use crate::auth::{eip191_hash, WalletAddress};

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),
}

pub struct WalletSigner {
    key: SigningKey,
    address: WalletAddress,
}

impl WalletSigner {
    /// Load a 32-byte secp256k1 key from hex, with or without `0x`/`0X`
    pub fn from_hex(private_key: &str) -> Result<Self, SignerError> {
        let trimmed = private_key.trim();
        let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

        let bytes = hex::decode(hex_part).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        let key =
            SigningKey::from_slice(&bytes).map_err(|e| SignerError::InvalidKey(e.to_string()))?;

        Ok(Self::from_key(key))
    }

    /// Fresh random key; used for throwaway wallets in tests
    pub fn random() -> Self {
        Self::from_key(SigningKey::random(&mut rand::rngs::OsRng))
    }

    fn from_key(key: SigningKey) -> Self {
        let point = key.verifying_key().to_encoded_point(false);
        // An uncompressed SEC1 point is always 65 bytes with a 0x04 tag
        let address = WalletAddress::from_uncompressed_public_key(point.as_bytes())
            .unwrap_or_else(|| WalletAddress::from_bytes([0u8; 20]));
        Self { key, address }
    }

    pub fn address(&self) -> WalletAddress {
        self.address
    }

    /// Sign `message` with EIP-191 framing; returns `0x` + hex(r || s || v)
    /// with `v` in {27, 28}
    pub fn sign_message(&self, message: &str) -> Result<String, SignerError> {
        let digest = eip191_hash(message.as_bytes());
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| SignerError::SigningFailed(e.to_string()))?;

        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(27 + recovery_id.to_byte());
        Ok(format!("0x{}", hex::encode(bytes)))
    }
}
