//! Wallet address parsing and normalization
//!
//! Accounts are 20-byte secp256k1 addresses written as `0x` followed by
//! 40 hex characters. Input casing is irrelevant: the parsed value holds
//! raw bytes, so equality is always case-normalized.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tiny_keccak::{Hasher, Keccak};

/// Errors produced while parsing a wallet address
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Wallet address must start with 0x")]
    MissingPrefix,

    #[error("Wallet address must have 40 hex characters, got {0}")]
    InvalidLength(usize),

    #[error("Wallet address contains non-hex characters")]
    InvalidHex,
}

/// Canonical wallet address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletAddress([u8; 20]);

impl WalletAddress {
    pub const LEN: usize = 20;

    /// Parse a `0x`-prefixed hex address, accepting any casing
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let input = input.trim();
        let hex_part = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;

        if hex_part.len() != Self::LEN * 2 {
            return Err(AddressError::InvalidLength(hex_part.len()));
        }

        let mut bytes = [0u8; Self::LEN];
        hex::decode_to_slice(hex_part, &mut bytes).map_err(|_| AddressError::InvalidHex)?;

        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Derive the address from an uncompressed SEC1 public key
    /// (65 bytes, leading `0x04` tag).
    pub fn from_uncompressed_public_key(sec1: &[u8]) -> Option<Self> {
        if sec1.len() != 65 || sec1[0] != 0x04 {
            return None;
        }

        let hash = keccak256(&sec1[1..]);
        let mut bytes = [0u8; Self::LEN];
        bytes.copy_from_slice(&hash[12..]);
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// EIP-55 mixed-case checksum form, for display to operators
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, ch) in lower.chars().enumerate() {
            let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
            if ch.is_ascii_alphabetic() && nibble >= 8 {
                out.push(ch.to_ascii_uppercase());
            } else {
                out.push(ch);
            }
        }
        out
    }
}

/// Keccak-256 digest
pub(crate) fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletAddress({})", self)
    }
}

impl FromStr for WalletAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for WalletAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        let lower = WalletAddress::parse("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        let mixed = WalletAddress::parse("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        let upper_prefix = WalletAddress::parse("0X5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED").unwrap();

        assert_eq!(lower, mixed);
        assert_eq!(lower, upper_prefix);
        assert_eq!(
            mixed.to_string(),
            "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"
        );
    }

    #[test]
    fn test_eip55_checksum() {
        let address = WalletAddress::parse("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        assert_eq!(
            address.to_checksum(),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );

        let address = WalletAddress::parse("0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359").unwrap();
        assert_eq!(
            address.to_checksum(),
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359"
        );
    }

    #[test]
    fn test_invalid_addresses() {
        assert_eq!(
            WalletAddress::parse("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"),
            Err(AddressError::MissingPrefix)
        );
        assert_eq!(
            WalletAddress::parse("0x5aaeb6053f"),
            Err(AddressError::InvalidLength(10))
        );
        assert_eq!(
            WalletAddress::parse("0xzzaeb6053f3e94c9b9a09f33669435e7ef1beaed"),
            Err(AddressError::InvalidHex)
        );
        // Stellar-style keys are not accepted
        assert!(WalletAddress::parse("GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7").is_err());
    }

    #[test]
    fn test_serde_uses_canonical_form() {
        let address: WalletAddress =
            serde_json::from_str("\"0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed\"").unwrap();
        assert_eq!(
            serde_json::to_string(&address).unwrap(),
            "\"0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed\""
        );
    }
}
