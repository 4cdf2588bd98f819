//! Wallet signature verification
//!
//! Recovers the signing address from Ethereum `personal_sign` (EIP-191)
//! signatures over secp256k1.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use thiserror::Error;

use super::address::{keccak256, WalletAddress};

const SIGNATURE_LEN: usize = 65;

/// Errors that can occur during signature verification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    #[error("Invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    #[error("Signature is not in canonical low-S form")]
    NonCanonical,

    #[error("Failed to recover public key")]
    RecoveryFailed,
}

/// EIP-191 digest of `message` as wallets compute it for `personal_sign`
pub fn eip191_hash(message: &[u8]) -> [u8; 32] {
    let mut buf = Vec::with_capacity(message.len() + 32);
    buf.extend_from_slice(b"\x19Ethereum Signed Message:\n");
    buf.extend_from_slice(message.len().to_string().as_bytes());
    buf.extend_from_slice(message);
    keccak256(&buf)
}

/// Stateless verifier, safe to share across requests
#[derive(Debug, Default, Clone, Copy)]
pub struct SignatureVerifier;

impl SignatureVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Recover the address that produced `signature` over `message`
    ///
    /// # Arguments
    /// * `message` - The exact text shown to the signer
    /// * `signature` - Hex `r || s || v`, optionally `0x`/`0X`-prefixed
    pub fn verify(&self, message: &str, signature: &str) -> Result<WalletAddress, CryptoError> {
        let (signature, recovery_id) = decode_signature(signature)?;
        let digest = eip191_hash(message.as_bytes());

        let key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
            .map_err(|_| CryptoError::RecoveryFailed)?;

        let point = key.to_encoded_point(false);
        WalletAddress::from_uncompressed_public_key(point.as_bytes())
            .ok_or(CryptoError::RecoveryFailed)
    }
}

fn decode_signature(signature: &str) -> Result<(Signature, RecoveryId), CryptoError> {
    let trimmed = signature.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let bytes = hex::decode(hex_part)
        .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))?;

    if bytes.len() != SIGNATURE_LEN {
        return Err(CryptoError::InvalidSignatureFormat(format!(
            "expected {} bytes, got {}",
            SIGNATURE_LEN,
            bytes.len()
        )));
    }

    let signature = Signature::from_slice(&bytes[..64])
        .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))?;

    // Malleable twin of a valid signature; wallets never emit these
    if signature.normalize_s().is_some() {
        return Err(CryptoError::NonCanonical);
    }

    let v = bytes[64];
    let recovery_byte = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        other => return Err(CryptoError::InvalidRecoveryId(other)),
    };

    let recovery_id =
        RecoveryId::from_byte(recovery_byte).ok_or(CryptoError::InvalidRecoveryId(v))?;

    Ok((signature, recovery_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::WalletSigner;

    // Well-known development key (anvil/hardhat account #0)
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn test_eip191_hash_known_vector() {
        // hashMessage("hello world") from ethers
        assert_eq!(
            hex::encode(eip191_hash(b"hello world")),
            "d9eba16ed0ecae432b71fe008c98cc872bb4cc214d3220a36f365326cf807d68"
        );
    }

    #[test]
    fn test_recovers_signer_address() {
        let signer = WalletSigner::from_hex(DEV_KEY).unwrap();
        assert_eq!(signer.address().to_string(), DEV_ADDRESS);

        let signature = signer.sign_message("login please").unwrap();
        let recovered = SignatureVerifier::new()
            .verify("login please", &signature)
            .unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[test]
    fn test_accepts_both_v_encodings() {
        let signer = WalletSigner::from_hex(DEV_KEY).unwrap();
        let signature = signer.sign_message("v encoding").unwrap();

        let mut bytes = hex::decode(signature.trim_start_matches("0x")).unwrap();
        assert!(bytes[64] == 27 || bytes[64] == 28);
        bytes[64] -= 27;

        let raw = hex::encode(&bytes);
        let recovered = SignatureVerifier::new().verify("v encoding", &raw).unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[test]
    fn test_accepts_uppercase_prefix() {
        let signer = WalletSigner::from_hex(DEV_KEY).unwrap();
        let signature = signer.sign_message("prefix").unwrap();
        let upper = format!("0X{}", signature.trim_start_matches("0x").to_uppercase());

        let verifier = SignatureVerifier::new();
        assert_eq!(verifier.verify("prefix", &upper).unwrap(), signer.address());
    }

    #[test]
    fn test_different_message_recovers_different_address() {
        let signer = WalletSigner::from_hex(DEV_KEY).unwrap();
        let signature = signer.sign_message("original").unwrap();

        match SignatureVerifier::new().verify("altered", &signature) {
            Ok(address) => assert_ne!(address, signer.address()),
            Err(_) => {}
        }
    }

    #[test]
    fn test_malformed_signatures() {
        let verifier = SignatureVerifier::new();

        assert!(matches!(
            verifier.verify("m", "not-hex"),
            Err(CryptoError::InvalidSignatureFormat(_))
        ));
        assert!(matches!(
            verifier.verify("m", "0xdeadbeef"),
            Err(CryptoError::InvalidSignatureFormat(_))
        ));

        let signer = WalletSigner::from_hex(DEV_KEY).unwrap();
        let signature = signer.sign_message("m").unwrap();
        let mut bytes = hex::decode(signature.trim_start_matches("0x")).unwrap();
        bytes[64] = 5;
        assert_eq!(
            verifier.verify("m", &hex::encode(&bytes)),
            Err(CryptoError::InvalidRecoveryId(5))
        );

        // r = 0 is never a valid scalar
        let mut zeroed = hex::decode(signature.trim_start_matches("0x")).unwrap();
        zeroed[..32].fill(0);
        assert!(verifier.verify("m", &hex::encode(&zeroed)).is_err());
    }

    #[test]
    fn test_rejects_high_s() {
        let signer = WalletSigner::from_hex(DEV_KEY).unwrap();
        let signature = signer.sign_message("malleable").unwrap();
        let bytes = hex::decode(signature.trim_start_matches("0x")).unwrap();

        let sig = Signature::from_slice(&bytes[..64]).unwrap();
        let (r, s) = sig.split_scalars();
        let high = Signature::from_scalars(r, -s).unwrap();

        let mut tampered = high.to_bytes().to_vec();
        tampered.push(bytes[64] ^ 1);
        assert_eq!(
            SignatureVerifier::new().verify("malleable", &hex::encode(&tampered)),
            Err(CryptoError::NonCanonical)
        );
    }
}
