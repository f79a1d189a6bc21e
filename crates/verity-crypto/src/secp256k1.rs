//! # secp256k1 ECDSA Signing and Verification
//!
//! ECDSA over secp256k1 with SHA-256 message hashing (`k256`). Public keys
//! are 33-byte SEC1 compressed points; signatures are the 64-byte fixed
//! `r‖s` encoding, always low-S normalized. High-S signatures are rejected
//! on verification so a signature has exactly one valid encoding.

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use verity_core::encoding::{from_hex_array, hex_prefix};
use verity_core::CanonicalBytes;

use crate::error::CryptoError;
use crate::keys::{KeyAlgorithm, SigningKeyPair};

const ALGORITHM: &str = "secp256k1";

/// A secp256k1 ECDSA key pair.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate a new random key pair from the OS CSPRNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut rand::rngs::OsRng),
        }
    }

    /// Build a key pair from a 32-byte secret scalar.
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidKey`] if the scalar is zero or not below the
    /// curve order.
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_slice(secret).map_err(|e| CryptoError::InvalidKey {
            algorithm: ALGORITHM,
            reason: e.to_string(),
        })?;
        Ok(Self { signing_key })
    }

    /// Build a key pair from a 64-character hex secret.
    pub fn from_secret_hex(hex: &str) -> Result<Self, CryptoError> {
        let secret = from_hex_array::<32>(hex).map_err(|e| CryptoError::InvalidKey {
            algorithm: ALGORITHM,
            reason: e.to_string(),
        })?;
        Self::from_secret_bytes(&secret)
    }

    /// The 33-byte compressed public key.
    pub fn public_key(&self) -> Vec<u8> {
        self.signing_key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }
}

impl SigningKeyPair for Secp256k1KeyPair {
    fn algorithm(&self) -> KeyAlgorithm {
        KeyAlgorithm::Secp256k1
    }

    fn public_key_bytes(&self) -> Vec<u8> {
        self.public_key()
    }

    fn sign(&self, data: &CanonicalBytes) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(data.as_bytes());
        signature.to_bytes().to_vec()
    }
}

impl std::fmt::Debug for Secp256k1KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secp256k1KeyPair(pub={}..)", hex_prefix(&self.public_key()))
    }
}

pub(crate) fn verify(
    public_key: &[u8],
    data: &CanonicalBytes,
    signature: &[u8],
) -> Result<bool, CryptoError> {
    let vk = VerifyingKey::from_sec1_bytes(public_key).map_err(|e| CryptoError::InvalidKey {
        algorithm: ALGORITHM,
        reason: e.to_string(),
    })?;
    if signature.len() != 64 {
        return Err(CryptoError::MalformedSignature {
            algorithm: ALGORITHM,
            reason: format!("signature must be 64 bytes, got {}", signature.len()),
        });
    }
    // Right length but r or s out of range: a well-formed input that
    // cannot verify.
    let Ok(sig) = Signature::from_slice(signature) else {
        return Ok(false);
    };
    Ok(vk.verify(data.as_bytes(), &sig).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(v: serde_json::Value) -> CanonicalBytes {
        CanonicalBytes::new(&v).unwrap()
    }

    #[test]
    fn sign_and_verify() {
        let kp = Secp256k1KeyPair::generate();
        let pk = kp.public_key();
        assert_eq!(pk.len(), 33);
        assert!(pk[0] == 0x02 || pk[0] == 0x03);

        let data = canonical(serde_json::json!({"issuer": "did:example:org1"}));
        let sig = kp.sign(&data);
        assert_eq!(sig.len(), 64);
        assert!(verify(&pk, &data, &sig).unwrap());
    }

    #[test]
    fn signatures_are_low_s() {
        let kp = Secp256k1KeyPair::from_secret_bytes(&[9u8; 32]).unwrap();
        let data = canonical(serde_json::json!({"n": 1}));
        let sig = Signature::from_slice(&kp.sign(&data)).unwrap();
        assert!(sig.normalize_s().is_none());
    }

    #[test]
    fn zero_secret_is_rejected() {
        assert!(matches!(
            Secp256k1KeyPair::from_secret_bytes(&[0u8; 32]),
            Err(CryptoError::InvalidKey { .. })
        ));
    }

    #[test]
    fn hex_secret_matches_bytes() {
        let a = Secp256k1KeyPair::from_secret_bytes(&[0x11; 32]).unwrap();
        let b = Secp256k1KeyPair::from_secret_hex(&"11".repeat(32)).unwrap();
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn garbage_public_key_is_key_error() {
        let data = canonical(serde_json::json!({}));
        assert!(matches!(
            verify(&[0x05; 33], &data, &[1u8; 64]),
            Err(CryptoError::InvalidKey { .. })
        ));
    }

    #[test]
    fn zero_signature_is_false_not_error() {
        let kp = Secp256k1KeyPair::generate();
        let data = canonical(serde_json::json!({}));
        assert!(!verify(&kp.public_key(), &data, &[0u8; 64]).unwrap());
    }

    #[test]
    fn debug_shows_only_public_prefix() {
        let kp = Secp256k1KeyPair::from_secret_bytes(&[0x22; 32]).unwrap();
        let dbg = format!("{kp:?}");
        assert!(dbg.starts_with("Secp256k1KeyPair(pub="));
        assert!(!dbg.contains(&"22".repeat(32)));
    }
}
