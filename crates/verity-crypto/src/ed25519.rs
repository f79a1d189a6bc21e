//! # Ed25519 Signing and Verification
//!
//! ## Security Invariants
//!
//! - Signing input is `&CanonicalBytes`. You cannot sign raw bytes.
//! - `Ed25519KeyPair` does not implement `Serialize`, and its `Debug`
//!   output never contains key material.
//! - Verification uses `verify_strict`, rejecting small-order keys and
//!   non-canonical signatures.

use ed25519_dalek::Signer;
use verity_core::encoding::from_hex_array;
use verity_core::CanonicalBytes;

use crate::error::CryptoError;
use crate::keys::{KeyAlgorithm, SigningKeyPair};

const ALGORITHM: &str = "Ed25519";

/// An Ed25519 key pair.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

impl Ed25519KeyPair {
    /// Generate a new random key pair from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Derive a key pair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Derive a key pair from a 64-character hex seed.
    pub fn from_seed_hex(hex: &str) -> Result<Self, CryptoError> {
        let seed = from_hex_array::<32>(hex).map_err(|e| CryptoError::InvalidKey {
            algorithm: ALGORITHM,
            reason: e.to_string(),
        })?;
        Ok(Self::from_seed(&seed))
    }

    /// The raw 32-byte public key.
    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }
}

impl SigningKeyPair for Ed25519KeyPair {
    fn algorithm(&self) -> KeyAlgorithm {
        KeyAlgorithm::Ed25519
    }

    fn public_key_bytes(&self) -> Vec<u8> {
        self.public_key().to_vec()
    }

    fn sign(&self, data: &CanonicalBytes) -> Vec<u8> {
        self.signing_key.sign(data.as_bytes()).to_bytes().to_vec()
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519KeyPair(<private>)")
    }
}

/// Verify an Ed25519 signature. See [`crate::verify_signature`].
pub(crate) fn verify(
    public_key: &[u8],
    data: &CanonicalBytes,
    signature: &[u8],
) -> Result<bool, CryptoError> {
    let pk: [u8; 32] = public_key.try_into().map_err(|_| CryptoError::InvalidKey {
        algorithm: ALGORITHM,
        reason: format!("public key must be 32 bytes, got {}", public_key.len()),
    })?;
    let vk = ed25519_dalek::VerifyingKey::from_bytes(&pk).map_err(|e| CryptoError::InvalidKey {
        algorithm: ALGORITHM,
        reason: e.to_string(),
    })?;
    let sig: [u8; 64] = signature
        .try_into()
        .map_err(|_| CryptoError::MalformedSignature {
            algorithm: ALGORITHM,
            reason: format!("signature must be 64 bytes, got {}", signature.len()),
        })?;
    let sig = ed25519_dalek::Signature::from_bytes(&sig);
    Ok(vk.verify_strict(data.as_bytes(), &sig).is_ok())
}
