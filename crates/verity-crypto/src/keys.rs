//! # Signing Key Capability
//!
//! The pipeline signs claims and registry updates through
//! [`SigningKeyPair`] and verifies through [`verify_signature`]. Neither
//! names a concrete scheme: the algorithm travels with the key, and on the
//! verifying side it is recovered from the verification method's `type`.
//!
//! | Algorithm   | Verification method type             | Proof type                     | Public key      | Signature      |
//! |-------------|--------------------------------------|--------------------------------|-----------------|----------------|
//! | `Ed25519`   | `Ed25519VerificationKey2020`         | `Ed25519Signature2020`         | 32 bytes        | 64 bytes       |
//! | `Secp256k1` | `EcdsaSecp256k1VerificationKey2019`  | `EcdsaSecp256k1Signature2019`  | 33 bytes, SEC1 compressed | 64 bytes, `r‖s`, low-S |

use serde::{Deserialize, Serialize};
use verity_core::encoding::to_multibase;
use verity_core::CanonicalBytes;

use crate::error::CryptoError;
use crate::{ed25519, secp256k1};

/// Signature schemes the pipeline can sign and verify with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    /// Ed25519 (RFC 8032).
    Ed25519,
    /// ECDSA over secp256k1 with SHA-256.
    Secp256k1,
}

impl KeyAlgorithm {
    /// Short algorithm name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ed25519 => "ed25519",
            Self::Secp256k1 => "secp256k1",
        }
    }

    /// The DID document verification-method `type` for keys of this algorithm.
    pub fn verification_method_type(&self) -> &'static str {
        match self {
            Self::Ed25519 => "Ed25519VerificationKey2020",
            Self::Secp256k1 => "EcdsaSecp256k1VerificationKey2019",
        }
    }

    /// The claim proof `type` for signatures of this algorithm.
    pub fn proof_type(&self) -> &'static str {
        match self {
            Self::Ed25519 => "Ed25519Signature2020",
            Self::Secp256k1 => "EcdsaSecp256k1Signature2019",
        }
    }

    /// Recover the algorithm from a verification-method `type`.
    pub fn from_verification_method_type(s: &str) -> Result<Self, CryptoError> {
        [Self::Ed25519, Self::Secp256k1]
            .into_iter()
            .find(|a| a.verification_method_type() == s)
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm(s.to_string()))
    }

    /// Recover the algorithm from a proof `type`.
    pub fn from_proof_type(s: &str) -> Result<Self, CryptoError> {
        [Self::Ed25519, Self::Secp256k1]
            .into_iter()
            .find(|a| a.proof_type() == s)
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm(s.to_string()))
    }

    /// Parse a short name (`ed25519`, `secp256k1`), case-insensitively.
    pub fn parse(s: &str) -> Result<Self, CryptoError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ed25519" => Ok(Self::Ed25519),
            "secp256k1" | "es256k" => Ok(Self::Secp256k1),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl std::fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A private key able to sign canonical bytes.
///
/// Implementations must be `Send + Sync` so that one key can be shared by
/// concurrent signing tasks behind an `Arc`. The trait is object-safe, so
/// callers hold `&dyn SigningKeyPair` and never name the scheme.
pub trait SigningKeyPair: Send + Sync + std::fmt::Debug {
    /// Which scheme this key signs with.
    fn algorithm(&self) -> KeyAlgorithm;

    /// The encoded public key (see the table in the module docs).
    fn public_key_bytes(&self) -> Vec<u8>;

    /// Sign canonical bytes, returning the encoded signature.
    fn sign(&self, data: &CanonicalBytes) -> Vec<u8>;

    /// The public key as multibase base16, the form stored in DID documents.
    fn public_key_multibase(&self) -> String {
        to_multibase(&self.public_key_bytes())
    }
}

/// Verify `signature` over `data` with an encoded public key.
///
/// Returns `Ok(false)` for a well-formed signature that does not verify.
///
/// # Errors
///
/// [`CryptoError::InvalidKey`] if the public key cannot be decoded, and
/// [`CryptoError::MalformedSignature`] if the signature has the wrong length.
pub fn verify_signature(
    algorithm: KeyAlgorithm,
    public_key: &[u8],
    data: &CanonicalBytes,
    signature: &[u8],
) -> Result<bool, CryptoError> {
    match algorithm {
        KeyAlgorithm::Ed25519 => ed25519::verify(public_key, data, signature),
        KeyAlgorithm::Secp256k1 => secp256k1::verify(public_key, data, signature),
    }
}
