//! # Cryptographic Error Types

use thiserror::Error;
use verity_core::{ValidationError, VerityError};

/// Infrastructure failures in signing and verification.
///
/// A signature that simply does not verify is not an error: verification
/// functions return `Ok(false)` for it.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key bytes could not be parsed for the algorithm.
    #[error("invalid {algorithm} key material: {reason}")]
    InvalidKey {
        /// Algorithm the key was parsed for.
        algorithm: &'static str,
        /// Parser diagnostic.
        reason: String,
    },

    /// Signature bytes have the wrong shape for the algorithm.
    #[error("malformed {algorithm} signature: {reason}")]
    MalformedSignature {
        /// Algorithm the signature was parsed for.
        algorithm: &'static str,
        /// Parser diagnostic.
        reason: String,
    },

    /// The verification method or proof type names no supported algorithm.
    #[error("unsupported key type: {0}")]
    UnsupportedAlgorithm(String),

    /// Hex or multibase input was not decodable.
    #[error(transparent)]
    Encoding(#[from] ValidationError),
}

impl From<CryptoError> for VerityError {
    fn from(e: CryptoError) -> Self {
        VerityError::Signature(e.to_string())
    }
}

/// Structural problems with a Merkle proof or tree input.
///
/// Distinct from a proof that is well-formed but does not lead to the
/// expected root, which is a plain `false`.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AnchorError {
    /// A step or hash in the proof is not well-formed.
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    /// A tree cannot be built from zero leaves.
    #[error("cannot build a Merkle tree with no leaves")]
    EmptyTree,

    /// Requested a proof for a leaf the tree does not have.
    #[error("leaf index {index} out of range for {size} leaves")]
    LeafOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of leaves.
        size: usize,
    },
}

impl From<AnchorError> for VerityError {
    fn from(e: AnchorError) -> Self {
        match e {
            AnchorError::MalformedProof(msg) => VerityError::MalformedProof(msg),
            other => VerityError::Validation(ValidationError::field("merkle", other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verity_core::ErrorKind;

    #[test]
    fn crypto_errors_are_signature_kind() {
        let err: VerityError = CryptoError::UnsupportedAlgorithm("rsa".into()).into();
        assert_eq!(err.kind(), ErrorKind::Signature);
        assert!(err.to_string().contains("rsa"));
    }

    #[test]
    fn malformed_proof_keeps_its_kind() {
        let err: VerityError = AnchorError::MalformedProof("bad tag".into()).into();
        assert_eq!(err.kind(), ErrorKind::MalformedProof);
        let err: VerityError = AnchorError::EmptyTree.into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
