//! # Error Types — Structured Error Hierarchy
//!
//! `VerityError` is the umbrella the pipeline surfaces to its host. Its
//! variants are the error taxonomy shared by every crate; crate-local
//! errors convert into it and report their [`ErrorKind`].
//!
//! ## Policy
//!
//! - Bad input shape is a typed error, returned immediately.
//! - Expected negative outcomes (not found, revoked, signature invalid,
//!   proof invalid) are values owned by the crates that produce them and
//!   do not appear here, except where an API has no status to carry them.
//! - A registry pointer to a missing blob is `Internal`: it is a broken
//!   invariant, not a user error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for the provenance pipeline.
#[derive(Error, Debug)]
pub enum VerityError {
    /// Malformed DID, CID, digest, timestamp, or empty required field.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A DID or CID that an operation required is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// The DID has been permanently revoked.
    #[error("revoked: {0}")]
    Revoked(String),

    /// A registry update was not authorized by the DID's keys.
    #[error("unauthorized update: {0}")]
    UnauthorizedUpdate(String),

    /// Signing or verification infrastructure failed (unreadable key
    /// material, unsupported algorithm). Distinct from a signature that
    /// simply does not verify.
    #[error("signature error: {0}")]
    Signature(String),

    /// A Merkle proof is structurally invalid.
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    /// Stored content does not hash to its address.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// The byte-level storage engine failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A broken invariant between components.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VerityError {
    /// The taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Revoked(_) => ErrorKind::Revoked,
            Self::UnauthorizedUpdate(_) => ErrorKind::UnauthorizedUpdate,
            Self::Signature(_) => ErrorKind::Signature,
            Self::MalformedProof(_) => ErrorKind::MalformedProof,
            Self::Integrity(_) => ErrorKind::Integrity,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<CanonicalizationError> for VerityError {
    fn from(e: CanonicalizationError) -> Self {
        Self::Validation(ValidationError::Canonicalization(e))
    }
}

/// Coarse classification of a [`VerityError`], stable across crates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input.
    Validation,
    /// Missing DID or CID.
    NotFound,
    /// Revoked DID.
    Revoked,
    /// Unauthorized registry update.
    UnauthorizedUpdate,
    /// Signing infrastructure failure.
    Signature,
    /// Structurally invalid Merkle proof.
    MalformedProof,
    /// Content does not match its address.
    Integrity,
    /// Storage engine failure.
    Storage,
    /// Broken invariant.
    Internal,
}

/// Input that failed validation at construction time.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// DID string does not follow `did:<method>:[<namespace>:]<id>`.
    #[error("invalid DID {0:?}: expected did:<method>:<namespace>:<identifier>")]
    InvalidDid(String),

    /// DID method is syntactically fine but not a known method.
    #[error("unknown DID method {method:?} in {did:?}")]
    UnknownMethod {
        /// The full DID.
        did: String,
        /// The unrecognised method.
        method: String,
    },

    /// Content address is not `<algorithm>:<hex digest>`.
    #[error("invalid content address {0:?}: expected sha256:<64 hex chars>")]
    InvalidContentAddress(String),

    /// Timestamp is not RFC 3339 UTC.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Hex or multibase decoding failed.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// A required field was empty or missing.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A field was present but its value is not acceptable.
    #[error("invalid value for {field}: {reason}")]
    InvalidField {
        /// Field name.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Canonical serialization of the input failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

impl ValidationError {
    /// Shorthand for [`ValidationError::InvalidField`].
    pub fn field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations; use a string or integer: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_converts_with_kind() {
        let err: VerityError = ValidationError::InvalidDid("nope".into()).into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn canonicalization_is_a_validation_failure() {
        let err: VerityError = CanonicalizationError::FloatRejected(0.5).into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("0.5"));
    }

    #[test]
    fn every_message_names_its_bucket() {
        let cases = [
            (VerityError::NotFound("x".into()), "not found"),
            (VerityError::Revoked("x".into()), "revoked"),
            (VerityError::UnauthorizedUpdate("x".into()), "unauthorized"),
            (VerityError::Signature("x".into()), "signature"),
            (VerityError::MalformedProof("x".into()), "malformed proof"),
            (VerityError::Integrity("x".into()), "integrity"),
            (VerityError::Internal("x".into()), "internal"),
        ];
        for (err, needle) in cases {
            assert!(err.to_string().contains(needle), "{err}");
        }
    }
}
