//! # Registry Error Types

use thiserror::Error;
use verity_cas::CasError;
use verity_core::{ErrorKind, ValidationError, VerityError};

/// Errors from DID registry writes.
///
/// Lookups report "not found" and "revoked" as statuses; these variants
/// only arise where an operation cannot proceed.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The DID is revoked; no further registrations are accepted.
    #[error("DID {0} is revoked")]
    AlreadyRevoked(String),

    /// A signature was supplied (or required) and no authentication key
    /// of the DID verifies it.
    #[error("unauthorized update of {did}: {reason}")]
    UnauthorizedUpdate {
        /// The DID whose record was protected.
        did: String,
        /// Why the update was refused.
        reason: String,
    },

    /// The DID or the target document does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The registry and the store disagree about a document the registry
    /// already points at.
    #[error("registry inconsistency: {0}")]
    Inconsistent(String),

    /// Malformed input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store failed while loading a document.
    #[error(transparent)]
    Cas(#[from] CasError),
}

impl RegistryError {
    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyRevoked(_) => ErrorKind::Revoked,
            Self::UnauthorizedUpdate { .. } => ErrorKind::UnauthorizedUpdate,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Inconsistent(_) => ErrorKind::Internal,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Cas(e) => e.kind(),
        }
    }
}

impl From<RegistryError> for VerityError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::AlreadyRevoked(_) => VerityError::Revoked(e.to_string()),
            RegistryError::UnauthorizedUpdate { .. } => VerityError::UnauthorizedUpdate(e.to_string()),
            RegistryError::NotFound(msg) => VerityError::NotFound(msg),
            RegistryError::Inconsistent(msg) => VerityError::Internal(msg),
            RegistryError::Validation(v) => VerityError::Validation(v),
            RegistryError::Cas(c) => c.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_onto_the_taxonomy() {
        let cases = [
            (RegistryError::AlreadyRevoked("did:example:a".into()), ErrorKind::Revoked),
            (
                RegistryError::UnauthorizedUpdate {
                    did: "did:example:a".into(),
                    reason: "bad signature".into(),
                },
                ErrorKind::UnauthorizedUpdate,
            ),
            (RegistryError::NotFound("x".into()), ErrorKind::NotFound),
            (RegistryError::Inconsistent("x".into()), ErrorKind::Internal),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind);
            assert_eq!(VerityError::from(err).kind(), kind);
        }
    }
}
