//! # Storage Error Types

use thiserror::Error;
use verity_core::{ErrorKind, ValidationError, VerityError};

/// Failures of the byte-level storage engine.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying I/O failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key cannot be mapped onto the backend's namespace.
    #[error("invalid storage key {key:?}: {reason}")]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors from the content-addressed store.
#[derive(Error, Debug)]
pub enum CasError {
    /// Bad input: empty document, invalid content type, unaddressable value.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Stored bytes no longer hash to their address, or are not JSON.
    #[error("integrity check failed for {cid}: {reason}")]
    Integrity {
        /// The requested address.
        cid: String,
        /// What did not match.
        reason: String,
    },

    /// The backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CasError {
    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<CasError> for VerityError {
    fn from(e: CasError) -> Self {
        match e {
            CasError::Validation(v) => VerityError::Validation(v),
            CasError::Integrity { .. } => VerityError::Integrity(e.to_string()),
            CasError::Storage(s) => VerityError::Storage(s.to_string()),
        }
    }
}
