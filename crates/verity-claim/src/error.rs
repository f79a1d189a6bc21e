//! # Claim Error Types

use thiserror::Error;
use verity_core::{ErrorKind, ValidationError, VerityError};
use verity_crypto::{AnchorError, CryptoError};

/// Errors from building, signing and anchoring claims.
///
/// A claim that fails verification is not an error; see
/// [`ClaimVerification`](crate::ClaimVerification).
#[derive(Error, Debug)]
pub enum ClaimError {
    /// A claim field is malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The claim id cannot be derived without an issuance date.
    #[error("issuance_date must be set before the claim id can be derived")]
    MissingIssuanceDate,

    /// A proof is already attached; build a new claim instead.
    #[error("claim {0} is already signed")]
    AlreadySigned(String),

    /// The operation needs a signed claim.
    #[error("claim {0} is not signed")]
    NotSigned(String),

    /// Key material could not be used.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Anchor proof or tree input is malformed.
    #[error(transparent)]
    Anchor(#[from] AnchorError),
}

impl ClaimError {
    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_)
            | Self::MissingIssuanceDate
            | Self::AlreadySigned(_)
            | Self::NotSigned(_) => ErrorKind::Validation,
            Self::Crypto(_) => ErrorKind::Signature,
            Self::Anchor(AnchorError::MalformedProof(_)) => ErrorKind::MalformedProof,
            Self::Anchor(_) => ErrorKind::Validation,
        }
    }
}

impl From<ClaimError> for VerityError {
    fn from(e: ClaimError) -> Self {
        match e {
            ClaimError::Validation(v) => VerityError::Validation(v),
            ClaimError::Crypto(c) => c.into(),
            ClaimError::Anchor(a) => a.into(),
            other => VerityError::Validation(ValidationError::field("claim", other.to_string())),
        }
    }
}
