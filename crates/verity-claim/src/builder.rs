//! # Claim Builder
//!
//! Pure data assembly: no storage, no network. Given the same inputs and an
//! explicit issuance date, [`ClaimBuilder::build`] always produces the same
//! claim. Without an issuance date it captures the current time.
//!
//! ## Claim Identifier
//!
//! ```text
//! claim_id = prefix || hex(SHA256(issuer_did || content_hash || issuance_date))[..hex_len]
//! ```
//!
//! with `issuance_date` rendered `YYYY-MM-DDTHH:MM:SSZ`. Defaults: prefix
//! `claim_`, 16 hex characters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use verity_core::encoding::to_hex;
use verity_core::{sha256_bytes, Did, DidUrl, Timestamp, ValidationError};

use crate::claim::{validate_content_hash, Claim, ContentType, Issuer, DEFAULT_CONTEXT, DEFAULT_TYPES};
use crate::error::ClaimError;

/// How claim identifiers are rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawClaimIdScheme")]
pub struct ClaimIdScheme {
    prefix: String,
    hex_len: usize,
}

#[derive(Deserialize)]
struct RawClaimIdScheme {
    prefix: String,
    hex_len: usize,
}

impl TryFrom<RawClaimIdScheme> for ClaimIdScheme {
    type Error = ValidationError;

    fn try_from(raw: RawClaimIdScheme) -> Result<Self, Self::Error> {
        Self::new(raw.prefix, raw.hex_len)
    }
}

impl ClaimIdScheme {
    /// Default prefix.
    pub const DEFAULT_PREFIX: &'static str = "claim_";
    /// Default number of hex characters.
    pub const DEFAULT_HEX_LEN: usize = 16;

    /// A scheme with `prefix` and `hex_len` hex characters (8 to 64).
    pub fn new(prefix: impl Into<String>, hex_len: usize) -> Result<Self, ValidationError> {
        if !(8..=64).contains(&hex_len) {
            return Err(ValidationError::field(
                "id_hex_len",
                format!("{hex_len} is outside 8..=64"),
            ));
        }
        Ok(Self {
            prefix: prefix.into(),
            hex_len,
        })
    }

    /// Derive the identifier for these inputs.
    pub fn derive(&self, issuer: &Did, content_hash: &str, issuance_date: &Timestamp) -> String {
        let input = format!("{issuer}{content_hash}{}", issuance_date.to_iso8601());
        let hex = to_hex(&sha256_bytes(input.as_bytes()));
        format!("{}{}", self.prefix, &hex[..self.hex_len])
    }
}

impl Default for ClaimIdScheme {
    fn default() -> Self {
        Self {
            prefix: Self::DEFAULT_PREFIX.to_string(),
            hex_len: Self::DEFAULT_HEX_LEN,
        }
    }
}

/// Derive a claim id with the default scheme.
pub fn derive_claim_id(issuer: &Did, content_hash: &str, issuance_date: &Timestamp) -> String {
    ClaimIdScheme::default().derive(issuer, content_hash, issuance_date)
}

/// Assembles unsigned claims.
#[derive(Debug, Clone)]
pub struct ClaimBuilder {
    issuer_did: String,
    signed_by: String,
    content_hash: String,
    content_type: ContentType,
    credential_subject: Value,
    issuance_date: Option<Timestamp>,
    expiration_date: Option<Timestamp>,
    platform_hashes: BTreeMap<String, BTreeMap<String, String>>,
    context: Vec<String>,
    types: Vec<String>,
    scheme: ClaimIdScheme,
}

impl ClaimBuilder {
    /// Start a claim. `signed_by` may be absolute (`did:...#key-1`) or
    /// relative to the issuer (`#key-1`). Inputs are validated by
    /// [`build`](Self::build).
    pub fn new(
        issuer_did: impl Into<String>,
        signed_by: impl Into<String>,
        content_hash: impl Into<String>,
        content_type: ContentType,
        credential_subject: Value,
    ) -> Self {
        Self {
            issuer_did: issuer_did.into(),
            signed_by: signed_by.into(),
            content_hash: content_hash.into(),
            content_type,
            credential_subject,
            issuance_date: None,
            expiration_date: None,
            platform_hashes: BTreeMap::new(),
            context: vec![DEFAULT_CONTEXT.to_string()],
            types: DEFAULT_TYPES.iter().map(|t| t.to_string()).collect(),
            scheme: ClaimIdScheme::default(),
        }
    }

    /// Fix the issuance date.
    pub fn issued_at(mut self, at: Timestamp) -> Self {
        self.issuance_date = Some(at);
        self
    }

    /// Set an expiry.
    pub fn expires_at(mut self, at: Timestamp) -> Self {
        self.expiration_date = Some(at);
        self
    }

    /// Record a perceptual hash computed for one platform.
    pub fn with_platform_hash(
        mut self,
        platform: impl Into<String>,
        algorithm: impl Into<String>,
        hash: impl Into<String>,
    ) -> Self {
        self.platform_hashes
            .entry(platform.into())
            .or_default()
            .insert(algorithm.into(), hash.into());
        self
    }

    /// Replace the JSON-LD contexts.
    pub fn with_context(mut self, context: Vec<String>) -> Self {
        self.context = context;
        self
    }

    /// Replace the claim types.
    pub fn with_types(mut self, types: Vec<String>) -> Self {
        self.types = types;
        self
    }

    /// Use a non-default id scheme.
    pub fn with_id_scheme(mut self, scheme: ClaimIdScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// The id the claim will get.
    ///
    /// # Errors
    ///
    /// [`ClaimError::MissingIssuanceDate`] until [`issued_at`](Self::issued_at)
    /// has been called; validation errors for a malformed issuer or hash.
    pub fn claim_id(&self) -> Result<String, ClaimError> {
        let issuance_date = self.issuance_date.ok_or(ClaimError::MissingIssuanceDate)?;
        let issuer = Did::new(self.issuer_did.trim())?;
        let content_hash = validate_content_hash(&self.content_hash)?;
        Ok(self.scheme.derive(&issuer, &content_hash, &issuance_date))
    }

    /// Validate the inputs and produce an unsigned claim. The issuance
    /// date defaults to now.
    pub fn build(mut self) -> Result<Claim, ClaimError> {
        let issuance_date = *self.issuance_date.get_or_insert_with(Timestamp::now);
        let claim_id = self.claim_id()?;

        let issuer_id = Did::new(self.issuer_did.trim())?;
        if self.signed_by.trim().is_empty() {
            return Err(ValidationError::MissingField("signed_by".into()).into());
        }
        let signed_by = DidUrl::resolve_against(&issuer_id, self.signed_by.trim())?;
        if signed_by.did() != &issuer_id {
            return Err(ValidationError::field(
                "signed_by",
                format!("{signed_by} is not a key of {issuer_id}"),
            )
            .into());
        }

        let credential_subject = match self.credential_subject {
            Value::Object(map) => map,
            other => {
                return Err(ValidationError::field(
                    "credential_subject",
                    format!("must be a JSON object, got {other}"),
                )
                .into())
            }
        };

        if let Some(exp) = self.expiration_date {
            if exp <= issuance_date {
                return Err(ValidationError::field(
                    "expiration_date",
                    "must be after issuance_date",
                )
                .into());
            }
        }
        if self.context.is_empty() {
            return Err(ValidationError::MissingField("@context".into()).into());
        }
        if self.types.is_empty() {
            return Err(ValidationError::MissingField("type".into()).into());
        }

        let platform_hashes = (!self.platform_hashes.is_empty()).then_some(self.platform_hashes);
        Ok(Claim::assemble(
            claim_id,
            self.context,
            self.types,
            issuance_date,
            self.expiration_date,
            Issuer {
                id: issuer_id,
                signed_by,
            },
            credential_subject,
            validate_content_hash(&self.content_hash)?,
            self.content_type,
            platform_hashes,
        ))
    }
}
