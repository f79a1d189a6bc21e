//! # Claim Model
//!
//! A [`Claim`] binds an issuer DID to a statement about one piece of
//! content, identified by its hash. Claims are assembled by
//! [`ClaimBuilder`](crate::ClaimBuilder), signed once, and may then collect
//! Merkle anchors.
//!
//! ## Signable Payload
//!
//! Every serialized field except `proof` and `verification_url`, in
//! canonical (JCS) form. Anchors live inside `proof`, so anchoring a claim
//! never invalidates its signature.
//!
//! ## Immutability
//!
//! Fields are private. The only ways to derive a changed claim are
//! [`Claim::with_proof`] (once), [`Claim::with_anchor`] and
//! [`Claim::with_verification_url`], each of which returns a new value and
//! leaves the signable payload untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use verity_core::{sha256_bytes, CanonicalBytes, Did, DidUrl, Timestamp, ValidationError};
use verity_crypto::MerkleStep;

use crate::error::ClaimError;

/// Default JSON-LD context.
pub const DEFAULT_CONTEXT: &str = "https://verity.foundation/contexts/claim/v1";

/// Default claim types.
pub const DEFAULT_TYPES: [&str; 2] = ["VerifiableCredential", "VerityClaim"];

/// Anchor `type` for batch Merkle anchors.
pub const ANCHOR_TYPE: &str = "VerityBatchMerkleAnchor";

/// Kind of content a claim is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Still image.
    Image,
    /// Video.
    Video,
    /// Document (PDF, office formats, ...).
    Document,
    /// Audio recording.
    Audio,
    /// Plain or rich text.
    Text,
}

impl ContentType {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Document => "document",
            Self::Audio => "audio",
            Self::Text => "text",
        }
    }

    /// Parse a wire name, case-insensitively.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "document" => Ok(Self::Document),
            "audio" => Ok(Self::Audio),
            "text" => Ok(Self::Text),
            other => Err(ValidationError::field(
                "content_type",
                format!("unknown content type {other:?}"),
            )),
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who made the claim, and with which key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuer {
    /// Issuer DID.
    pub id: Did,
    /// Verification method the claim is signed with.
    pub signed_by: DidUrl,
}

/// Inclusion of a claim in a published Merkle batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleAnchor {
    /// Always [`ANCHOR_TYPE`].
    #[serde(rename = "type")]
    pub anchor_type: String,
    /// Batch identifier.
    pub batch_id: String,
    /// Sibling path from the claim's leaf to the batch root.
    pub merkle_proof: Vec<MerkleStep>,
    /// Position of the leaf in the batch.
    pub leaf_index: u64,
    /// The claim's leaf hash, lowercase hex.
    pub leaf_hash: String,
    /// Reference to the external publication of the root (transaction
    /// hash, log entry, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_receipt: Option<String>,
}

/// A detached signature over a claim's signable payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Signature suite, e.g. `Ed25519Signature2020`.
    #[serde(rename = "type")]
    pub proof_type: String,
    /// Signing time.
    pub created: Timestamp,
    /// Verification method whose key made the signature.
    pub verification_method: DidUrl,
    /// Signature, lowercase hex.
    pub signature_value: String,
    /// Batch anchors, in the order they were added.
    #[serde(default)]
    pub anchors: Vec<MerkleAnchor>,
}

/// A provenance claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    claim_id: String,
    #[serde(rename = "@context")]
    context: Vec<String>,
    #[serde(rename = "type")]
    types: Vec<String>,
    issuance_date: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiration_date: Option<Timestamp>,
    issuer: Issuer,
    credential_subject: Map<String, Value>,
    content_hash: String,
    content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    platform_hashes: Option<BTreeMap<String, BTreeMap<String, String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proof: Option<Proof>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    verification_url: Option<String>,
}

impl Claim {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        claim_id: String,
        context: Vec<String>,
        types: Vec<String>,
        issuance_date: Timestamp,
        expiration_date: Option<Timestamp>,
        issuer: Issuer,
        credential_subject: Map<String, Value>,
        content_hash: String,
        content_type: ContentType,
        platform_hashes: Option<BTreeMap<String, BTreeMap<String, String>>>,
    ) -> Self {
        Self {
            claim_id,
            context,
            types,
            issuance_date,
            expiration_date,
            issuer,
            credential_subject,
            content_hash,
            content_type,
            platform_hashes,
            proof: None,
            verification_url: None,
        }
    }

    /// Derived identifier.
    pub fn claim_id(&self) -> &str {
        &self.claim_id
    }

    /// JSON-LD contexts.
    pub fn context(&self) -> &[String] {
        &self.context
    }

    /// Claim types.
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Issuance time.
    pub fn issuance_date(&self) -> Timestamp {
        self.issuance_date
    }

    /// Expiry time, if any.
    pub fn expiration_date(&self) -> Option<Timestamp> {
        self.expiration_date
    }

    /// Whether the claim has expired as of `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expiration_date.is_some_and(|exp| exp <= now)
    }

    /// Issuer and signing key.
    pub fn issuer(&self) -> &Issuer {
        &self.issuer
    }

    /// Statement about the content.
    pub fn credential_subject(&self) -> &Map<String, Value> {
        &self.credential_subject
    }

    /// Algorithm-tagged content digest.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Kind of content.
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Per-platform perceptual hashes.
    pub fn platform_hashes(&self) -> Option<&BTreeMap<String, BTreeMap<String, String>>> {
        self.platform_hashes.as_ref()
    }

    /// The signature, once attached.
    pub fn proof(&self) -> Option<&Proof> {
        self.proof.as_ref()
    }

    /// Whether a proof is attached.
    pub fn is_signed(&self) -> bool {
        self.proof.is_some()
    }

    /// Public verification link, if set.
    pub fn verification_url(&self) -> Option<&str> {
        self.verification_url.as_deref()
    }

    /// Canonical bytes covered by the signature.
    pub fn signing_input(&self) -> Result<CanonicalBytes, ClaimError> {
        let mut value = serde_json::to_value(self)
            .map_err(|e| ValidationError::field("claim", e.to_string()))?;
        if let Some(obj) = value.as_object_mut() {
            obj.remove("proof");
            obj.remove("verification_url");
        }
        Ok(CanonicalBytes::from_value(value).map_err(ValidationError::from)?)
    }

    /// Leaf committed into anchoring batches: SHA-256 of the signing input.
    pub fn anchor_leaf(&self) -> Result<[u8; 32], ClaimError> {
        Ok(sha256_bytes(self.signing_input()?.as_bytes()))
    }

    /// Attach a proof.
    ///
    /// # Errors
    ///
    /// [`ClaimError::AlreadySigned`] if a proof is already attached.
    pub fn with_proof(mut self, proof: Proof) -> Result<Self, ClaimError> {
        if self.proof.is_some() {
            return Err(ClaimError::AlreadySigned(self.claim_id));
        }
        self.proof = Some(proof);
        Ok(self)
    }

    /// A copy with `anchor` appended to the proof's anchors.
    ///
    /// # Errors
    ///
    /// [`ClaimError::NotSigned`] if there is no proof to hold the anchor.
    pub fn with_anchor(&self, anchor: MerkleAnchor) -> Result<Self, ClaimError> {
        let mut next = self.clone();
        let proof = next
            .proof
            .as_mut()
            .ok_or_else(|| ClaimError::NotSigned(self.claim_id.clone()))?;
        proof.anchors.push(anchor);
        Ok(next)
    }

    /// A copy whose verification URL is `{base}/{claim_id}`.
    pub fn with_verification_url(mut self, base: &str) -> Self {
        self.verification_url = Some(format!("{}/{}", base.trim_end_matches('/'), self.claim_id));
        self
    }

    /// Parse a stored claim.
    pub fn from_value(value: Value) -> Result<Self, ClaimError> {
        Ok(serde_json::from_value(value).map_err(|e| ValidationError::field("claim", e.to_string()))?)
    }

    /// The JSON form stored in the CAS.
    pub fn to_value(&self) -> Result<Value, ClaimError> {
        Ok(serde_json::to_value(self).map_err(|e| ValidationError::field("claim", e.to_string()))?)
    }
}

/// Validate an algorithm-tagged digest: `<alg>:<hex>`, lowercase
/// alphanumeric algorithm, non-empty hex digest.
pub fn validate_content_hash(s: &str) -> Result<String, ValidationError> {
    let invalid = |reason: &str| ValidationError::field("content_hash", format!("{s:?}: {reason}"));
    let (alg, digest) = s
        .trim()
        .split_once(':')
        .ok_or_else(|| invalid("expected <algorithm>:<hex digest>"))?;
    if alg.is_empty() || !alg.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()) {
        return Err(invalid("algorithm must be lowercase alphanumeric"));
    }
    if digest.is_empty() || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid("digest must be non-empty hex"));
    }
    Ok(format!("{alg}:{}", digest.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_shapes() {
        assert_eq!(validate_content_hash("sha256:DEADBEEF").unwrap(), "sha256:deadbeef");
        assert!(validate_content_hash("sha256:").is_err());
        assert!(validate_content_hash("deadbeef").is_err());
        assert!(validate_content_hash("SHA256:ab").is_err());
        assert!(validate_content_hash("sha256:xyz").is_err());
    }

    #[test]
    fn content_type_names() {
        for ct in [
            ContentType::Image,
            ContentType::Video,
            ContentType::Document,
            ContentType::Audio,
            ContentType::Text,
        ] {
            assert_eq!(ContentType::parse(ct.as_str()).unwrap(), ct);
            assert_eq!(serde_json::to_value(ct).unwrap(), ct.as_str());
        }
        assert!(ContentType::parse("hologram").is_err());
    }
}
