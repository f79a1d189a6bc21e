//! # Content Store
//!
//! [`ContentStore`] turns JSON documents into content-addressed blobs on top
//! of any [`StorageBackend`], and is the default [`CasClient`].
//!
//! Storage layout, per document with address `sha256:<hex>`:
//!
//! - `sha256/<hex>.json`: the canonical bytes.
//! - `sha256/<hex>.content-type`: the content type given by the first
//!   writer. The content type is not part of the address; later writers of
//!   the same bytes do not change it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use subtle::ConstantTimeEq;
use verity_core::{sha256_bytes, CanonicalBytes, ContentAddress, Timestamp, ValidationError};

use crate::backend::{MemoryBackend, StorageBackend};
use crate::error::CasError;

/// Content type recorded when the caller gives none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/did+json";

const DEFAULT_SOURCE_NAME: &str = "ipfs";

/// Result of a `store` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreReceipt {
    /// Address of the canonical bytes.
    pub cid: ContentAddress,
    /// Length of the canonical bytes.
    pub size_bytes: u64,
    /// When this call completed.
    pub stored_at: Timestamp,
    /// The content type on record for this address.
    pub content_type: String,
    /// `false` when identical content was already present.
    pub newly_stored: bool,
}

/// Result of a `retrieve` call. A missing document is `exists: false`,
/// not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrieveResult {
    /// The requested address.
    pub cid: ContentAddress,
    /// The document, when present.
    pub document: Option<Value>,
    /// The content type on record, when present.
    pub content_type: Option<String>,
    /// When the lookup completed.
    pub retrieved_at: Timestamp,
    /// Whether the document was found.
    pub exists: bool,
}

impl RetrieveResult {
    fn missing(cid: ContentAddress) -> Self {
        Self {
            cid,
            document: None,
            content_type: None,
            retrieved_at: Timestamp::now(),
            exists: false,
        }
    }
}

/// The content-addressed storage interface the registry and resolver
/// depend on.
pub trait CasClient: Send + Sync {
    /// Canonicalize and store `document`. Idempotent: identical content
    /// returns the same address and writes nothing.
    fn store(&self, document: &Value, content_type: Option<&str>) -> Result<StoreReceipt, CasError>;

    /// Fetch the document at `cid`.
    fn retrieve(&self, cid: &ContentAddress) -> Result<RetrieveResult, CasError>;

    /// Whether a document exists at `cid`.
    fn contains(&self, cid: &ContentAddress) -> Result<bool, CasError>;

    /// Name recorded in resolution retrieval paths.
    fn source_name(&self) -> &str;
}

/// A content-addressed store over a byte backend.
///
/// Cheaply cloneable; clones share the backend.
#[derive(Clone)]
pub struct ContentStore {
    backend: Arc<dyn StorageBackend>,
    source_name: String,
}

impl ContentStore {
    /// Create a store over `backend`.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            source_name: DEFAULT_SOURCE_NAME.to_string(),
        }
    }

    /// A store over a fresh [`MemoryBackend`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Override the name reported in retrieval paths.
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    /// Remove a document. Content addressing never needs this for
    /// correctness; it exists for garbage collection by the host, which
    /// must ensure no registry record still points at `cid`.
    pub fn evict(&self, cid: &ContentAddress) -> Result<bool, CasError> {
        let removed = self.backend.delete(&object_key(cid))?;
        self.backend.delete(&content_type_key(cid))?;
        if removed {
            tracing::debug!(cid = %cid, "evicted document");
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore")
            .field("source_name", &self.source_name)
            .finish_non_exhaustive()
    }
}

impl CasClient for ContentStore {
    fn store(&self, document: &Value, content_type: Option<&str>) -> Result<StoreReceipt, CasError> {
        reject_empty(document)?;
        let content_type = validate_content_type(content_type.unwrap_or(DEFAULT_CONTENT_TYPE))?;
        let canonical = CanonicalBytes::new(document).map_err(ValidationError::from)?;
        let cid = ContentAddress::of(&canonical);

        let newly_stored = self
            .backend
            .put_if_absent(&object_key(&cid), canonical.as_bytes())?;
        // Sidecar first-writer-wins as well; a lost race keeps the winner's type.
        self.backend
            .put_if_absent(&content_type_key(&cid), content_type.as_bytes())?;
        let content_type = self
            .backend
            .get(&content_type_key(&cid))?
            .and_then(|b| String::from_utf8(b).ok())
            .unwrap_or(content_type);

        if newly_stored {
            tracing::debug!(cid = %cid, size = canonical.len(), "stored document");
        } else {
            tracing::debug!(cid = %cid, "document already present");
        }

        Ok(StoreReceipt {
            cid,
            size_bytes: canonical.len() as u64,
            stored_at: Timestamp::now(),
            content_type,
            newly_stored,
        })
    }

    fn retrieve(&self, cid: &ContentAddress) -> Result<RetrieveResult, CasError> {
        let Some(bytes) = self.backend.get(&object_key(cid))? else {
            tracing::debug!(cid = %cid, "document not found");
            return Ok(RetrieveResult::missing(cid.clone()));
        };

        let integrity = |reason: String| CasError::Integrity {
            cid: cid.to_string(),
            reason,
        };
        if !bool::from(sha256_bytes(&bytes).ct_eq(cid.digest())) {
            tracing::warn!(cid = %cid, "stored bytes do not match their address");
            return Err(integrity("digest of stored bytes differs".into()));
        }
        let document: Value = serde_json::from_slice(&bytes)
            .map_err(|e| integrity(format!("stored bytes are not JSON: {e}")))?;
        let content_type = self
            .backend
            .get(&content_type_key(cid))?
            .and_then(|b| String::from_utf8(b).ok());

        Ok(RetrieveResult {
            cid: cid.clone(),
            document: Some(document),
            content_type,
            retrieved_at: Timestamp::now(),
            exists: true,
        })
    }

    fn contains(&self, cid: &ContentAddress) -> Result<bool, CasError> {
        Ok(self.backend.contains(&object_key(cid))?)
    }

    fn source_name(&self) -> &str {
        &self.source_name
    }
}

fn object_key(cid: &ContentAddress) -> String {
    format!("{}/{}.json", cid.algorithm(), cid.to_hex())
}

fn content_type_key(cid: &ContentAddress) -> String {
    format!("{}/{}.content-type", cid.algorithm(), cid.to_hex())
}

fn reject_empty(document: &Value) -> Result<(), ValidationError> {
    let empty = match document {
        Value::Null => true,
        Value::Object(m) => m.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    };
    if empty {
        return Err(ValidationError::MissingField("document".into()));
    }
    Ok(())
}

fn validate_content_type(ct: &str) -> Result<String, ValidationError> {
    let ct = ct.trim();
    let well_formed = ct
        .split_once('/')
        .is_some_and(|(kind, sub)| !kind.is_empty() && !sub.is_empty())
        && !ct.chars().any(|c| c.is_whitespace() || c.is_control());
    if !well_formed {
        return Err(ValidationError::field(
            "content_type",
            format!("{ct:?} is not a media type"),
        ));
    }
    Ok(ct.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn store_then_retrieve() {
        let store = ContentStore::in_memory();
        let doc = json!({"id": "did:example:org1", "n": 1});
        let receipt = store.store(&doc, None).unwrap();
        assert!(receipt.newly_stored);
        assert_eq!(receipt.size_bytes, br#"{"id":"did:example:org1","n":1}"#.len() as u64);
        assert_eq!(receipt.content_type, DEFAULT_CONTENT_TYPE);

        let got = store.retrieve(&receipt.cid).unwrap();
        assert!(got.exists);
        assert_eq!(got.document, Some(doc));
        assert_eq!(got.content_type.as_deref(), Some(DEFAULT_CONTENT_TYPE));
    }

    #[test]
    fn identical_content_is_deduplicated() {
        let store = ContentStore::in_memory();
        let a = store.store(&json!({"b": 2, "a": 1}), None).unwrap();
        let b = store
            .store(&json!({"a": 1, "b": 2}), Some("application/json"))
            .unwrap();
        assert_eq!(a.cid, b.cid);
        assert!(!b.newly_stored);
        assert_eq!(b.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn missing_is_a_value_not_an_error() {
        let store = ContentStore::in_memory();
        let cid = ContentAddress::parse(&format!("sha256:{}", "00".repeat(32))).unwrap();
        let got = store.retrieve(&cid).unwrap();
        assert!(!got.exists);
        assert!(got.document.is_none());
        assert!(!store.contains(&cid).unwrap());
    }

    #[test]
    fn empty_documents_are_rejected() {
        let store = ContentStore::in_memory();
        for doc in [json!(null), json!({}), json!([]), json!("")] {
            assert!(matches!(store.store(&doc, None), Err(CasError::Validation(_))));
        }
    }

    #[test]
    fn floats_are_rejected() {
        let store = ContentStore::in_memory();
        let err = store.store(&json!({"score": 0.5}), None).unwrap_err();
        assert!(matches!(err, CasError::Validation(_)));
    }

    #[test]
    fn bad_content_type_is_rejected() {
        let store = ContentStore::in_memory();
        for ct in ["", "json", "application/", "text/ plain"] {
            assert!(store.store(&json!({"a": 1}), Some(ct)).is_err(), "{ct:?}");
        }
    }

    #[test]
    fn tampered_bytes_fail_integrity() {
        let backend = MemoryBackend::new();
        let store = ContentStore::new(Arc::new(backend.clone()));
        let receipt = store.store(&json!({"a": 1}), None).unwrap();
        backend.overwrite(&object_key(&receipt.cid), br#"{"a":2}"#.to_vec());
        let err = store.retrieve(&receipt.cid).unwrap_err();
        assert!(matches!(err, CasError::Integrity { .. }));
        assert_eq!(err.kind(), verity_core::ErrorKind::Integrity);
    }

    #[test]
    fn evict_removes_document() {
        let store = ContentStore::in_memory();
        let receipt = store.store(&json!({"a": 1}), None).unwrap();
        assert!(store.evict(&receipt.cid).unwrap());
        assert!(!store.retrieve(&receipt.cid).unwrap().exists);
        assert!(!store.evict(&receipt.cid).unwrap());
    }

    #[test]
    fn source_name_is_configurable() {
        assert_eq!(ContentStore::in_memory().source_name(), "ipfs");
        let mirror = ContentStore::in_memory().with_source_name("mirror");
        assert_eq!(mirror.source_name(), "mirror");
    }

    proptest! {
        #[test]
        fn roundtrip_preserves_document(
            entries in prop::collection::btree_map("[a-z]{1,8}", "[ -~]{0,16}", 1..8),
            n in any::<i64>(),
        ) {
            let store = ContentStore::in_memory();
            let mut doc = serde_json::to_value(&entries).unwrap();
            doc["n"] = json!(n);
            let first = store.store(&doc, None).unwrap();
            let second = store.store(&doc, None).unwrap();
            prop_assert_eq!(&first.cid, &second.cid);
            let got = store.retrieve(&first.cid).unwrap();
            prop_assert_eq!(got.document, Some(doc));
        }
    }
}
