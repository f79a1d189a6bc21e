//! # DID Registry
//!
//! Maps each DID to the content address of its current DID document, with
//! an append-only version history and a terminal revocation flag.
//!
//! ## States
//!
//! ```text
//! Unregistered ──register──▶ Active ──register(new cid)──▶ Active
//!                              │
//!                              └──revoke──▶ Revoked (terminal)
//! ```
//!
//! ## Write Rules
//!
//! - The target document must already be in the CAS and must describe the
//!   DID being registered, so a record never points at a missing blob.
//! - A supplied signature must verify, over
//!   `{"did": <did>, "doc_cid": <cid>}` in canonical form, against an
//!   `authentication` key: of the *current* document for an active DID,
//!   of the *submitted* document on first registration.
//! - Registering the current address again changes nothing.
//!
//! ## Concurrency
//!
//! Each DID has its own mutex. The map shard guard is released before that
//! mutex is taken, so a slow document load for one DID never holds up
//! another.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use verity_cas::CasClient;
use verity_core::encoding::{from_hex, to_hex};
use verity_core::{CanonicalBytes, ContentAddress, Did, Timestamp, ValidationError};
use verity_crypto::SigningKeyPair;

use crate::document::DidDocument;
use crate::error::RegistryError;

/// Name recorded in retrieval paths and proof chains.
pub const REGISTRY_SOURCE: &str = "registry";

// ─── Lifecycle ───────────────────────────────────────────────────────

/// Lifecycle state of a DID in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryState {
    /// Never registered.
    Unregistered,
    /// Registered and resolvable.
    Active,
    /// Permanently revoked (terminal).
    Revoked,
}

impl RegistryState {
    /// Whether no transition leaves this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Revoked)
    }
}

/// One entry of a record's version history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// Document address that became current.
    pub cid: ContentAddress,
    /// When it became current.
    pub timestamp: Timestamp,
}

/// The registry's record for one DID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    /// The DID.
    pub did: Did,
    /// Address of the current document.
    pub current_cid: ContentAddress,
    /// Whether the DID has been revoked.
    pub revoked: bool,
    /// Every address that has been current, oldest first.
    pub version_history: Vec<VersionEntry>,
    /// Time of the last register or revoke.
    pub last_updated: Timestamp,
    /// Time of revocation, if revoked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<Timestamp>,
}

impl RegistryRecord {
    fn new(did: Did, cid: ContentAddress, now: Timestamp) -> Self {
        Self {
            did,
            version_history: vec![VersionEntry {
                cid: cid.clone(),
                timestamp: now,
            }],
            current_cid: cid,
            revoked: false,
            last_updated: now,
            revoked_at: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RegistryState {
        if self.revoked {
            RegistryState::Revoked
        } else {
            RegistryState::Active
        }
    }
}

// ─── Lookup ──────────────────────────────────────────────────────────

/// Outcome of a registry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStatus {
    /// Active with a current document.
    Found,
    /// Never registered.
    NotFound,
    /// Revoked; `doc_cid` is the last known address, for audit only.
    Revoked,
}

impl LookupStatus {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::NotFound => "not_found",
            Self::Revoked => "revoked",
        }
    }
}

impl std::fmt::Display for LookupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry answer for one DID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryLookup {
    /// The DID looked up.
    pub did: Did,
    /// Current (or, when revoked, last) document address.
    pub doc_cid: Option<ContentAddress>,
    /// Lookup outcome.
    pub status: LookupStatus,
    /// Time of the last register or revoke.
    pub last_updated: Option<Timestamp>,
}

impl RegistryLookup {
    fn from_record(did: &Did, record: Option<&RegistryRecord>) -> Self {
        match record {
            None => Self {
                did: did.clone(),
                doc_cid: None,
                status: LookupStatus::NotFound,
                last_updated: None,
            },
            Some(r) => Self {
                did: did.clone(),
                doc_cid: Some(r.current_cid.clone()),
                status: if r.revoked {
                    LookupStatus::Revoked
                } else {
                    LookupStatus::Found
                },
                last_updated: Some(r.last_updated),
            },
        }
    }
}

// ─── Client interface ────────────────────────────────────────────────

/// The registry interface the resolver and the pipeline depend on.
pub trait RegistryClient: Send + Sync {
    /// Point `did` at `cid`. `signature` is lowercase hex over
    /// [`registration_payload`].
    fn register(
        &self,
        did: &Did,
        cid: &ContentAddress,
        signature: Option<&str>,
    ) -> Result<RegistryRecord, RegistryError>;

    /// Current pointer and status for `did`.
    fn resolve(&self, did: &Did) -> Result<RegistryLookup, RegistryError>;

    /// Revoke `did`. Idempotent once revoked.
    fn revoke(&self, did: &Did) -> Result<RegistryRecord, RegistryError>;

    /// Full record, including version history.
    fn record(&self, did: &Did) -> Result<Option<RegistryRecord>, RegistryError>;

    /// Name recorded in retrieval paths.
    fn source_name(&self) -> &str {
        REGISTRY_SOURCE
    }
}

/// The bytes a registration signature covers.
pub fn registration_payload(did: &Did, cid: &ContentAddress) -> Result<CanonicalBytes, ValidationError> {
    Ok(CanonicalBytes::new(&json!({
        "did": did,
        "doc_cid": cid,
    }))?)
}

/// Sign a registration of `did` → `cid`, returning lowercase hex.
pub fn sign_registration(
    did: &Did,
    cid: &ContentAddress,
    key: &dyn SigningKeyPair,
) -> Result<String, ValidationError> {
    Ok(to_hex(&key.sign(&registration_payload(did, cid)?)))
}

// ─── In-process registry ─────────────────────────────────────────────

type Slot = Arc<Mutex<Option<RegistryRecord>>>;

/// The in-process DID registry.
pub struct DidRegistry {
    records: DashMap<Did, Slot>,
    store: Arc<dyn CasClient>,
    require_signatures: bool,
}

impl DidRegistry {
    /// A registry that checks target documents against `store`.
    pub fn new(store: Arc<dyn CasClient>) -> Self {
        Self {
            records: DashMap::new(),
            store,
            require_signatures: false,
        }
    }

    /// Refuse unsigned registrations when `required` is set.
    pub fn with_required_signatures(mut self, required: bool) -> Self {
        self.require_signatures = required;
        self
    }

    /// Number of DIDs with a record.
    pub fn len(&self) -> usize {
        self.records
            .iter()
            .filter(|entry| entry.value().lock().is_some())
            .count()
    }

    /// Whether no DID has a record.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, did: &Did) -> Slot {
        // Clone the Arc out so the shard guard drops at the end of this
        // statement, before the caller locks the slot.
        Arc::clone(self.records.entry(did.clone()).or_default().value())
    }

    fn register_in(
        &self,
        slot: &Slot,
        did: &Did,
        cid: &ContentAddress,
        signature: Option<&str>,
    ) -> Result<RegistryRecord, RegistryError> {
        let mut guard = slot.lock();

        if let Some(record) = guard.as_ref().filter(|r| r.revoked) {
            tracing::warn!(did = %did, "registration refused: DID revoked");
            return Err(RegistryError::AlreadyRevoked(record.did.to_string()));
        }

        let submitted = self
            .load_document(cid)?
            .ok_or_else(|| RegistryError::NotFound(format!("document {cid} is not in the store")))?;
        if &submitted.id != did {
            return Err(ValidationError::field(
                "doc_cid",
                format!("document {cid} describes {}, not {did}", submitted.id),
            )
            .into());
        }

        match guard.as_mut() {
            None => {
                self.authorize(did, cid, signature, &submitted)?;
                let record = RegistryRecord::new(did.clone(), cid.clone(), Timestamp::now());
                tracing::info!(did = %did, cid = %cid, "registered DID");
                *guard = Some(record.clone());
                Ok(record)
            }
            Some(record) => {
                let current = self.load_document(&record.current_cid)?.ok_or_else(|| {
                    RegistryError::Inconsistent(format!(
                        "{did} points at {} which is not in the store",
                        record.current_cid
                    ))
                })?;
                self.authorize(did, cid, signature, &current)?;
                if &record.current_cid == cid {
                    tracing::debug!(did = %did, cid = %cid, "registration unchanged");
                    return Ok(record.clone());
                }
                let now = Timestamp::now();
                record.version_history.push(VersionEntry {
                    cid: cid.clone(),
                    timestamp: now,
                });
                record.current_cid = cid.clone();
                record.last_updated = now;
                tracing::info!(
                    did = %did,
                    cid = %cid,
                    version = record.version_history.len(),
                    "updated DID document pointer"
                );
                Ok(record.clone())
            }
        }
    }

    /// Drop the slot of a DID that never got a record. Only when nobody
    /// else holds the slot: new holders can only clone it out of the map,
    /// and the map entry is locked while the predicate runs.
    fn prune(&self, did: &Did) {
        self.records.remove_if(did, |_, slot| {
            Arc::strong_count(slot) == 1 && slot.try_lock().is_some_and(|record| record.is_none())
        });
    }

    fn existing_slot(&self, did: &Did) -> Option<Slot> {
        self.records.get(did).map(|entry| Arc::clone(entry.value()))
    }

    fn load_document(&self, cid: &ContentAddress) -> Result<Option<DidDocument>, RegistryError> {
        let fetched = self.store.retrieve(cid)?;
        match fetched.document {
            Some(value) if fetched.exists => Ok(Some(DidDocument::from_value(value)?)),
            _ => Ok(None),
        }
    }

    fn authorize(
        &self,
        did: &Did,
        cid: &ContentAddress,
        signature: Option<&str>,
        signer_doc: &DidDocument,
    ) -> Result<(), RegistryError> {
        let unauthorized = |reason: &str| {
            tracing::warn!(did = %did, cid = %cid, reason, "unauthorized registry update");
            RegistryError::UnauthorizedUpdate {
                did: did.to_string(),
                reason: reason.to_string(),
            }
        };
        let Some(signature) = signature else {
            if self.require_signatures {
                return Err(unauthorized("signature required"));
            }
            return Ok(());
        };
        let signature = from_hex(signature)?;
        let payload = registration_payload(did, cid)?;
        let accepted = signer_doc
            .authentication_methods()
            .any(|vm| vm.verify(&payload, &signature).unwrap_or(false));
        if accepted {
            Ok(())
        } else {
            Err(unauthorized("no authentication key verifies the signature"))
        }
    }
}

impl std::fmt::Debug for DidRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DidRegistry")
            .field("records", &self.records.len())
            .field("require_signatures", &self.require_signatures)
            .finish_non_exhaustive()
    }
}

impl RegistryClient for DidRegistry {
    fn register(
        &self,
        did: &Did,
        cid: &ContentAddress,
        signature: Option<&str>,
    ) -> Result<RegistryRecord, RegistryError> {
        let slot = self.slot(did);
        let outcome = self.register_in(&slot, did, cid, signature);
        drop(slot);
        if outcome.is_err() {
            self.prune(did);
        }
        outcome
    }

    fn resolve(&self, did: &Did) -> Result<RegistryLookup, RegistryError> {
        let record = self.existing_slot(did).and_then(|slot| slot.lock().clone());
        Ok(RegistryLookup::from_record(did, record.as_ref()))
    }

    fn revoke(&self, did: &Did) -> Result<RegistryRecord, RegistryError> {
        let not_found = || RegistryError::NotFound(format!("{did} is not registered"));
        let slot = self.existing_slot(did).ok_or_else(not_found)?;
        let mut guard = slot.lock();
        let record = guard.as_mut().ok_or_else(not_found)?;
        if !record.revoked {
            let now = Timestamp::now();
            record.revoked = true;
            record.revoked_at = Some(now);
            record.last_updated = now;
            tracing::info!(did = %did, cid = %record.current_cid, "revoked DID");
        }
        Ok(record.clone())
    }

    fn record(&self, did: &Did) -> Result<Option<RegistryRecord>, RegistryError> {
        Ok(self.existing_slot(did).and_then(|slot| slot.lock().clone()))
    }
}
