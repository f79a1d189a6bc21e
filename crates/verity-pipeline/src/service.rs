//! # Provenance Service
//!
//! [`ProvenanceService`] composes the content store, the DID registry, the
//! resolver and the claim signer behind the operations a transport layer
//! exposes. It owns no transport; hosts call it directly.
//!
//! ## Outcome Policy
//!
//! - Malformed input (bad DID, bad CID, empty document) is `Err`.
//! - Registry refusals (revoked, unauthorized, document missing) are
//!   [`UpdateResponse`]s with `status: error`, an [`ErrorKind`] and a
//!   message.
//! - Resolution and verification always complete with a value.
//! - Storage failures and broken invariants are `Err`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use verity_cas::{CasClient, ContentStore, FsBackend, RetrieveResult, StoreReceipt};
use verity_claim::{
    AnchorBatch, Claim, ClaimBuilder, ClaimIdScheme, ClaimSigner, ClaimVerification, ContentType,
    SealedBatch,
};
use verity_core::{
    ContentAddress, Did, DidMethodRegistry, DidUrl, ErrorKind, Timestamp, ValidationError,
    VerityError,
};
use verity_crypto::{
    verify_inclusion, Ed25519KeyPair, KeyAlgorithm, MerkleStep, Secp256k1KeyPair, SigningKeyPair,
};
use verity_did::{
    sign_registration, DidDocument, DidRegistry, DidResolver, RegistryClient, RegistryError,
    RegistryLookup, RegistryRecord, ResolutionResult, ResolveOptions, ServiceEndpoint,
    VerificationMethod,
};

use crate::config::{ConfigError, StorageKind, VerityConfig};

/// Content type under which signed claims are published.
pub const CLAIM_CONTENT_TYPE: &str = "application/vc+ld+json";

/// Fragment of the key generated by [`ProvenanceService::provision_issuer`].
pub const ISSUER_KEY_FRAGMENT: &str = "key-1";

/// Service type advertised in provisioned DID documents.
pub const VERIFICATION_SERVICE_TYPE: &str = "VerityClaimVerification";

/// Whether an update was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// The registry applied the update.
    Success,
    /// The registry refused the update.
    Error,
}

/// Outcome of a register or revoke call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResponse {
    /// Applied or refused.
    pub status: OperationStatus,
    /// The DID the call targeted.
    pub did: String,
    /// Document the DID points at after the call (the last one, once
    /// revoked).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_cid: Option<String>,
    /// Record update time, or the refusal time.
    pub timestamp: Timestamp,
    /// Taxonomy kind of the refusal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    /// Human-readable detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UpdateResponse {
    fn applied(record: &RegistryRecord) -> Self {
        Self {
            status: OperationStatus::Success,
            did: record.did.to_string(),
            doc_cid: Some(record.current_cid.to_string()),
            timestamp: record.last_updated,
            error: None,
            message: None,
        }
    }

    fn refused(did: &Did, doc_cid: Option<&ContentAddress>, error: &RegistryError) -> Self {
        Self {
            status: OperationStatus::Error,
            did: did.to_string(),
            doc_cid: doc_cid.map(ToString::to_string),
            timestamp: Timestamp::now(),
            error: Some(error.kind()),
            message: Some(error.to_string()),
        }
    }

    /// Whether the update was applied.
    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Success
    }
}

/// Inputs for [`ProvenanceService::build_and_sign_claim`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRequest {
    /// Issuer DID; must use a known method.
    pub issuer_did: String,
    /// Absolute DID URL or `#fragment` relative to the issuer.
    pub key_id: String,
    /// Hash of the content the claim is about.
    pub content_hash: String,
    /// Kind of content.
    pub content_type: ContentType,
    /// Additional subject fields.
    pub subject: Value,
    /// Defaults to now.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuance_date: Option<Timestamp>,
    /// Must follow the issuance date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<Timestamp>,
    /// `(platform, algorithm, hash)` triples.
    #[serde(default)]
    pub platform_hashes: Vec<(String, String, String)>,
}

impl ClaimRequest {
    /// A request with no dates or platform hashes.
    pub fn new(
        issuer_did: impl Into<String>,
        key_id: impl Into<String>,
        content_hash: impl Into<String>,
        content_type: ContentType,
        subject: Value,
    ) -> Self {
        Self {
            issuer_did: issuer_did.into(),
            key_id: key_id.into(),
            content_hash: content_hash.into(),
            content_type,
            subject,
            issuance_date: None,
            expiration_date: None,
            platform_hashes: Vec::new(),
        }
    }
}

/// An issuer created by [`ProvenanceService::provision_issuer`].
///
/// Holds the only copy of the private key. Callers persist it themselves.
#[derive(Debug)]
pub struct ProvisionedIssuer {
    /// The registered DID.
    pub did: Did,
    /// CID of the stored DID document.
    pub doc_cid: ContentAddress,
    /// The generated key's verification method.
    pub signed_by: DidUrl,
    /// The generated key pair.
    pub key: Box<dyn SigningKeyPair>,
    /// Base URL published claims are verified under.
    pub verification_url: String,
}

/// The provenance pipeline.
pub struct ProvenanceService {
    config: VerityConfig,
    methods: DidMethodRegistry,
    scheme: ClaimIdScheme,
    store: Arc<dyn CasClient>,
    registry: Arc<dyn RegistryClient>,
    resolver: DidResolver,
    signer: ClaimSigner,
}

impl std::fmt::Debug for ProvenanceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvenanceService")
            .field("config", &self.config)
            .field("store", &self.store.source_name())
            .field("registry", &self.registry.source_name())
            .finish()
    }
}

impl ProvenanceService {
    /// Build the store and registry the configuration describes.
    pub fn new(config: VerityConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let store: Arc<dyn CasClient> = match config.storage.backend {
            StorageKind::Memory => Arc::new(ContentStore::in_memory()),
            StorageKind::Filesystem => {
                let root = config.storage.root.clone().ok_or_else(|| {
                    ConfigError::Invalid("storage.root is required for the filesystem backend".into())
                })?;
                Arc::new(ContentStore::new(Arc::new(FsBackend::new(root))))
            }
        };
        let registry: Arc<dyn RegistryClient> = Arc::new(DidRegistry::new(store.clone()));
        Self::with_components(config, store, registry)
    }

    /// Use caller-supplied collaborators.
    pub fn with_components(
        config: VerityConfig,
        store: Arc<dyn CasClient>,
        registry: Arc<dyn RegistryClient>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let methods = config.resolver.method_registry();
        let scheme = config.claims.id_scheme()?;
        let resolver = DidResolver::new(registry.clone(), store.clone())
            .with_cache_ttl(config.resolver.cache_ttl())
            .with_methods(methods.clone());
        tracing::info!(
            store = store.source_name(),
            cache_ttl_secs = config.resolver.cache_ttl_secs,
            "provenance service ready"
        );
        Ok(Self {
            signer: ClaimSigner::new(scheme.clone()),
            config,
            methods,
            scheme,
            store,
            registry,
            resolver,
        })
    }

    /// Consult `source` after the primary store when fetching documents.
    pub fn with_fallback_source(mut self, source: Arc<dyn CasClient>) -> Self {
        self.resolver = self.resolver.with_fallback_source(source);
        self
    }

    /// The validated configuration.
    pub fn config(&self) -> &VerityConfig {
        &self.config
    }

    /// The resolver, for cache control.
    pub fn resolver(&self) -> &DidResolver {
        &self.resolver
    }

    fn parse_did(&self, did: &str) -> Result<Did, VerityError> {
        Ok(self.methods.parse(did.trim())?)
    }

    // ─── Registry ────────────────────────────────────────────────────

    /// Point `did` at `doc_cid`.
    pub fn register_did(
        &self,
        did: &str,
        doc_cid: &str,
        signature: Option<&str>,
    ) -> Result<UpdateResponse, VerityError> {
        let did = self.parse_did(did)?;
        let cid = ContentAddress::parse(doc_cid.trim())?;
        let outcome = self.registry.register(&did, &cid, signature);
        self.resolver.invalidate(&did);
        match outcome {
            Ok(record) => Ok(UpdateResponse::applied(&record)),
            Err(e) => refusal(&did, Some(&cid), e),
        }
    }

    /// Registry pointer and status for `did`.
    pub fn resolve_did(&self, did: &str) -> Result<RegistryLookup, VerityError> {
        let did = self.parse_did(did)?;
        Ok(self.registry.resolve(&did)?)
    }

    /// Permanently revoke `did`.
    pub fn revoke_did(&self, did: &str) -> Result<UpdateResponse, VerityError> {
        let did = self.parse_did(did)?;
        let outcome = self.registry.revoke(&did);
        self.resolver.invalidate(&did);
        match outcome {
            Ok(record) => {
                let mut response = UpdateResponse::applied(&record);
                response.message = Some(format!("{did} is revoked"));
                Ok(response)
            }
            Err(e) => refusal(&did, None, e),
        }
    }

    // ─── Content store ───────────────────────────────────────────────

    /// Store a JSON document and return its CID.
    pub fn store_document(
        &self,
        document: &Value,
        content_type: Option<&str>,
    ) -> Result<StoreReceipt, VerityError> {
        Ok(self.store.store(document, content_type)?)
    }

    /// Fetch a document. A missing CID is `exists: false`, not an error.
    pub fn retrieve_document(&self, cid: &str) -> Result<RetrieveResult, VerityError> {
        let cid = ContentAddress::parse(cid.trim())?;
        Ok(self.store.retrieve(&cid)?)
    }

    // ─── Resolution ──────────────────────────────────────────────────

    /// Registry lookup, document fetch and integrity check in one call.
    pub fn resolve_full(&self, did: &str, options: ResolveOptions) -> ResolutionResult {
        self.resolver.resolve(did, options)
    }

    // ─── Claims ──────────────────────────────────────────────────────

    /// Build a claim with the configured defaults and sign it with `key`.
    pub fn build_and_sign_claim(
        &self,
        request: ClaimRequest,
        key: &dyn SigningKeyPair,
    ) -> Result<Claim, VerityError> {
        let ClaimRequest {
            issuer_did,
            key_id,
            content_hash,
            content_type,
            subject,
            issuance_date,
            expiration_date,
            platform_hashes,
        } = request;
        self.parse_did(&issuer_did)?;

        let mut builder = ClaimBuilder::new(issuer_did, key_id, content_hash, content_type, subject)
            .with_context(vec![self.config.claims.default_context.clone()])
            .with_types(self.config.claims.default_types.clone())
            .with_id_scheme(self.scheme.clone());
        if let Some(at) = issuance_date {
            builder = builder.issued_at(at);
        }
        if let Some(at) = expiration_date {
            builder = builder.expires_at(at);
        }
        for (platform, algorithm, hash) in platform_hashes {
            builder = builder.with_platform_hash(platform, algorithm, hash);
        }

        let claim = self.signer.sign_claim(builder.build()?, key)?;
        Ok(claim.with_verification_url(&self.config.claims.verification_base_url))
    }

    /// Whether `claim` verifies against its issuer's current document.
    pub fn verify_claim(&self, claim: &Claim) -> bool {
        self.signer.verify(claim, &self.resolver)
    }

    /// As [`verify_claim`](Self::verify_claim), with the failure reason.
    pub fn verify_claim_detailed(&self, claim: &Claim) -> ClaimVerification {
        self.signer.verify_detailed(claim, &self.resolver)
    }

    /// Persist a signed claim in the content store.
    pub fn publish_claim(&self, claim: &Claim) -> Result<StoreReceipt, VerityError> {
        if !claim.is_signed() {
            return Err(ValidationError::field(
                "proof",
                format!("claim {} must be signed before publishing", claim.claim_id()),
            )
            .into());
        }
        let receipt = self.store.store(&claim.to_value()?, Some(CLAIM_CONTENT_TYPE))?;
        tracing::info!(claim_id = claim.claim_id(), cid = %receipt.cid, "published claim");
        Ok(receipt)
    }

    /// Load a published claim.
    pub fn fetch_claim(&self, cid: &str) -> Result<Option<Claim>, VerityError> {
        match self.retrieve_document(cid)?.document {
            Some(document) => Ok(Some(Claim::from_value(document)?)),
            None => Ok(None),
        }
    }

    // ─── Anchoring ───────────────────────────────────────────────────

    /// Commit signed claims to one Merkle root.
    pub fn anchor_claims(
        &self,
        claims: Vec<Claim>,
        transaction_receipt: Option<&str>,
    ) -> Result<SealedBatch, VerityError> {
        let mut batch = AnchorBatch::new();
        for claim in claims {
            batch.push(claim)?;
        }
        Ok(batch.seal(transaction_receipt)?)
    }

    /// Whether `proof` places `leaf_hash` under `expected_root`.
    ///
    /// # Errors
    ///
    /// `MalformedProof` if any hash or position cannot be parsed.
    pub fn verify_anchor(
        &self,
        leaf_hash: &str,
        proof: &[MerkleStep],
        expected_root: &str,
    ) -> Result<bool, VerityError> {
        Ok(verify_inclusion(leaf_hash, proof, expected_root)?)
    }

    // ─── Provisioning ────────────────────────────────────────────────

    /// Generate a key, publish a DID document for it and register `did`.
    ///
    /// The registration is signed with the new key.
    pub fn provision_issuer(
        &self,
        did: &str,
        algorithm: KeyAlgorithm,
        metadata: Map<String, Value>,
    ) -> Result<ProvisionedIssuer, VerityError> {
        let did = self.parse_did(did)?;
        let key: Box<dyn SigningKeyPair> = match algorithm {
            KeyAlgorithm::Ed25519 => Box::new(Ed25519KeyPair::generate()),
            KeyAlgorithm::Secp256k1 => Box::new(Secp256k1KeyPair::generate()),
        };
        let method = VerificationMethod::for_key(&did, ISSUER_KEY_FRAGMENT, key.as_ref())?;
        let signed_by = method.id.clone();
        let verification_url = self.config.claims.verification_base_url.clone();

        let mut document = DidDocument::new(did.clone(), Timestamp::now())
            .with_verification_method(method, true)
            .with_service(ServiceEndpoint {
                id: format!("{did}#claim-verification"),
                service_type: VERIFICATION_SERVICE_TYPE.to_string(),
                service_endpoint: verification_url.clone(),
            });
        for (name, value) in metadata {
            document = document.with_metadata(name, value);
        }

        let receipt = self.store.store(&document.to_value()?, None)?;
        let signature = sign_registration(&did, &receipt.cid, key.as_ref())?;
        let response = self.register_did(did.as_str(), &receipt.cid.to_string(), Some(&signature))?;
        if !response.is_success() {
            let message = response.message.unwrap_or_default();
            return Err(match response.error {
                Some(ErrorKind::Revoked) => VerityError::Revoked(message),
                Some(ErrorKind::UnauthorizedUpdate) => VerityError::UnauthorizedUpdate(message),
                Some(ErrorKind::NotFound) => VerityError::NotFound(message),
                _ => VerityError::Internal(message),
            });
        }
        tracing::info!(did = %did, cid = %receipt.cid, algorithm = %algorithm, "provisioned issuer");
        Ok(ProvisionedIssuer {
            did,
            doc_cid: receipt.cid,
            signed_by,
            key,
            verification_url,
        })
    }
}

/// Refusals become responses; everything else propagates.
fn refusal(
    did: &Did,
    cid: Option<&ContentAddress>,
    error: RegistryError,
) -> Result<UpdateResponse, VerityError> {
    match error.kind() {
        ErrorKind::Revoked | ErrorKind::UnauthorizedUpdate | ErrorKind::NotFound => {
            tracing::warn!(did = %did, error = %error, "registry update refused");
            Ok(UpdateResponse::refused(did, cid, &error))
        }
        _ => Err(error.into()),
    }
}
