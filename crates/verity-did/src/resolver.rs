//! # DID Resolver
//!
//! Turns a DID string into its current DID document: syntax check, cache,
//! registry lookup, then a fetch from the first content source that holds
//! the document. Every call returns a [`ResolutionResult`]; outcomes such
//! as "not found" or "revoked" are statuses, never errors.
//!
//! ```text
//!   did ──syntax──▶ cache? ──hit──▶ resolved ["cache"]
//!                     │ miss / override
//!                     ▼
//!                  registry ──not_found / revoked──▶ status
//!                     │ found(cid)
//!                     ▼
//!               source 1 ─miss─▶ source 2 ─miss─▶ … ─▶ error (inconsistency)
//!                     │ hit
//!                     ▼
//!              resolved ["registry", "<source>", …], cached
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use verity_cas::CasClient;
use verity_core::{ContentAddress, Did, DidMethodRegistry, Timestamp};

use crate::cache::{CachedResolution, ResolutionCache, DEFAULT_CACHE_TTL};
use crate::document::DidDocument;
use crate::registry::{LookupStatus, RegistryClient, VersionEntry};

/// Source name recorded for cache hits.
pub const CACHE_SOURCE: &str = "cache";

/// Outcome of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// The document was resolved and is trusted.
    Resolved,
    /// The DID is not registered.
    NotFound,
    /// The DID is malformed or uses an unknown method.
    InvalidDid,
    /// The DID is revoked; any document returned is untrusted.
    Revoked,
    /// Resolution failed; see `error_message`.
    Error,
}

impl ResolutionStatus {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::NotFound => "not_found",
            Self::InvalidDid => "invalid_did",
            Self::Revoked => "revoked",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call resolution switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Attach the registry's version history as `proof_chain`.
    pub include_proof: bool,
    /// Skip the cache read. A successful result still refreshes the cache.
    pub cache_override: bool,
}

impl ResolveOptions {
    /// Request a proof chain.
    pub fn with_proof(mut self) -> Self {
        self.include_proof = true;
        self
    }

    /// Bypass the cache read.
    pub fn bypass_cache(mut self) -> Self {
        self.cache_override = true;
        self
    }
}

/// One entry of a proof chain: a document address the registry held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofEntry {
    /// Where the entry came from.
    pub source: String,
    /// Document address.
    pub cid: ContentAddress,
    /// When it became current.
    pub timestamp: Timestamp,
}

/// Diagnostics about how a result was produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionMetadata {
    /// Address the document was (or would be) fetched from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_cid: Option<ContentAddress>,
    /// What the registry answered, when it was consulted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_status: Option<LookupStatus>,
    /// Whether the answer came from the cache.
    pub cache_hit: bool,
    /// Wall time spent resolving.
    pub duration_ms: u64,
}

/// The answer to one resolution call. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// The DID as requested.
    pub did: String,
    /// Outcome.
    pub status: ResolutionStatus,
    /// The document, when resolved (or fetched for audit when revoked).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DidDocument>,
    /// Sources consulted, in order.
    pub retrieval_path: Vec<String>,
    /// When the call completed.
    pub resolved_at: Timestamp,
    /// How the result was produced.
    pub resolution_metadata: ResolutionMetadata,
    /// Registry history, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_chain: Option<Vec<ProofEntry>>,
    /// Human-readable reason for every non-resolved status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ResolutionResult {
    /// Whether the document is resolved and trusted.
    pub fn is_resolved(&self) -> bool {
        self.status == ResolutionStatus::Resolved
    }
}

// Accumulates one resolution call.
struct Trace {
    did: String,
    started: Instant,
    path: Vec<String>,
    metadata: ResolutionMetadata,
}

impl Trace {
    fn new(did: &str) -> Self {
        Self {
            did: did.to_string(),
            started: Instant::now(),
            path: Vec::new(),
            metadata: ResolutionMetadata::default(),
        }
    }

    fn visit(&mut self, source: &str) {
        self.path.push(source.to_string());
    }

    fn finish(
        mut self,
        status: ResolutionStatus,
        document: Option<DidDocument>,
        proof_chain: Option<Vec<ProofEntry>>,
        error_message: Option<String>,
    ) -> ResolutionResult {
        self.metadata.duration_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        ResolutionResult {
            did: self.did,
            status,
            document,
            retrieval_path: self.path,
            resolved_at: Timestamp::now(),
            resolution_metadata: self.metadata,
            proof_chain,
            error_message,
        }
    }

    fn fail(self, status: ResolutionStatus, message: String) -> ResolutionResult {
        self.finish(status, None, None, Some(message))
    }
}

fn proof_chain(history: &[VersionEntry], source: &str) -> Vec<ProofEntry> {
    history
        .iter()
        .map(|e| ProofEntry {
            source: source.to_string(),
            cid: e.cid.clone(),
            timestamp: e.timestamp,
        })
        .collect()
}

/// Resolves DIDs against a registry and an ordered list of content sources.
pub struct DidResolver {
    registry: Arc<dyn RegistryClient>,
    sources: Vec<Arc<dyn CasClient>>,
    cache: ResolutionCache,
    methods: DidMethodRegistry,
}

impl DidResolver {
    /// A resolver with one content source, the default TTL, and the
    /// default DID methods.
    pub fn new(registry: Arc<dyn RegistryClient>, source: Arc<dyn CasClient>) -> Self {
        Self {
            registry,
            sources: vec![source],
            cache: ResolutionCache::new(DEFAULT_CACHE_TTL),
            methods: DidMethodRegistry::default(),
        }
    }

    /// Append a fallback content source, consulted after the earlier ones.
    pub fn with_fallback_source(mut self, source: Arc<dyn CasClient>) -> Self {
        self.sources.push(source);
        self
    }

    /// Set the cache time-to-live. Clears the cache.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = ResolutionCache::new(ttl);
        self
    }

    /// Restrict resolution to these DID methods.
    pub fn with_methods(mut self, methods: DidMethodRegistry) -> Self {
        self.methods = methods;
        self
    }

    /// The resolution cache.
    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Drop any cached resolution of `did`.
    pub fn invalidate(&self, did: &Did) -> bool {
        self.cache.invalidate(did)
    }

    /// Resolve `did`.
    pub fn resolve(&self, did: &str, options: ResolveOptions) -> ResolutionResult {
        let mut trace = Trace::new(did);

        let did = match self.methods.parse(did.trim()) {
            Ok(did) => did,
            Err(e) => return trace.fail(ResolutionStatus::InvalidDid, e.to_string()),
        };

        if !options.cache_override {
            if let Some(hit) = self.cache.get(&did) {
                tracing::debug!(did = %did, "resolution cache hit");
                trace.visit(CACHE_SOURCE);
                trace.metadata.cache_hit = true;
                trace.metadata.doc_cid = Some(hit.cid);
                let chain = options
                    .include_proof
                    .then(|| proof_chain(&hit.history, self.registry.source_name()));
                return trace.finish(ResolutionStatus::Resolved, Some(hit.document), chain, None);
            }
            tracing::debug!(did = %did, "resolution cache miss");
        }

        trace.visit(self.registry.source_name());
        let lookup = match self.registry.resolve(&did) {
            Ok(lookup) => lookup,
            Err(e) => {
                return trace.fail(ResolutionStatus::Error, format!("registry lookup failed: {e}"))
            }
        };
        trace.metadata.registry_status = Some(lookup.status);
        trace.metadata.doc_cid = lookup.doc_cid.clone();

        match (lookup.status, lookup.doc_cid) {
            (LookupStatus::NotFound, _) => trace.fail(
                ResolutionStatus::NotFound,
                format!("{did} is not registered"),
            ),
            (LookupStatus::Revoked, cid) => self.finish_revoked(trace, &did, cid, options),
            (LookupStatus::Found, None) => trace.fail(
                ResolutionStatus::Error,
                format!("registry reported {did} as found without a document address"),
            ),
            (LookupStatus::Found, Some(cid)) => self.finish_found(trace, &did, cid, options),
        }
    }

    fn finish_found(
        &self,
        mut trace: Trace,
        did: &Did,
        cid: ContentAddress,
        options: ResolveOptions,
    ) -> ResolutionResult {
        let document = match self.fetch(&mut trace, &cid) {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                tracing::warn!(did = %did, cid = %cid, "registry points at a document no source holds");
                return trace.fail(
                    ResolutionStatus::Error,
                    format!("registry points {did} at {cid}, but no content source holds it"),
                );
            }
            Err(message) => return trace.fail(ResolutionStatus::Error, message),
        };
        if &document.id != did {
            tracing::warn!(did = %did, cid = %cid, found = %document.id, "document describes another DID");
            return trace.fail(
                ResolutionStatus::Error,
                format!("document {cid} describes {}, not {did}", document.id),
            );
        }

        let history = match self.registry.record(did) {
            Ok(Some(record)) => record.version_history,
            _ => Vec::new(),
        };
        let chain = options
            .include_proof
            .then(|| proof_chain(&history, self.registry.source_name()));

        self.cache
            .insert(did.clone(), CachedResolution::new(document.clone(), cid, history));
        trace.finish(ResolutionStatus::Resolved, Some(document), chain, None)
    }

    fn finish_revoked(
        &self,
        mut trace: Trace,
        did: &Did,
        cid: Option<ContentAddress>,
        options: ResolveOptions,
    ) -> ResolutionResult {
        self.cache.invalidate(did);
        let message = format!("{did} has been revoked; its documents must not be trusted");
        if !options.include_proof {
            return trace.fail(ResolutionStatus::Revoked, message);
        }

        let document = cid.and_then(|cid| self.fetch(&mut trace, &cid).ok().flatten());
        let chain = match self.registry.record(did) {
            Ok(Some(record)) => proof_chain(&record.version_history, self.registry.source_name()),
            _ => Vec::new(),
        };
        trace.finish(ResolutionStatus::Revoked, document, Some(chain), Some(message))
    }

    // First source holding `cid` wins. A failing source is skipped; a
    // document that does not parse is an error.
    fn fetch(&self, trace: &mut Trace, cid: &ContentAddress) -> Result<Option<DidDocument>, String> {
        for source in &self.sources {
            trace.visit(source.source_name());
            match source.retrieve(cid) {
                Ok(found) if found.exists => {
                    let Some(value) = found.document else { continue };
                    return DidDocument::from_value(value)
                        .map(Some)
                        .map_err(|e| format!("document {cid} is not a valid DID document: {e}"));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(cid = %cid, source = source.source_name(), error = %e, "content source failed");
                }
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for DidResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DidResolver")
            .field("sources", &self.sources.iter().map(|s| s.source_name()).collect::<Vec<_>>())
            .field("cache_ttl", &self.cache.ttl())
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::VerificationMethod;
    use crate::registry::DidRegistry;
    use verity_cas::ContentStore;
    use verity_crypto::Ed25519KeyPair;

    struct Fixture {
        store: Arc<ContentStore>,
        registry: Arc<DidRegistry>,
        resolver: DidResolver,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(ContentStore::in_memory());
        let registry = Arc::new(DidRegistry::new(store.clone()));
        let resolver = DidResolver::new(registry.clone(), store.clone());
        Fixture {
            store,
            registry,
            resolver,
        }
    }

    fn publish(f: &Fixture, did: &str, tag: &str) -> (Did, ContentAddress) {
        let did = Did::new(did).unwrap();
        let key = Ed25519KeyPair::generate();
        let doc = DidDocument::new(did.clone(), Timestamp::now())
            .with_verification_method(VerificationMethod::for_key(&did, "key-1", &key).unwrap(), true)
            .with_metadata("tag", tag);
        let cid = f.store.store(&doc.to_value().unwrap(), None).unwrap().cid;
        f.registry.register(&did, &cid, None).unwrap();
        (did, cid)
    }

    #[test]
    fn malformed_did_is_invalid_without_lookup() {
        let f = fixture();
        for bad in ["", "did:", "not-a-did", "did:unknownmethod:x:y"] {
            let r = f.resolver.resolve(bad, ResolveOptions::default());
            assert_eq!(r.status, ResolutionStatus::InvalidDid, "{bad:?}");
            assert!(r.retrieval_path.is_empty());
            assert!(r.error_message.is_some());
        }
    }

    #[test]
    fn unregistered_did_is_not_found() {
        let f = fixture();
        let r = f.resolver.resolve("did:example:ghost", ResolveOptions::default());
        assert_eq!(r.status, ResolutionStatus::NotFound);
        assert_eq!(r.retrieval_path, vec!["registry"]);
        assert!(r.error_message.unwrap().contains("not registered"));
    }

    #[test]
    fn first_resolution_walks_registry_then_store_then_caches() {
        let f = fixture();
        let (did, cid) = publish(&f, "did:verity:demo:org", "v1");

        let first = f.resolver.resolve(did.as_str(), ResolveOptions::default());
        assert!(first.is_resolved());
        assert_eq!(first.retrieval_path, vec!["registry", "ipfs"]);
        assert_eq!(first.resolution_metadata.doc_cid, Some(cid.clone()));
        assert!(!first.resolution_metadata.cache_hit);
        assert!(first.proof_chain.is_none());

        let second = f.resolver.resolve(did.as_str(), ResolveOptions::default());
        assert!(second.is_resolved());
        assert_eq!(second.retrieval_path, vec!["cache"]);
        assert!(second.resolution_metadata.cache_hit);
        assert_eq!(second.document, first.document);
    }

    #[test]
    fn cache_override_bypasses_read_but_refreshes() {
        let f = fixture();
        let (did, _) = publish(&f, "did:verity:demo:org", "v1");
        f.resolver.resolve(did.as_str(), ResolveOptions::default());

        let (_, v2) = {
            let key = Ed25519KeyPair::generate();
            let doc = DidDocument::new(did.clone(), Timestamp::now())
                .with_verification_method(VerificationMethod::for_key(&did, "key-2", &key).unwrap(), true);
            let cid = f.store.store(&doc.to_value().unwrap(), None).unwrap().cid;
            f.registry.register(&did, &cid, None).unwrap();
            (doc, cid)
        };

        let stale = f.resolver.resolve(did.as_str(), ResolveOptions::default());
        assert_ne!(stale.resolution_metadata.doc_cid, Some(v2.clone()));

        let fresh = f.resolver.resolve(did.as_str(), ResolveOptions::default().bypass_cache());
        assert_eq!(fresh.retrieval_path, vec!["registry", "ipfs"]);
        assert_eq!(fresh.resolution_metadata.doc_cid, Some(v2.clone()));

        let warmed = f.resolver.resolve(did.as_str(), ResolveOptions::default());
        assert_eq!(warmed.retrieval_path, vec!["cache"]);
        assert_eq!(warmed.resolution_metadata.doc_cid, Some(v2));
    }

    #[test]
    fn proof_chain_lists_history_oldest_first() {
        let f = fixture();
        let (did, v1) = publish(&f, "did:verity:demo:org", "v1");
        let key = Ed25519KeyPair::generate();
        let doc = DidDocument::new(did.clone(), Timestamp::now())
            .with_verification_method(VerificationMethod::for_key(&did, "key-2", &key).unwrap(), true);
        let v2 = f.store.store(&doc.to_value().unwrap(), None).unwrap().cid;
        f.registry.register(&did, &v2, None).unwrap();

        let r = f.resolver.resolve(did.as_str(), ResolveOptions::default().with_proof());
        let chain: Vec<_> = r.proof_chain.unwrap().into_iter().map(|e| (e.source, e.cid)).collect();
        assert_eq!(chain, vec![("registry".to_string(), v1.clone()), ("registry".to_string(), v2.clone())]);

        // Cache hits answer from the cached history.
        let cached = f.resolver.resolve(did.as_str(), ResolveOptions::default().with_proof());
        assert!(cached.resolution_metadata.cache_hit);
        assert_eq!(cached.proof_chain.map(|c| c.len()), Some(2));
    }

    #[test]
    fn revoked_did_is_reported_and_never_cached() {
        let f = fixture();
        let (did, cid) = publish(&f, "did:example:org1", "v1");
        f.resolver.resolve(did.as_str(), ResolveOptions::default());
        f.registry.revoke(&did).unwrap();
        f.resolver.invalidate(&did);

        let r = f.resolver.resolve(did.as_str(), ResolveOptions::default());
        assert_eq!(r.status, ResolutionStatus::Revoked);
        assert!(r.document.is_none());
        assert_eq!(r.resolution_metadata.doc_cid, Some(cid.clone()));
        assert!(r.error_message.unwrap().contains("revoked"));
        assert!(f.resolver.cache().is_empty());

        let audit = f.resolver.resolve(did.as_str(), ResolveOptions::default().with_proof());
        assert_eq!(audit.status, ResolutionStatus::Revoked);
        assert_eq!(audit.retrieval_path, vec!["registry", "ipfs"]);
        assert!(audit.document.is_some());
        assert_eq!(audit.proof_chain.map(|c| c.len()), Some(1));
    }

    #[test]
    fn missing_blob_is_an_error() {
        let f = fixture();
        let (did, cid) = publish(&f, "did:example:org1", "v1");
        f.store.evict(&cid).unwrap();
        let r = f.resolver.resolve(did.as_str(), ResolveOptions::default());
        assert_eq!(r.status, ResolutionStatus::Error);
        assert!(r.error_message.unwrap().contains("no content source holds it"));
        assert!(f.resolver.cache().is_empty());
    }

    #[test]
    fn fallback_source_is_consulted_in_order() {
        let primary = Arc::new(ContentStore::in_memory());
        let mirror = Arc::new(ContentStore::in_memory().with_source_name("mirror"));
        let registry = Arc::new(DidRegistry::new(mirror.clone()));
        let resolver = DidResolver::new(registry.clone(), primary.clone())
            .with_fallback_source(mirror.clone());

        let did = Did::new("did:verity:demo:mirrored").unwrap();
        let doc = DidDocument::new(did.clone(), Timestamp::now());
        let cid = mirror.store(&doc.to_value().unwrap(), None).unwrap().cid;
        registry.register(&did, &cid, None).unwrap();

        let r = resolver.resolve(did.as_str(), ResolveOptions::default());
        assert!(r.is_resolved());
        assert_eq!(r.retrieval_path, vec!["registry", "ipfs", "mirror"]);
    }

    #[test]
    fn restricted_methods_reject_others() {
        let f = fixture();
        let resolver = DidResolver::new(f.registry.clone(), f.store.clone())
            .with_methods(DidMethodRegistry::new(["verity"]));
        let r = resolver.resolve("did:example:org1", ResolveOptions::default());
        assert_eq!(r.status, ResolutionStatus::InvalidDid);
    }

    #[test]
    fn concurrent_resolutions_agree() {
        let f = fixture();
        let (did, cid) = publish(&f, "did:verity:demo:shared", "v1");
        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let resolver = &f.resolver;
                    let did = did.as_str();
                    s.spawn(move || {
                        let opts = if i % 2 == 0 {
                            ResolveOptions::default()
                        } else {
                            ResolveOptions::default().bypass_cache()
                        };
                        resolver.resolve(did, opts)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for r in results {
            assert!(r.is_resolved());
            assert_eq!(r.resolution_metadata.doc_cid.as_ref(), Some(&cid));
        }
    }
}
