//! Registry and resolver driven together through their trait objects, the
//! way the pipeline holds them.

use std::sync::Arc;
use std::time::Duration;

use verity_cas::{CasClient, ContentStore};
use verity_core::{Did, Timestamp};
use verity_crypto::{Ed25519KeyPair, SigningKeyPair};
use verity_did::{
    sign_registration, DidDocument, DidRegistry, DidResolver, LookupStatus, RegistryClient,
    RegistryError, ResolutionStatus, ResolveOptions, VerificationMethod,
};

fn document(did: &Did, key: &dyn SigningKeyPair) -> DidDocument {
    DidDocument::new(did.clone(), Timestamp::now())
        .with_verification_method(VerificationMethod::for_key(did, "key-1", key).unwrap(), true)
        .with_metadata("organization", "Org One")
}

#[test]
fn found_then_revoked_then_refused() {
    let store: Arc<dyn CasClient> = Arc::new(ContentStore::in_memory());
    let registry: Arc<dyn RegistryClient> = Arc::new(DidRegistry::new(store.clone()));
    let resolver = DidResolver::new(registry.clone(), store.clone())
        .with_cache_ttl(Duration::ZERO);

    let did = Did::new("did:example:org1").unwrap();
    let key = Ed25519KeyPair::generate();
    let cid = store
        .store(&document(&did, &key).to_value().unwrap(), None)
        .unwrap()
        .cid;
    let sig = sign_registration(&did, &cid, &key).unwrap();

    registry.register(&did, &cid, Some(&sig)).unwrap();
    let lookup = registry.resolve(&did).unwrap();
    assert_eq!(lookup.status, LookupStatus::Found);
    assert_eq!(lookup.doc_cid.as_ref(), Some(&cid));
    assert_eq!(
        resolver.resolve(did.as_str(), ResolveOptions::default()).status,
        ResolutionStatus::Resolved
    );

    registry.revoke(&did).unwrap();
    assert_eq!(registry.resolve(&did).unwrap().status, LookupStatus::Revoked);
    assert_eq!(
        resolver.resolve(did.as_str(), ResolveOptions::default()).status,
        ResolutionStatus::Revoked
    );

    let err = registry.register(&did, &cid, Some(&sig)).unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyRevoked(_)));
}

#[test]
fn result_serializes_with_snake_case_statuses() {
    let store: Arc<dyn CasClient> = Arc::new(ContentStore::in_memory());
    let registry: Arc<dyn RegistryClient> = Arc::new(DidRegistry::new(store.clone()));
    let resolver = DidResolver::new(registry, store);

    let r = resolver.resolve("did:example:missing", ResolveOptions::default());
    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json["status"], "not_found");
    assert_eq!(json["resolution_metadata"]["registry_status"], "not_found");
    assert_eq!(json["retrieval_path"], serde_json::json!(["registry"]));
    assert!(json.get("document").is_none());
}
