//! Concurrent use of one service, and a filesystem-backed service surviving
//! a restart.

use std::thread;

use anyhow::Result;
use serde_json::{json, Map};
use verity_crypto::KeyAlgorithm;
use verity_did::{LookupStatus, ResolutionStatus, ResolveOptions};
use verity_pipeline::{ProvenanceService, StorageKind, VerityConfig};

#[test]
fn parallel_provisioning_and_resolution() -> Result<()> {
    let svc = ProvenanceService::new(VerityConfig::default())?;
    thread::scope(|s| {
        for worker in 0..8 {
            let svc = &svc;
            s.spawn(move || {
                let did = format!("did:verity:load:worker-{worker}");
                let issuer = svc
                    .provision_issuer(&did, KeyAlgorithm::Ed25519, Map::new())
                    .unwrap();
                for _ in 0..20 {
                    let r = svc.resolve_full(&did, ResolveOptions::default());
                    assert_eq!(r.status, ResolutionStatus::Resolved);
                    assert_eq!(r.resolution_metadata.doc_cid.as_ref(), Some(&issuer.doc_cid));
                }
            });
        }
    });

    // Everyone racing to store the same document gets the same address.
    let doc = json!({"shared": true, "n": 7});
    let cids: Vec<String> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| svc.store_document(&doc, None).unwrap().cid.to_string()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(cids.windows(2).all(|w| w[0] == w[1]));
    Ok(())
}

#[test]
fn filesystem_store_outlives_the_service() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut config = VerityConfig::default();
    config.storage.backend = StorageKind::Filesystem;
    config.storage.root = Some(dir.path().to_path_buf());

    let doc = json!({"id": "did:verity:archive:one", "note": "kept on disk"});
    let cid = {
        let svc = ProvenanceService::new(config.clone())?;
        svc.store_document(&doc, Some("application/json"))?.cid.to_string()
    };

    // Registry state is in-process; the content is not.
    let svc = ProvenanceService::new(config)?;
    let fetched = svc.retrieve_document(&cid)?;
    assert!(fetched.exists);
    assert_eq!(fetched.document, Some(doc));
    assert_eq!(fetched.content_type.as_deref(), Some("application/json"));
    assert_eq!(
        svc.resolve_did("did:verity:archive:one")?.status,
        LookupStatus::NotFound
    );
    Ok(())
}
