//! Reference scenarios, driven through `ProvenanceService`.

use anyhow::{ensure, Result};
use serde_json::{json, Map};
use verity_claim::{derive_claim_id, verify_claim_anchor, ContentType};
use verity_core::{sha256_bytes, Did, ErrorKind, Timestamp};
use verity_crypto::{node_hash, Ed25519KeyPair, KeyAlgorithm, MerkleTree, Side};
use verity_did::{DidDocument, LookupStatus, ResolutionStatus, ResolveOptions, VerificationMethod};
use verity_pipeline::{ClaimRequest, OperationStatus, ProvenanceService, VerityConfig};

fn service() -> Result<ProvenanceService> {
    Ok(ProvenanceService::new(VerityConfig::default())?)
}

#[test]
fn register_resolve_revoke_then_refuse() -> Result<()> {
    let svc = service()?;
    let did = Did::new("did:example:org1")?;
    let key = Ed25519KeyPair::generate();
    let doc = DidDocument::new(did.clone(), Timestamp::now())
        .with_verification_method(VerificationMethod::for_key(&did, "key-1", &key)?, true);
    let cid = svc.store_document(&doc.to_value()?, None)?.cid.to_string();

    let registered = svc.register_did("did:example:org1", &cid, None)?;
    ensure!(registered.is_success(), "{:?}", registered.message);

    let lookup = svc.resolve_did("did:example:org1")?;
    assert_eq!(lookup.status, LookupStatus::Found);
    assert_eq!(lookup.doc_cid.map(|c| c.to_string()), Some(cid.clone()));

    let revoked = svc.revoke_did("did:example:org1")?;
    assert_eq!(revoked.status, OperationStatus::Success);
    assert_eq!(svc.resolve_did("did:example:org1")?.status, LookupStatus::Revoked);
    assert_eq!(
        svc.resolve_full("did:example:org1", ResolveOptions::default()).status,
        ResolutionStatus::Revoked
    );

    let again = svc.register_did("did:example:org1", &cid, None)?;
    assert_eq!(again.status, OperationStatus::Error);
    assert_eq!(again.error, Some(ErrorKind::Revoked));
    assert!(again.message.unwrap_or_default().contains("revoked"));
    Ok(())
}

#[test]
fn claim_id_depends_only_on_its_inputs() -> Result<()> {
    let issuer = Did::new("did:example:org1")?;
    let at = Timestamp::parse("2026-01-15T12:00:00Z")?;
    let first = derive_claim_id(&issuer, "sha256:deadbeef", &at);
    assert_eq!(first, derive_claim_id(&issuer, "sha256:deadbeef", &at));
    assert_eq!(first, "claim_0dcee6fadd7b31c9");
    assert_ne!(first, derive_claim_id(&issuer, "sha256:deadbeee", &at));

    let svc = service()?;
    let key = Ed25519KeyPair::generate();
    let request = |hash: &str| {
        let mut r = ClaimRequest::new(
            "did:example:org1",
            "#key-1",
            hash,
            ContentType::Image,
            json!({"caption": "harbour at dawn"}),
        );
        r.issuance_date = Some(at);
        r
    };
    let a = svc.build_and_sign_claim(request("sha256:deadbeef"), &key)?;
    let b = svc.build_and_sign_claim(request("sha256:deadbeef"), &key)?;
    let c = svc.build_and_sign_claim(request("sha256:deadbeee"), &key)?;
    assert_eq!(a.claim_id(), first);
    assert_eq!(a.claim_id(), b.claim_id());
    assert_ne!(a.claim_id(), c.claim_id());
    Ok(())
}

#[test]
fn four_leaf_tree_proves_the_third_leaf() -> Result<()> {
    let leaves: Vec<[u8; 32]> = (0u8..4).map(|i| sha256_bytes(&[i])).collect();
    let tree = MerkleTree::from_leaves(&leaves)?;
    let proof = tree.proof(2)?;

    assert_eq!(proof.len(), 2);
    assert_eq!(proof[0].parse()?, (leaves[3], Side::Right));
    assert_eq!(proof[1].parse()?, (node_hash(&leaves[0], &leaves[1]), Side::Left));

    let svc = service()?;
    let leaf = verity_core::encoding::to_hex(&leaves[2]);
    assert!(svc.verify_anchor(&leaf, &proof, &tree.root_hex())?);

    let other: Vec<[u8; 32]> = (10u8..15).map(|i| sha256_bytes(&[i])).collect();
    let other_root = MerkleTree::from_leaves(&other)?.root_hex();
    assert!(!svc.verify_anchor(&leaf, &proof, &other_root)?);

    let mut altered = proof.clone();
    altered[0].sibling_hash = "00".repeat(32);
    assert!(!svc.verify_anchor(&leaf, &altered, &tree.root_hex())?);

    altered[0].position = "up".into();
    let err = svc
        .verify_anchor(&leaf, &altered, &tree.root_hex())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedProof);
    Ok(())
}

#[test]
fn issuer_to_anchored_claim_end_to_end() -> Result<()> {
    let svc = service()?;
    let mut meta = Map::new();
    meta.insert("organization".into(), json!("Harbour Gazette"));
    let issuer = svc.provision_issuer("did:verity:press:harbour-gazette", KeyAlgorithm::Ed25519, meta)?;

    let mut claims = Vec::new();
    for n in 0..3 {
        let mut request = ClaimRequest::new(
            issuer.did.as_str(),
            issuer.signed_by.to_string(),
            format!("sha256:{:064x}", n + 1),
            ContentType::Image,
            json!({"frame": n}),
        );
        request
            .platform_hashes
            .push(("instagram".into(), "phash".into(), format!("ff{n:02}")));
        claims.push(svc.build_and_sign_claim(request, issuer.key.as_ref())?);
    }

    let sealed = svc.anchor_claims(claims, Some("ledger:tx:0042"))?;
    for claim in &sealed.claims {
        let receipt = svc.publish_claim(claim)?;
        let fetched = svc
            .fetch_claim(&receipt.cid.to_string())?
            .ok_or_else(|| anyhow::anyhow!("published claim missing"))?;
        assert_eq!(&fetched, claim);

        let verification = svc.verify_claim_detailed(&fetched);
        ensure!(verification.verified, "{:?}", verification.message);

        let anchor = fetched
            .proof()
            .and_then(|p| p.anchors.first())
            .ok_or_else(|| anyhow::anyhow!("anchored claim has no anchor"))?;
        assert!(verify_claim_anchor(&fetched, anchor, &sealed.root)?);
        assert!(svc.verify_anchor(&anchor.leaf_hash, &anchor.merkle_proof, &sealed.root)?);
    }

    svc.revoke_did(issuer.did.as_str())?;
    let after = svc.verify_claim_detailed(&sealed.claims[0]);
    assert!(!after.verified);
    assert_eq!(after.resolution_status, Some(ResolutionStatus::Revoked));
    Ok(())
}

#[test]
fn key_rotation_invalidates_the_cache() -> Result<()> {
    let svc = service()?;
    let issuer = svc.provision_issuer("did:verity:demo:rotating", KeyAlgorithm::Ed25519, Map::new())?;
    let first = svc.resolve_full(issuer.did.as_str(), ResolveOptions::default());
    assert_eq!(first.status, ResolutionStatus::Resolved);

    let next_key = Ed25519KeyPair::generate();
    let rotated = DidDocument::new(issuer.did.clone(), Timestamp::now()).with_verification_method(
        VerificationMethod::for_key(&issuer.did, "key-2", &next_key)?,
        true,
    );
    let cid = svc.store_document(&rotated.to_value()?, None)?.cid;
    let signature = verity_did::sign_registration(&issuer.did, &cid, issuer.key.as_ref())?;
    let update = svc.register_did(issuer.did.as_str(), &cid.to_string(), Some(&signature))?;
    ensure!(update.is_success(), "{:?}", update.message);

    let second = svc.resolve_full(issuer.did.as_str(), ResolveOptions::default().with_proof());
    assert!(!second.resolution_metadata.cache_hit);
    assert_eq!(second.resolution_metadata.doc_cid.as_ref(), Some(&cid));
    assert_eq!(second.proof_chain.map(|c| c.len()), Some(2));
    Ok(())
}
