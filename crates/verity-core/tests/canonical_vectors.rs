//! # Fixed Canonicalization Vectors
//!
//! Every value below was canonicalized and hashed by an independent JCS
//! implementation (`json.dumps(sort_keys=True, separators=(",", ":"),
//! ensure_ascii=False)` + SHA-256). If any of these fail, documents stored
//! by this build will get different addresses than documents stored by
//! other implementations, and signatures will stop verifying across them.

use verity_core::{CanonicalBytes, ContentAddress};

fn canonical(value: &serde_json::Value) -> (String, String) {
    let cb = CanonicalBytes::new(value).expect("canonicalization should succeed");
    let text = std::str::from_utf8(cb.as_bytes()).unwrap().to_string();
    (text, ContentAddress::of(&cb).to_string())
}

#[test]
fn did_document_vector() {
    let key = "11".repeat(32);
    let doc = serde_json::json!({
        "id": "did:verity:demo:election-commission",
        "verification_methods": [{
            "id": "did:verity:demo:election-commission#key-1",
            "type": "Ed25519VerificationKey2020",
            "controller": "did:verity:demo:election-commission",
            "public_key_multibase": format!("f{key}"),
        }],
        "authentication": ["did:verity:demo:election-commission#key-1"],
        "services": [],
        "metadata": {"organization": "Demo Election Commission", "tier": "S"},
        "created": "2026-01-15T12:00:00Z",
        "updated": "2026-01-15T12:00:00Z",
    });

    let (text, cid) = canonical(&doc);
    assert!(text.starts_with(r#"{"authentication":["#));
    assert!(text.contains(r#""verification_methods":[{"controller":"#));
    assert_eq!(
        cid,
        "sha256:43501c937827eb307bb5c5ece329bf863edf408ab9e419f6a6fcc56a4241c5c5"
    );
}

#[test]
fn registration_payload_vector() {
    let payload = serde_json::json!({
        "doc_cid": format!("sha256:{}", "ab".repeat(32)),
        "did": "did:example:org1",
    });
    let (text, cid) = canonical(&payload);
    assert_eq!(
        text,
        format!(r#"{{"did":"did:example:org1","doc_cid":"sha256:{}"}}"#, "ab".repeat(32))
    );
    assert_eq!(
        cid,
        "sha256:95b80da8ac0ae441455394b4055ca4e6cfd9281946c83396e127b7d620db2eb7"
    );
}

#[test]
fn non_ascii_vector() {
    let value = serde_json::json!({"name": "Comisión Electoral", "n": 7});
    let (text, cid) = canonical(&value);
    assert_eq!(text, r#"{"n":7,"name":"Comisión Electoral"}"#);
    assert_eq!(
        cid,
        "sha256:8866221dce977bd7ad950dea7b62cedd6cd4033c2e69976819da9bb5036c3b88"
    );
}

#[test]
fn reordered_input_keeps_address() {
    let a: serde_json::Value =
        serde_json::from_str(r#"{"x":{"b":[1,2],"a":"s"},"y":null}"#).unwrap();
    let b: serde_json::Value =
        serde_json::from_str(r#"{"y":null,"x":{"a":"s","b":[1,2]}}"#).unwrap();
    assert_eq!(canonical(&a), canonical(&b));
}
