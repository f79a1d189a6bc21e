//! # Claim Signing and Verification
//!
//! ## Security Invariants
//!
//! - Signing canonicalizes the claim with `proof` and `verification_url`
//!   removed ([`Claim::signing_input`]) and signs those bytes through the
//!   [`SigningKeyPair`] capability. The scheme is whatever the key is.
//! - Verification fails closed. Every problem (no proof, unresolvable or
//!   revoked issuer, unknown key, key not controlled by the issuer, suite
//!   mismatch, malformed signature, expiry, tampered id) yields
//!   `verified: false` with a message. Nothing escapes as an error that a
//!   caller could mistake for success.
//! - The issuer is always resolved against the registry, never the resolver
//!   cache, so a revocation takes effect on the next verification.

use serde::{Deserialize, Serialize};
use verity_core::encoding::{from_hex, to_hex};
use verity_core::Timestamp;
use verity_crypto::{KeyAlgorithm, SigningKeyPair};
use verity_did::{DidResolver, ResolutionStatus, ResolveOptions};

use crate::builder::ClaimIdScheme;
use crate::claim::{Claim, Proof};
use crate::error::ClaimError;

/// Detailed outcome of verifying a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimVerification {
    /// Whether the claim verified.
    pub verified: bool,
    /// Claim identifier.
    pub claim_id: String,
    /// Issuer DID.
    pub issuer: String,
    /// Verification method named by the proof.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<String>,
    /// How the issuer resolved, when resolution was attempted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_status: Option<ResolutionStatus>,
    /// Why verification failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Signs claims and verifies them against resolved DID documents.
#[derive(Debug, Clone, Default)]
pub struct ClaimSigner {
    scheme: ClaimIdScheme,
}

impl ClaimSigner {
    /// A signer that checks claim ids against `scheme`.
    pub fn new(scheme: ClaimIdScheme) -> Self {
        Self { scheme }
    }

    /// Sign `claim`'s payload with `key`, producing a detached proof bound
    /// to the claim's `signed_by` method.
    pub fn sign(&self, claim: &Claim, key: &dyn SigningKeyPair) -> Result<Proof, ClaimError> {
        let input = claim.signing_input()?;
        let signature = key.sign(&input);
        tracing::info!(
            claim_id = claim.claim_id(),
            issuer = %claim.issuer().id,
            algorithm = %key.algorithm(),
            "signed claim"
        );
        Ok(Proof {
            proof_type: key.algorithm().proof_type().to_string(),
            created: Timestamp::now(),
            verification_method: claim.issuer().signed_by.clone(),
            signature_value: to_hex(&signature),
            anchors: Vec::new(),
        })
    }

    /// Sign and attach the proof.
    ///
    /// # Errors
    ///
    /// [`ClaimError::AlreadySigned`] if `claim` already carries a proof.
    pub fn sign_claim(&self, claim: Claim, key: &dyn SigningKeyPair) -> Result<Claim, ClaimError> {
        if claim.is_signed() {
            return Err(ClaimError::AlreadySigned(claim.claim_id().to_string()));
        }
        let proof = self.sign(&claim, key)?;
        claim.with_proof(proof)
    }

    /// Whether `claim` verifies.
    pub fn verify(&self, claim: &Claim, resolver: &DidResolver) -> bool {
        self.verify_detailed(claim, resolver).verified
    }

    /// Verify `claim`, resolving its issuer through `resolver`.
    pub fn verify_detailed(&self, claim: &Claim, resolver: &DidResolver) -> ClaimVerification {
        let mut outcome = ClaimVerification {
            verified: false,
            claim_id: claim.claim_id().to_string(),
            issuer: claim.issuer().id.to_string(),
            verification_method: None,
            resolution_status: None,
            message: None,
        };
        match self.check(claim, resolver, &mut outcome) {
            Ok(()) => outcome.verified = true,
            Err(reason) => {
                tracing::debug!(claim_id = claim.claim_id(), reason = %reason, "claim failed verification");
                outcome.message = Some(reason);
            }
        }
        outcome
    }

    fn check(
        &self,
        claim: &Claim,
        resolver: &DidResolver,
        outcome: &mut ClaimVerification,
    ) -> Result<(), String> {
        let proof = claim.proof().ok_or("claim is not signed")?;
        outcome.verification_method = Some(proof.verification_method.to_string());
        let issuer = claim.issuer();

        if let Some(exp) = claim.expiration_date() {
            if claim.is_expired_at(Timestamp::now()) {
                return Err(format!("claim expired at {exp}"));
            }
        }
        let expected_id = self
            .scheme
            .derive(&issuer.id, claim.content_hash(), &claim.issuance_date());
        if expected_id != claim.claim_id() {
            return Err(format!(
                "claim id {} does not match its inputs (expected {expected_id})",
                claim.claim_id()
            ));
        }
        if proof.verification_method != issuer.signed_by {
            return Err(format!(
                "proof names {} but the issuer signs with {}",
                proof.verification_method, issuer.signed_by
            ));
        }
        if proof.verification_method.did() != &issuer.id {
            return Err(format!(
                "{} is not a key of {}",
                proof.verification_method, issuer.id
            ));
        }

        let resolution = resolver.resolve(issuer.id.as_str(), ResolveOptions::default().bypass_cache());
        outcome.resolution_status = Some(resolution.status);
        if resolution.status != ResolutionStatus::Resolved {
            return Err(format!(
                "issuer {} did not resolve ({}): {}",
                issuer.id,
                resolution.status,
                resolution.error_message.unwrap_or_default()
            ));
        }
        let document = resolution
            .document
            .ok_or_else(|| format!("issuer {} resolved without a document", issuer.id))?;

        let method = document
            .verification_method(&proof.verification_method)
            .ok_or_else(|| format!("{} is not in the issuer's document", proof.verification_method))?;
        if method.controller != issuer.id {
            return Err(format!(
                "{} is controlled by {}, not {}",
                method.id, method.controller, issuer.id
            ));
        }

        let proof_alg = KeyAlgorithm::from_proof_type(&proof.proof_type).map_err(|e| e.to_string())?;
        let key_alg = method.algorithm().map_err(|e| e.to_string())?;
        if proof_alg != key_alg {
            return Err(format!(
                "proof type {} does not match key type {}",
                proof.proof_type, method.method_type
            ));
        }

        let signature = from_hex(&proof.signature_value).map_err(|e| format!("signature: {e}"))?;
        let input = claim.signing_input().map_err(|e| e.to_string())?;
        match method.verify(&input, &signature) {
            Ok(true) => Ok(()),
            Ok(false) => Err("signature does not verify".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }
}
