//! # DID Documents
//!
//! A DID document lists the keys an issuer signs with and the services it
//! exposes. Once stored in the CAS a document is immutable: a key rotation
//! is a new document under a new address, registered against the same DID.
//!
//! Serialized field names are fixed; they are part of the content address.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use verity_core::encoding::from_multibase;
use verity_core::{CanonicalBytes, Did, DidUrl, Timestamp, ValidationError};
use verity_crypto::{verify_signature, CryptoError, KeyAlgorithm, SigningKeyPair};

/// A public key bound to a DID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationMethod {
    /// `did#fragment` identifier, unique within its document.
    pub id: DidUrl,
    /// Key type, e.g. `Ed25519VerificationKey2020`.
    #[serde(rename = "type")]
    pub method_type: String,
    /// The DID that controls this key.
    pub controller: Did,
    /// Public key, multibase base16.
    pub public_key_multibase: String,
}

impl VerificationMethod {
    /// Describe `key` as method `#fragment` of `did`, controlled by `did`.
    pub fn for_key(
        did: &Did,
        fragment: &str,
        key: &dyn SigningKeyPair,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: did.with_fragment(fragment)?,
            method_type: key.algorithm().verification_method_type().to_string(),
            controller: did.clone(),
            public_key_multibase: key.public_key_multibase(),
        })
    }

    /// The signature scheme named by `type`.
    pub fn algorithm(&self) -> Result<KeyAlgorithm, CryptoError> {
        KeyAlgorithm::from_verification_method_type(&self.method_type)
    }

    /// Decoded public key bytes.
    pub fn public_key_bytes(&self) -> Result<Vec<u8>, ValidationError> {
        from_multibase(&self.public_key_multibase)
    }

    /// Verify `signature` over `data` with this method's key.
    ///
    /// # Errors
    ///
    /// [`CryptoError`] if the type is unsupported or the key or signature
    /// cannot be decoded.
    pub fn verify(&self, data: &CanonicalBytes, signature: &[u8]) -> Result<bool, CryptoError> {
        let public_key = self.public_key_bytes()?;
        verify_signature(self.algorithm()?, &public_key, data, signature)
    }
}

/// A service the issuer exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// Service identifier.
    pub id: String,
    /// Service type, e.g. `VerityClaimVerification`.
    #[serde(rename = "type")]
    pub service_type: String,
    /// Where the service is reachable.
    pub service_endpoint: String,
}

/// A DID document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DidDocument {
    /// The DID this document describes.
    pub id: Did,
    /// Keys, in declaration order.
    #[serde(default)]
    pub verification_methods: Vec<VerificationMethod>,
    /// References to the methods allowed to authenticate as `id`.
    #[serde(default)]
    pub authentication: Vec<DidUrl>,
    /// Service endpoints, in declaration order.
    #[serde(default)]
    pub services: Vec<ServiceEndpoint>,
    /// Free-form issuer metadata (organization, jurisdiction, tier, ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// Creation time.
    pub created: Timestamp,
    /// Last modification time.
    pub updated: Timestamp,
}

impl DidDocument {
    /// An empty document for `id`, created and updated at `at`.
    pub fn new(id: Did, at: Timestamp) -> Self {
        Self {
            id,
            verification_methods: Vec::new(),
            authentication: Vec::new(),
            services: Vec::new(),
            metadata: BTreeMap::new(),
            created: at,
            updated: at,
        }
    }

    /// Add a verification method, optionally listing it for authentication.
    pub fn with_verification_method(mut self, method: VerificationMethod, authentication: bool) -> Self {
        if authentication {
            self.authentication.push(method.id.clone());
        }
        self.verification_methods.push(method);
        self
    }

    /// Add a service endpoint.
    pub fn with_service(mut self, service: ServiceEndpoint) -> Self {
        self.services.push(service);
        self
    }

    /// Set one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check structural invariants.
    ///
    /// - Every method id belongs to this DID and is unique.
    /// - Every `authentication` entry names a method in this document,
    ///   and appears once.
    /// - `updated` is not before `created`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut ids = BTreeSet::new();
        for vm in &self.verification_methods {
            if vm.id.did() != &self.id {
                return Err(ValidationError::field(
                    "verification_methods",
                    format!("{} does not belong to {}", vm.id, self.id),
                ));
            }
            if !ids.insert(&vm.id) {
                return Err(ValidationError::field(
                    "verification_methods",
                    format!("duplicate method id {}", vm.id),
                ));
            }
        }
        let mut seen = BTreeSet::new();
        for reference in &self.authentication {
            if !ids.contains(reference) {
                return Err(ValidationError::field(
                    "authentication",
                    format!("{reference} does not name a verification method"),
                ));
            }
            if !seen.insert(reference) {
                return Err(ValidationError::field(
                    "authentication",
                    format!("{reference} listed twice"),
                ));
            }
        }
        if self.updated < self.created {
            return Err(ValidationError::field("updated", "earlier than created"));
        }
        Ok(())
    }

    /// Parse and validate a stored document.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let doc: Self = serde_json::from_value(value)
            .map_err(|e| ValidationError::field("did_document", e.to_string()))?;
        doc.validate()?;
        Ok(doc)
    }

    /// The JSON form stored in the CAS.
    pub fn to_value(&self) -> Result<Value, ValidationError> {
        serde_json::to_value(self).map_err(|e| ValidationError::field("did_document", e.to_string()))
    }

    /// Look up a method by id.
    pub fn verification_method(&self, id: &DidUrl) -> Option<&VerificationMethod> {
        self.verification_methods.iter().find(|vm| &vm.id == id)
    }

    /// Methods listed under `authentication`, in listing order.
    pub fn authentication_methods(&self) -> impl Iterator<Item = &VerificationMethod> {
        self.authentication
            .iter()
            .filter_map(|id| self.verification_method(id))
    }
}
