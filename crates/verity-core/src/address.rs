//! # Content Addresses
//!
//! A `ContentAddress` (CID) is the algorithm-tagged SHA-256 digest of a
//! document's canonical bytes, rendered `sha256:<64 lowercase hex>`. It is
//! both the storage key and the integrity check: whoever retrieves bytes
//! by CID recomputes the digest and compares.
//!
//! ## Invariant
//!
//! [`ContentAddress::of`] accepts only `&CanonicalBytes`, so every address
//! in the system was computed over JCS output. [`ContentAddress::parse`]
//! validates externally supplied strings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::canonical::CanonicalBytes;
use crate::encoding::{from_hex_array, is_hex_32, to_hex};
use crate::error::ValidationError;

/// Hash algorithm behind a content address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Algorithm tag used in the textual form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "sha256" => Some(Self::Sha256),
            _ => None,
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SHA-256 of arbitrary bytes.
///
/// For hashes that are not content addresses: claim identifiers, Merkle
/// nodes, and the like. Content addressing goes through
/// [`ContentAddress::of`].
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    out
}

/// An algorithm-tagged digest identifying stored content.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentAddress {
    algorithm: DigestAlgorithm,
    digest: [u8; 32],
}

impl ContentAddress {
    /// Compute the address of canonical bytes.
    pub fn of(data: &CanonicalBytes) -> Self {
        Self {
            algorithm: DigestAlgorithm::Sha256,
            digest: sha256_bytes(data.as_bytes()),
        }
    }

    /// Build an address from a raw digest.
    pub fn from_digest(algorithm: DigestAlgorithm, digest: [u8; 32]) -> Self {
        Self { algorithm, digest }
    }

    /// Parse `sha256:<64 hex>`. Hex case is normalized to lowercase.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidContentAddress(s.to_string());
        let (tag, hex) = s.trim().split_once(':').ok_or_else(invalid)?;
        let algorithm = DigestAlgorithm::from_tag(tag).ok_or_else(invalid)?;
        if !is_hex_32(hex) {
            return Err(invalid());
        }
        let digest = from_hex_array::<32>(hex).map_err(|_| invalid())?;
        Ok(Self { algorithm, digest })
    }

    /// The digest algorithm.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// The raw 32-byte digest.
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// The digest as lowercase hex, without the algorithm tag.
    pub fn to_hex(&self) -> String {
        to_hex(&self.digest)
    }

    /// Whether `data` hashes to this address. Constant-time comparison.
    pub fn matches(&self, data: &CanonicalBytes) -> bool {
        let recomputed = Self::of(data);
        recomputed.algorithm == self.algorithm
            && bool::from(recomputed.digest.ct_eq(&self.digest))
    }
}

impl std::fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

impl std::fmt::Debug for ContentAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentAddress({self})")
    }
}

impl std::str::FromStr for ContentAddress {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ContentAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContentAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector_for_empty_object() {
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        let cid = ContentAddress::of(&cb);
        assert_eq!(
            cid.to_string(),
            "sha256:44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn key_order_does_not_change_address() {
        let a = CanonicalBytes::new(&serde_json::json!({"a": 1, "b": 2})).unwrap();
        let b = CanonicalBytes::from_value(
            serde_json::from_str(r#"{"b":2,"a":1}"#).unwrap(),
        )
        .unwrap();
        assert_eq!(ContentAddress::of(&a), ContentAddress::of(&b));
    }

    #[test]
    fn parse_roundtrip_and_case_normalization() {
        let cb = CanonicalBytes::new(&serde_json::json!({"x": "y"})).unwrap();
        let cid = ContentAddress::of(&cb);
        let upper = format!("sha256:{}", cid.to_hex().to_uppercase());
        assert_eq!(ContentAddress::parse(&upper).unwrap(), cid);
        assert_eq!(cid.to_string().parse::<ContentAddress>().unwrap(), cid);
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in [
            "",
            "abc",
            "sha256:",
            "sha256:abc",
            "md5:44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a",
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a",
            "sha256:zz136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a",
        ] {
            assert!(ContentAddress::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn matches_detects_tampering() {
        let original = CanonicalBytes::new(&serde_json::json!({"v": 1})).unwrap();
        let tampered = CanonicalBytes::new(&serde_json::json!({"v": 2})).unwrap();
        let cid = ContentAddress::of(&original);
        assert!(cid.matches(&original));
        assert!(!cid.matches(&tampered));
    }

    #[test]
    fn serde_uses_textual_form() {
        let cb = CanonicalBytes::new(&serde_json::json!([1])).unwrap();
        let cid = ContentAddress::of(&cb);
        let json = serde_json::to_string(&cid).unwrap();
        assert_eq!(json, format!("\"{cid}\""));
        let back: ContentAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cid);
        assert!(serde_json::from_str::<ContentAddress>("\"sha256:00\"").is_err());
    }

    #[test]
    fn addresses_order_by_digest_in_sorted_sets() {
        let cids: Vec<ContentAddress> = (0..16)
            .map(|i| ContentAddress::of(&CanonicalBytes::new(&serde_json::json!({"n": i})).unwrap()))
            .collect();
        let set: std::collections::BTreeSet<_> = cids.iter().cloned().collect();
        assert_eq!(set.len(), cids.len());
        let ordered: Vec<_> = set.into_iter().collect();
        assert!(ordered.windows(2).all(|w| w[0].digest() < w[1].digest()));
        assert_eq!(DigestAlgorithm::Sha256.cmp(&DigestAlgorithm::Sha256), std::cmp::Ordering::Equal);
    }
}
