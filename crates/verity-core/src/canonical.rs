//! # Canonical Serialization — JCS-Compatible Byte Production
//!
//! `CanonicalBytes` is the sole construction path for bytes that are
//! hashed into a content address or signed into a claim proof.
//!
//! ## Invariant
//!
//! The inner `Vec<u8>` is private. The constructors apply float rejection
//! and then RFC 8785 (JSON Canonicalization Scheme) serialization through
//! `serde_jcs`: sorted object keys, compact separators, UTF-8 output.
//! Any function that hashes or signs takes `&CanonicalBytes`, so a raw
//! `serde_json::to_vec()` can never reach a digest.
//!
//! ## Why floats are rejected
//!
//! JCS number formatting for non-integers is the single largest source of
//! cross-implementation drift. Amounts, scores and coordinates must be
//! carried as strings or integers.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - Object keys are sorted, separators are compact.
/// - No floating-point numbers appear anywhere in the value.
/// - Timestamps are whatever `Serialize` produced for them; use
///   [`Timestamp`](crate::Timestamp) to get the fixed `...Z` format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// `FloatRejected` if the value contains a non-integer number,
    /// `SerializationFailed` if serde cannot represent it as JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Canonicalize an already-built JSON value.
    ///
    /// Used when a caller must edit the value tree before hashing, such as
    /// removing the `proof` member of a claim.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume and return the inner buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the canonical byte sequence is empty. Never true for a
    /// value produced by the constructors; kept for clippy parity.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if !n.is_i64() && !n.is_u64() {
                return Err(CanonicalizationError::FloatRejected(
                    n.as_f64().unwrap_or(f64::NAN),
                ));
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        Value::Object(map) => map.values().try_for_each(reject_floats),
    }
}
