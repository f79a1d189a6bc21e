//! # Byte Storage Backends
//!
//! The storage engine underneath the CAS only needs a flat key space with
//! an atomic "write if absent". Keys are `/`-separated relative paths
//! (`sha256/<hex>.json`); the CAS never asks a backend to overwrite.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::StorageError;

/// A byte-level key/value engine.
pub trait StorageBackend: Send + Sync {
    /// Read the bytes under `key`, if present.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Write `bytes` under `key` unless the key already exists.
    ///
    /// Returns `true` if this call wrote, `false` if the key was already
    /// present. The check and the write are a single atomic step.
    fn put_if_absent(&self, key: &str, bytes: &[u8]) -> Result<bool, StorageError>;

    /// Remove `key`. Returns `true` if it was present.
    fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Whether `key` is present.
    fn contains(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }
}

/// In-process backend on a concurrent hash map.
///
/// Cheaply cloneable; all clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<DashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn overwrite(&self, key: &str, bytes: Vec<u8>) {
        self.entries.insert(key.to_string(), bytes);
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn put_if_absent(&self, key: &str, bytes: &[u8]) -> Result<bool, StorageError> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(bytes.to_vec());
                Ok(true)
            }
        }
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.remove(key).is_some())
    }

    fn contains(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.contains_key(key))
    }
}
