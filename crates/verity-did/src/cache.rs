//! # Resolution Cache
//!
//! A concurrent map from DID to the last successful resolution, with a
//! fixed time-to-live. Concurrent refreshes of the same DID race on
//! insert and the last write wins; staleness is bounded by the TTL.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use verity_core::{ContentAddress, Did};

use crate::document::DidDocument;
use crate::registry::VersionEntry;

/// Default time-to-live for cached resolutions.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// A cached successful resolution.
#[derive(Debug, Clone)]
pub struct CachedResolution {
    /// The resolved document.
    pub document: DidDocument,
    /// Address the document was fetched from.
    pub cid: ContentAddress,
    /// Registry version history at resolution time.
    pub history: Vec<VersionEntry>,
    inserted_at: Instant,
}

impl CachedResolution {
    /// A fresh entry.
    pub fn new(document: DidDocument, cid: ContentAddress, history: Vec<VersionEntry>) -> Self {
        Self {
            document,
            cid,
            history,
            inserted_at: Instant::now(),
        }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() < ttl
    }
}

/// TTL cache of resolutions, keyed by DID.
#[derive(Debug)]
pub struct ResolutionCache {
    entries: DashMap<Did, CachedResolution>,
    ttl: Duration,
}

impl ResolutionCache {
    /// An empty cache. A zero `ttl` disables caching.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// A fresh entry for `did`. Expired entries are dropped on the way.
    pub fn get(&self, did: &Did) -> Option<CachedResolution> {
        if let Some(entry) = self.entries.get(did) {
            if entry.is_fresh(self.ttl) {
                return Some(entry.value().clone());
            }
        }
        // Only remove if still stale: a concurrent refresh may have landed.
        self.entries.remove_if(did, |_, e| !e.is_fresh(self.ttl));
        None
    }

    /// Store a resolution. Ignored when caching is disabled.
    pub fn insert(&self, did: Did, entry: CachedResolution) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries.insert(did, entry);
    }

    /// Drop the entry for `did`. Returns whether one was present.
    pub fn invalidate(&self, did: &Did) -> bool {
        self.entries.remove(did).is_some()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
