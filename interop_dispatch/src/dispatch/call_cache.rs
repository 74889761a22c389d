//! Per-descriptor-set memo of overload resolutions.
//!
//! Purely a cost optimization: with the cache disabled every call resolves
//! from scratch and produces the same result.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use interop_dispatch_runtime::DynamicValue;
use parking_lot::RwLock;

use super::fingerprint::CallFingerprint;
use super::resolver::Resolution;

pub const DEFAULT_CACHE_CAPACITY: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub enabled: bool,
    /// Entries kept before the cache is cleared
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    Hit(Resolution),
    Miss,
    /// An entry existed but no longer fits the arguments; it was evicted.
    Stale,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stale: u64,
    pub entries: usize,
}

#[derive(Debug)]
pub struct CallSiteCache {
    settings: CacheSettings,
    entries: RwLock<HashMap<CallFingerprint, Resolution>>,
    hits: AtomicU64,
    misses: AtomicU64,
    stale: AtomicU64,
}

impl CallSiteCache {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stale: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Look up a resolution, re-validating its arity against `args`.
    pub fn lookup(&self, fingerprint: CallFingerprint, args: &[DynamicValue]) -> CacheLookup {
        if !self.settings.enabled {
            return CacheLookup::Miss;
        }
        let cached = self.entries.read().get(&fingerprint).cloned();
        match cached {
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(target: "interop.cache", fingerprint = fingerprint.raw(), "miss");
                CacheLookup::Miss
            }
            Some(resolution) if resolution.revalidate(args) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(target: "interop.cache", fingerprint = fingerprint.raw(), "hit");
                CacheLookup::Hit(resolution)
            }
            Some(_) => {
                self.entries.write().remove(&fingerprint);
                self.stale.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(
                    target: "interop.cache",
                    fingerprint = fingerprint.raw(),
                    "stale entry evicted"
                );
                CacheLookup::Stale
            }
        }
    }

    /// Remember a resolution; last writer wins.
    pub fn store(&self, fingerprint: CallFingerprint, resolution: Resolution) {
        if !self.settings.enabled {
            return;
        }
        let mut entries = self.entries.write();
        if entries.len() >= self.settings.capacity && !entries.contains_key(&fingerprint) {
            tracing::debug!(
                target: "interop.cache",
                capacity = self.settings.capacity,
                "call-site cache full, clearing"
            );
            entries.clear();
        }
        entries.insert(fingerprint, resolution);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
