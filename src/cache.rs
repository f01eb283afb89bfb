//! Resolution caches
//!
//! Time-bounded caches between the annotation producers and the network.
//! Entries are never evicted proactively: a stale entry stays until the next
//! successful fetch overwrites it, so a failing refetch can degrade to
//! last-known-good data instead of no data. Freshness is the caller's
//! decision, checked against the configured TTL at read time.
//!
//! Nothing here caches absence. A negative lookup stores no entry, so the
//! next request retries instead of trusting a stale "not found".
//!
//! DashMap keeps lookups from different request handlers from contending on
//! a single map lock.

use crate::proto::Token;
use dashmap::DashMap;
use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub timestamp_ms: u64,
    pub value: V,
}

impl<V> CacheEntry<V> {
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.is_fresh_at(now_ms(), ttl)
    }

    pub fn is_fresh_at(&self, now_ms: u64, ttl: Duration) -> bool {
        now_ms.saturating_sub(self.timestamp_ms) < ttl.as_millis() as u64
    }
}

/// A string-keyed cache of timestamped values.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Arc<DashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Returns the entry whatever its age; callers wanting degrade-to-stale
    /// reads use this and judge freshness themselves.
    pub fn get(&self, key: &str) -> Option<CacheEntry<V>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Returns the value only while it is within `ttl` of its write.
    pub fn get_fresh(&self, key: &str, ttl: Duration) -> Option<V> {
        self.get(key)
            .filter(|entry| entry.is_fresh(ttl))
            .map(|entry| entry.value)
    }

    pub fn put(&self, key: impl Into<String>, value: V) {
        self.put_at(key, value, now_ms());
    }

    pub fn put_at(&self, key: impl Into<String>, value: V, timestamp_ms: u64) {
        self.entries
            .insert(key.into(), CacheEntry { timestamp_ms, value });
    }

    pub fn values(&self) -> Vec<V> {
        self.entries
            .iter()
            .map(|entry| entry.value().value.clone())
            .collect()
    }

    /// Write time of the oldest entry, used to refresh whole-snapshot caches
    /// in one piece rather than per key.
    pub fn oldest_timestamp_ms(&self) -> Option<u64> {
        self.entries
            .iter()
            .map(|entry| entry.value().timestamp_ms)
            .min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

/// The five caches shared by every request handler. Cloning shares storage.
/// All five are dropped together on configuration change, since cached
/// values may have been produced under different credentials or providers.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCaches {
    /// name -> checksummed address
    pub ens_forward: TtlCache<String>,
    /// checksummed address -> confirmed name
    pub ens_reverse: TtlCache<String>,
    /// checksummed address -> token; doubles as the top-token snapshot
    pub tokens: TtlCache<Token>,
    /// checksummed address -> rendered hover markdown
    pub hover_markdown: TtlCache<String>,
    /// checksummed address -> verified ABI json
    pub contract_abi: TtlCache<String>,
}

impl ResolutionCaches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_all(&self) {
        self.ens_forward.clear();
        self.ens_reverse.clear();
        self.tokens.clear();
        self.hover_markdown.clear();
        self.contract_abi.clear();
    }
}
