//! In-process idempotency store.

use crate::error::CacheResult;
use crate::traits::IdempotencyStore;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// In-memory store with per-key expiry.
///
/// Expired markers are dropped lazily when looked up, or in bulk by
/// [`purge_expired`](Self::purge_expired). Clones share the same map.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<DashMap<String, Instant>>,
}

/// Snapshot of one live marker.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryStatus {
    pub key: String,
    pub expires_in: Duration,
}

/// Snapshot of the whole store, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub total_entries: usize,
    pub active: Vec<CacheEntryStatus>,
}

impl InMemoryStore {
    /// Create new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of markers held, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired marker and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at > now);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "purged expired idempotency markers");
        }
        removed
    }

    /// Live markers sorted by key, with the time each has left.
    pub fn status(&self) -> CacheStatus {
        let now = Instant::now();
        let mut active: Vec<CacheEntryStatus> = self
            .entries
            .iter()
            .filter(|entry| *entry.value() > now)
            .map(|entry| CacheEntryStatus {
                key: entry.key().clone(),
                expires_in: *entry.value() - now,
            })
            .collect();
        active.sort_by(|a, b| a.key.cmp(&b.key));

        CacheStatus {
            total_entries: self.entries.len(),
            active,
        }
    }

    /// Remove every marker and return the keys that were cleared.
    pub fn clear(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        self.entries.clear();
        keys.sort();
        debug!(cleared = keys.len(), "cleared idempotency markers");
        keys
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryStore {
    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let now = Instant::now();
        if self
            .entries
            .remove_if(key, |_, expires_at| *expires_at <= now)
            .is_some()
        {
            debug!(key, "idempotency marker expired");
            return Ok(false);
        }
        Ok(self.entries.contains_key(key))
    }

    async fn set(&self, key: &str, ttl: Duration) -> CacheResult<()> {
        self.entries.insert(key.to_string(), Instant::now() + ttl);
        Ok(())
    }

    async fn claim(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if *occupied.get() > now {
                    return Ok(false);
                }
                occupied.insert(now + ttl);
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(now + ttl);
                Ok(true)
            }
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}
