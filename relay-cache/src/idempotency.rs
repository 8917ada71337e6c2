//! Idempotency cache used by handlers.

use crate::error::CacheResult;
use crate::memory::InMemoryStore;
use crate::traits::IdempotencyStore;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Reference TTL: a redelivery within 15 minutes is suppressed.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Key identifying one logical side-effect occurrence.
///
/// Always starts with a handler namespace (`qr`, `alert`, ...) so two
/// handlers keyed on the same instance never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Build `namespace:part1:part2:...`.
    pub fn new<I, S>(namespace: &str, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut key = namespace.to_string();
        for part in parts {
            key.push(':');
            key.push_str(part.as_ref());
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Namespace prefix (text before the first `:`).
    pub fn namespace(&self) -> &str {
        self.0.split(':').next().unwrap_or_default()
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IdempotencyKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Store plus the TTL policy, shared by every handler.
///
/// Handlers call [`is_done`](Self::is_done) before their side effect and
/// [`mark_done`](Self::mark_done) after it succeeds. The pair is not atomic:
/// two deliveries racing between the check and the mark can both perform the
/// side effect. [`try_claim`](Self::try_claim) closes that window where the
/// store supports it.
#[derive(Clone)]
pub struct IdempotencyCache {
    store: Arc<dyn IdempotencyStore>,
    ttl: Duration,
}

impl IdempotencyCache {
    pub fn new(store: Arc<dyn IdempotencyStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Cache backed by a fresh [`InMemoryStore`].
    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Arc::new(InMemoryStore::new()), ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store(&self) -> &Arc<dyn IdempotencyStore> {
        &self.store
    }

    /// Whether the side effect behind `key` already happened.
    pub async fn is_done(&self, key: &IdempotencyKey) -> CacheResult<bool> {
        let hit = self.store.exists(key.as_str()).await?;
        debug!(key = %key, hit, "idempotency check");
        Ok(hit)
    }

    /// Record that the side effect behind `key` happened.
    pub async fn mark_done(&self, key: &IdempotencyKey) -> CacheResult<()> {
        self.store.set(key.as_str(), self.ttl).await?;
        debug!(key = %key, ttl_secs = self.ttl.as_secs(), "idempotency marker written");
        Ok(())
    }

    /// Check and mark in one step; `true` means the caller owns the key.
    pub async fn try_claim(&self, key: &IdempotencyKey) -> CacheResult<bool> {
        self.store.claim(key.as_str(), self.ttl).await
    }

    /// Give a claimed key back, e.g. after the side effect failed.
    pub async fn release(&self, key: &IdempotencyKey) -> CacheResult<()> {
        self.store.delete(key.as_str()).await
    }
}

impl Default for IdempotencyCache {
    fn default() -> Self {
        Self::in_memory(DEFAULT_TTL)
    }
}

impl fmt::Debug for IdempotencyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdempotencyCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
