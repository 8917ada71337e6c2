//! Idempotency store trait definition.

use crate::error::CacheResult;
use async_trait::async_trait;
use std::time::Duration;

/// Backing store for idempotency markers.
///
/// A marker is a key with an expiry; its presence means "this side effect
/// already happened". Implementations must tolerate concurrent calls for the
/// same key from handlers running in parallel. The in-process
/// [`InMemoryStore`](crate::InMemoryStore) is the reference backend; a
/// distributed store (Redis `SET NX PX`, for example) can implement the same
/// contract without callers changing.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Check whether an unexpired marker exists for `key`.
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Write (or refresh) the marker for `key`, expiring after `ttl`.
    async fn set(&self, key: &str, ttl: Duration) -> CacheResult<()>;

    /// Atomically write the marker unless an unexpired one exists.
    ///
    /// Returns `true` when this call created the marker. The default
    /// implementation is `exists` followed by `set` and is therefore NOT
    /// atomic: two concurrent callers can both see `true`. Backends with a
    /// native compare-and-set should override it.
    async fn claim(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        if self.exists(key).await? {
            return Ok(false);
        }
        self.set(key, ttl).await?;
        Ok(true)
    }

    /// Remove the marker for `key`, if any.
    async fn delete(&self, key: &str) -> CacheResult<()>;
}
