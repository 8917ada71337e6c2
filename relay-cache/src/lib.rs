//! Idempotency cache for approval-relay.
//!
//! Handlers mark "this exact side effect already happened" under a
//! namespaced key with a fixed TTL, and check for the mark before acting
//! again. Redeliveries of the same logical event inside the TTL window are
//! suppressed; after expiry the key is eligible again.
//!
//! # Examples
//!
//! ```no_run
//! use relay_cache::*;
//!
//! # async fn example() -> CacheResult<()> {
//! let cache = IdempotencyCache::in_memory(DEFAULT_TTL);
//! let key = IdempotencyKey::new("qr", ["I1", "N1"]);
//!
//! if !cache.is_done(&key).await? {
//!     // perform the side effect, then:
//!     cache.mark_done(&key).await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The backing store is a trait object so a distributed store can replace
//! [`InMemoryStore`] without touching handlers.

pub mod error;
pub mod idempotency;
pub mod memory;
pub mod traits;

pub use error::{CacheError, CacheResult};
pub use idempotency::{DEFAULT_TTL, IdempotencyCache, IdempotencyKey};
pub use memory::{CacheEntryStatus, CacheStatus, InMemoryStore};
pub use traits::IdempotencyStore;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{CacheError, CacheResult};
    pub use crate::idempotency::{DEFAULT_TTL, IdempotencyCache, IdempotencyKey};
    pub use crate::memory::InMemoryStore;
    pub use crate::traits::IdempotencyStore;
}
