//! # Cachestack Sync
//!
//! Thread-safe caches and decorators built on the `cachestack-core` contract.
//!
//! ## Features
//!
//! - [`ConcurrentCache`]: lock-striped cache with per-key single flight
//! - [`LockingCacheDecorator`]: one reentrant lock around any cache
//! - [`LazyLockingCachingAdapter`]: coarse lock for bookkeeping only, factories
//!   run outside it
//! - [`InvalidationToken`] and [`InvalidationTokenBasedCacheDecorator`]:
//!   generation-based bulk invalidation
//!
//! ## Example
//!
//! ```
//! use cachestack_core::KeyedCache;
//! use cachestack_sync::{ConcurrentCache, InvalidationToken, InvalidationTokenBasedCacheDecorator, RevisionSource};
//!
//! let token = InvalidationToken::create_with_locking();
//! let cache = InvalidationTokenBasedCacheDecorator::new(ConcurrentCache::new(), &token);
//!
//! assert_eq!(cache.get_or_insert_with("answer", |_| 42).unwrap(), 42);
//! token.invalidate();
//! assert!(cache.entries().is_empty());
//! ```

pub mod concurrent;
pub mod invalidation;
pub mod lazy;
pub mod locking;
pub mod slot;

// Re-exports
pub use concurrent::{ConcurrentCache, DEFAULT_SEGMENTS};
pub use invalidation::{
    InvalidationToken, InvalidationTokenBasedCacheDecorator, LocalInvalidationToken, Revision,
    RevisionSource,
};
pub use lazy::{LazyLockingCachingAdapter, LazySlot};
pub use locking::LockingCacheDecorator;
pub use slot::{Force, OnceSlot};

// Re-export cachestack_core for consumers
pub use cachestack_core;
