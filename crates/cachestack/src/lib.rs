//! # Cachestack
//!
//! Composable keyed caches with get-or-create semantics.
//!
//! Every cache implements [`KeyedCache`]. Stacks are assembled from:
//!
//! - [`Cache`] - unsynchronized storage with reentrancy detection
//! - [`ConcurrentCache`] - lock-striped storage with per-key single flight
//! - [`NullCache`] - stores nothing
//! - [`LockingCacheDecorator`] - one reentrant lock around any cache
//! - [`LazyLockingCachingAdapter`] - coarse lock for bookkeeping, factories
//!   outside it
//! - [`InvalidationTokenBasedCacheDecorator`] - cleared when its token advances
//!
//! [`CacheFactory`] builds the usual stacks, either with typed constructors or
//! from [`CacheSettings`] loaded from JSON or YAML. [`MeteredCache`] records
//! hits and misses through the `metrics` crate.
//!
//! ## Example
//!
//! ```
//! use cachestack::{CacheFactory, InvalidationToken, KeyedCache, RevisionSource};
//!
//! let token = InvalidationToken::create_with_locking();
//! let cache = CacheFactory::create_with_synchronization_and_token::<String, u64, _>(&token);
//!
//! let value = cache
//!     .get_or_create("answer".to_string(), |_| Ok::<_, anyhow::Error>(42))
//!     .unwrap();
//! assert_eq!(value, 42);
//!
//! token.invalidate();
//! assert!(cache.entries().is_empty());
//! ```

pub mod factory;
pub mod metrics;
pub mod settings;
pub mod shared;

// Re-exports
pub use factory::{
    CacheFactory, InvalidatingCache, InvalidatingConcurrentCache, InvalidatingLazyLockingCache,
    InvalidatingLockingCache, LazyLockingCache, LockingCache,
};
pub use crate::metrics::{CacheMetrics, MeteredCache, register_cache_metrics};
pub use settings::{CacheSettings, CacheSettingsBuilder, SynchronizationMode};
pub use shared::{KeyEquality, SharedCache};

pub use cachestack_core::{
    Cache, CacheError, ComparedKey, IgnoreAsciiCase, KeyComparer, KeyedCache, NaturalEq,
    NullCache,
};
pub use cachestack_sync::{
    ConcurrentCache, InvalidationToken, InvalidationTokenBasedCacheDecorator,
    LazyLockingCachingAdapter, LazySlot, LocalInvalidationToken, LockingCacheDecorator, OnceSlot,
    Revision, RevisionSource,
};
