//! Composition root for cache stacks.
//!
//! Each function stacks the building blocks in a fixed order; none adds
//! behaviour of its own. The invalidation decorator always sits directly
//! above the storage cache, inside any lock.

use std::sync::Arc;

use cachestack_core::{Cache, CacheError, NaturalEq, NullCache};
use cachestack_sync::{
    ConcurrentCache, InvalidationToken, InvalidationTokenBasedCacheDecorator,
    LazyLockingCachingAdapter, LazySlot, LockingCacheDecorator, RevisionSource,
};
use tracing::debug;

use crate::settings::{CacheSettings, SynchronizationMode};
use crate::shared::{KeyEquality, SharedCache, Stack};

/// `Cache` bound to an invalidation token.
pub type InvalidatingCache<K, V, T, C = NaturalEq> =
    InvalidationTokenBasedCacheDecorator<Cache<K, V, C>, T>;

/// `ConcurrentCache` bound to an invalidation token.
pub type InvalidatingConcurrentCache<K, V, T, C = NaturalEq> =
    InvalidationTokenBasedCacheDecorator<ConcurrentCache<K, V, C>, T>;

/// Coarse-locked `Cache`.
pub type LockingCache<K, V, C = NaturalEq> = LockingCacheDecorator<Cache<K, V, C>>;

/// Coarse-locked `Cache` with the invalidation decorator inside the lock.
pub type InvalidatingLockingCache<K, V, T, C = NaturalEq> =
    LockingCacheDecorator<InvalidatingCache<K, V, T, C>>;

/// Lazy-locking adapter over a `Cache` of slots.
pub type LazyLockingCache<K, V, C = NaturalEq> = LazyLockingCachingAdapter<Cache<K, LazySlot<V>, C>>;

/// Lazy-locking adapter with the invalidation decorator between the lock and
/// the slot cache.
pub type InvalidatingLazyLockingCache<K, V, T, C = NaturalEq> =
    LazyLockingCachingAdapter<InvalidatingCache<K, LazySlot<V>, T, C>>;

/// Builds ready-made cache stacks.
///
/// # Examples
///
/// ```
/// use cachestack::{CacheFactory, KeyedCache};
///
/// let cache = CacheFactory::create_with_lazy_locking::<String, usize>();
/// let len = cache.get_or_insert_with("hello".to_string(), |key| key.len()).unwrap();
/// assert_eq!(len, 5);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheFactory;

impl CacheFactory {
    /// Unsynchronized cache.
    pub fn create<K, V>() -> Cache<K, V> {
        Cache::new()
    }

    /// Unsynchronized cache with a custom comparer.
    pub fn create_with_comparer<K, V, C>(comparer: C) -> Cache<K, V, C> {
        Cache::with_comparer(comparer)
    }

    /// Unsynchronized cache cleared whenever `token` is invalidated.
    pub fn create_with_token<K, V, T: RevisionSource>(token: T) -> InvalidatingCache<K, V, T> {
        InvalidationTokenBasedCacheDecorator::new(Cache::new(), token)
    }

    /// Unsynchronized cache with a custom comparer, bound to `token`.
    pub fn create_with_token_and_comparer<K, V, T: RevisionSource, C>(
        token: T,
        comparer: C,
    ) -> InvalidatingCache<K, V, T, C> {
        InvalidationTokenBasedCacheDecorator::new(Cache::with_comparer(comparer), token)
    }

    /// Lock-striped concurrent cache.
    pub fn create_with_synchronization<K, V>() -> ConcurrentCache<K, V> {
        ConcurrentCache::new()
    }

    /// Concurrent cache with a custom comparer.
    pub fn create_with_synchronization_and_comparer<K, V, C>(
        comparer: C,
    ) -> ConcurrentCache<K, V, C> {
        ConcurrentCache::with_comparer(comparer)
    }

    /// Concurrent cache bound to `token`.
    pub fn create_with_synchronization_and_token<K, V, T: RevisionSource>(
        token: T,
    ) -> InvalidatingConcurrentCache<K, V, T> {
        InvalidationTokenBasedCacheDecorator::new(ConcurrentCache::new(), token)
    }

    /// Concurrent cache with a custom comparer, bound to `token`.
    pub fn create_with_synchronization_token_and_comparer<K, V, T: RevisionSource, C>(
        token: T,
        comparer: C,
    ) -> InvalidatingConcurrentCache<K, V, T, C> {
        InvalidationTokenBasedCacheDecorator::new(ConcurrentCache::with_comparer(comparer), token)
    }

    /// `Cache` behind one reentrant lock.
    pub fn create_with_locking<K, V>() -> LockingCache<K, V> {
        LockingCacheDecorator::new(Cache::new())
    }

    /// Locked cache with a custom comparer.
    pub fn create_with_locking_and_comparer<K, V, C>(comparer: C) -> LockingCache<K, V, C> {
        LockingCacheDecorator::new(Cache::with_comparer(comparer))
    }

    /// Locked cache bound to `token`.
    pub fn create_with_locking_and_token<K, V, T: RevisionSource>(
        token: T,
    ) -> InvalidatingLockingCache<K, V, T> {
        LockingCacheDecorator::new(Self::create_with_token(token))
    }

    /// Locked cache with a custom comparer, bound to `token`.
    pub fn create_with_locking_token_and_comparer<K, V, T: RevisionSource, C>(
        token: T,
        comparer: C,
    ) -> InvalidatingLockingCache<K, V, T, C> {
        LockingCacheDecorator::new(Self::create_with_token_and_comparer(token, comparer))
    }

    /// Lazy-locking cache: the lock covers slot bookkeeping only.
    pub fn create_with_lazy_locking<K, V>() -> LazyLockingCache<K, V> {
        LazyLockingCachingAdapter::wrap(Cache::new())
    }

    /// Lazy-locking cache with a custom comparer.
    pub fn create_with_lazy_locking_and_comparer<K, V, C>(
        comparer: C,
    ) -> LazyLockingCache<K, V, C> {
        LazyLockingCachingAdapter::wrap(Cache::with_comparer(comparer))
    }

    /// Lazy-locking cache bound to `token`.
    pub fn create_with_lazy_locking_and_token<K, V, T: RevisionSource>(
        token: T,
    ) -> InvalidatingLazyLockingCache<K, V, T> {
        LazyLockingCachingAdapter::wrap(Self::create_with_token(token))
    }

    /// Lazy-locking cache with a custom comparer, bound to `token`.
    pub fn create_with_lazy_locking_token_and_comparer<K, V, T: RevisionSource, C>(
        token: T,
        comparer: C,
    ) -> InvalidatingLazyLockingCache<K, V, T, C> {
        LazyLockingCachingAdapter::wrap(Self::create_with_token_and_comparer(token, comparer))
    }

    /// Cache that stores nothing.
    pub fn create_null<K, V>() -> NullCache<K, V> {
        NullCache::new()
    }

    /// Builds the thread-safe stack selected by `settings` for string-like keys.
    ///
    /// `ignoreCase` selects ASCII case-insensitive key comparison. When
    /// `invalidation` is set, a fresh token is bound and exposed through
    /// [`SharedCache::invalidation_token`].
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidSettings` if the settings fail validation.
    pub fn from_settings<K, V>(
        settings: &CacheSettings,
    ) -> Result<SharedCache<K, V, KeyEquality>, CacheError> {
        let comparer = if settings.ignore_case() {
            KeyEquality::IgnoreAsciiCase
        } else {
            KeyEquality::Natural
        };
        Self::build_shared(settings, comparer)
    }

    /// Builds the stack selected by `settings` with an explicit comparer.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidSettings` if the settings fail validation
    /// or request `ignoreCase`, which only [`from_settings`](Self::from_settings)
    /// can honour.
    pub fn from_settings_with_comparer<K, V, C>(
        settings: &CacheSettings,
        comparer: C,
    ) -> Result<SharedCache<K, V, C>, CacheError> {
        if settings.ignore_case() {
            return Err(CacheError::invalid_settings(
                "ignoreCase cannot be combined with an explicit comparer",
            ));
        }
        Self::build_shared(settings, comparer)
    }

    fn build_shared<K, V, C>(
        settings: &CacheSettings,
        comparer: C,
    ) -> Result<SharedCache<K, V, C>, CacheError> {
        settings.validate()?;

        let token = (settings.invalidation() && settings.mode() != SynchronizationMode::Disabled)
            .then(|| Arc::new(InvalidationToken::create_with_locking()));

        let stack = match (settings.mode(), token.clone()) {
            (SynchronizationMode::Disabled, _) => Stack::Disabled(NullCache::new()),
            (SynchronizationMode::CoarseLock, None) => {
                Stack::CoarseLock(Self::create_with_locking_and_comparer(comparer))
            },
            (SynchronizationMode::CoarseLock, Some(token)) => Stack::CoarseLockWithToken(
                Self::create_with_locking_token_and_comparer(token, comparer),
            ),
            (SynchronizationMode::Concurrent, None) => Stack::Concurrent(
                ConcurrentCache::with_segments_and_comparer(settings.segments(), comparer),
            ),
            (SynchronizationMode::Concurrent, Some(token)) => {
                Stack::ConcurrentWithToken(InvalidationTokenBasedCacheDecorator::new(
                    ConcurrentCache::with_segments_and_comparer(settings.segments(), comparer),
                    token,
                ))
            },
            (SynchronizationMode::LazyLock, None) => {
                Stack::LazyLock(Self::create_with_lazy_locking_and_comparer(comparer))
            },
            (SynchronizationMode::LazyLock, Some(token)) => Stack::LazyLockWithToken(
                Self::create_with_lazy_locking_token_and_comparer(token, comparer),
            ),
        };

        debug!(
            mode = ?settings.mode(),
            segments = settings.segments(),
            invalidation = token.is_some(),
            "Built cache stack from settings"
        );

        Ok(SharedCache::new(stack, token))
    }
}
