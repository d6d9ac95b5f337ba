//! Lazy-locking adapter.
//!
//! A [`LockingCacheDecorator`] serializes every call, factory included. This
//! adapter keeps the coarse lock but stores one [`OnceSlot`] per key instead
//! of the value itself. Only the slot lookup/insert runs under the lock; the
//! slot is forced after the lock is released, so an expensive factory blocks
//! nobody except callers waiting on the same key.

use std::fmt;
use std::sync::Arc;

use cachestack_core::{CacheError, KeyedCache};

use crate::locking::LockingCacheDecorator;
use crate::slot::{Force, OnceSlot};

/// Value type stored by the cache underneath a [`LazyLockingCachingAdapter`].
pub type LazySlot<V> = Arc<OnceSlot<V>>;

/// Adapts a cache of lazy slots into a cache of values.
///
/// `C` is any `KeyedCache<K, LazySlot<V>>`, usually a plain `Cache`,
/// optionally wrapped in an invalidation decorator.
///
/// # Examples
///
/// ```
/// use cachestack_core::{Cache, KeyedCache};
/// use cachestack_sync::{LazyLockingCachingAdapter, LazySlot};
///
/// let cache = LazyLockingCachingAdapter::wrap(Cache::<&str, LazySlot<Option<u32>>>::new());
///
/// let value = cache.get_or_insert_with("missing", |_| None).unwrap();
/// assert_eq!(value, None);
/// assert_eq!(cache.try_get(&"missing").unwrap(), Some(None));
/// ```
pub struct LazyLockingCachingAdapter<C> {
    inner: LockingCacheDecorator<C>,
}

impl<C> LazyLockingCachingAdapter<C> {
    /// Creates the adapter over an existing locking decorator.
    pub fn new(inner: LockingCacheDecorator<C>) -> Self {
        Self { inner }
    }

    /// Wraps `cache` in a locking decorator and adapts it.
    pub fn wrap(cache: C) -> Self {
        Self::new(LockingCacheDecorator::new(cache))
    }

    /// Returns true if some thread currently holds the coarse lock.
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    /// Returns the locking decorator holding the slot cache.
    pub fn inner(&self) -> &LockingCacheDecorator<C> {
        &self.inner
    }
}

impl<C, K, V> KeyedCache<K, V> for LazyLockingCachingAdapter<C>
where
    C: KeyedCache<K, LazySlot<V>>,
    K: Clone + fmt::Debug,
    V: Clone,
{
    fn try_get(&self, key: &K) -> Result<Option<V>, CacheError> {
        match self.inner.try_get(key)? {
            Some(slot) => slot.get(key),
            None => Ok(None),
        }
    }

    fn get_or_create<E, F>(&self, key: K, factory: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
        E: From<CacheError>,
    {
        let slot = self
            .inner
            .get_or_insert_with(key.clone(), |_| Arc::new(OnceSlot::new()))?;

        // Lazy slots are dropped from the map on clear but never retired, so
        // a slot cleared after the lookup still computes for its holders.
        match slot.force(&key, factory) {
            Force::Done(result) => result,
            Force::Detached(factory) => factory(&key),
        }
    }

    fn clear(&self) {
        self.inner.clear();
    }

    fn entries(&self) -> Vec<(K, V)> {
        self.inner
            .entries()
            .into_iter()
            .filter_map(|(key, slot)| slot.peek().map(|value| (key, value)))
            .collect()
    }
}

impl<C> fmt::Debug for LazyLockingCachingAdapter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyLockingCachingAdapter")
            .field("inner", &self.inner)
            .finish()
    }
}
