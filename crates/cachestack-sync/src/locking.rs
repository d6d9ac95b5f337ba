//! Coarse-lock decorator.

use cachestack_core::{CacheError, KeyedCache};
use parking_lot::ReentrantMutex;

/// Makes any cache thread-safe by serializing every operation behind one
/// reentrant lock.
///
/// The lock is held for the whole operation, factory included, so a slow
/// factory blocks every other caller, even for unrelated keys. The lock is
/// reentrant: a factory calling back into the decorator on its own thread
/// re-acquires it and reaches the inner cache, whose reentrancy check then
/// reports the error instead of the thread deadlocking on itself.
///
/// # Examples
///
/// ```
/// use cachestack_core::{Cache, KeyedCache};
/// use cachestack_sync::LockingCacheDecorator;
///
/// let cache = LockingCacheDecorator::new(Cache::new());
/// std::thread::scope(|s| {
///     s.spawn(|| cache.get_or_insert_with(1, |_| "one").unwrap());
/// });
/// assert_eq!(cache.try_get(&1).unwrap(), Some("one"));
/// ```
pub struct LockingCacheDecorator<C> {
    inner: ReentrantMutex<C>,
}

impl<C> LockingCacheDecorator<C> {
    /// Wraps `inner` behind a reentrant lock.
    pub fn new(inner: C) -> Self {
        Self {
            inner: ReentrantMutex::new(inner),
        }
    }

    /// Returns true if some thread currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    /// Runs `f` with the lock held.
    pub fn with_lock<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        let inner = self.inner.lock();
        f(&inner)
    }

    /// Unwraps the decorator, returning the inner cache.
    pub fn into_inner(self) -> C {
        self.inner.into_inner()
    }
}

impl<C, K, V> KeyedCache<K, V> for LockingCacheDecorator<C>
where
    C: KeyedCache<K, V>,
{
    fn try_get(&self, key: &K) -> Result<Option<V>, CacheError> {
        self.with_lock(|inner| inner.try_get(key))
    }

    fn get_or_create<E, F>(&self, key: K, factory: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
        E: From<CacheError>,
    {
        self.with_lock(|inner| inner.get_or_create(key, factory))
    }

    fn clear(&self) {
        self.with_lock(|inner| inner.clear())
    }

    fn entries(&self) -> Vec<(K, V)> {
        self.with_lock(|inner| inner.entries())
    }
}

impl<C> std::fmt::Debug for LockingCacheDecorator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockingCacheDecorator")
            .field("locked", &self.is_locked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachestack_core::Cache;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Duration;

    #[test]
    fn test_delegates_to_inner_cache() {
        let cache = LockingCacheDecorator::new(Cache::new());
        let calls = AtomicU32::new(0);

        for _ in 0..2 {
            cache
                .get_or_insert_with("key1", |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    10
                })
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.entries(), vec![("key1", 10)]);

        cache.clear();
        assert_eq!(cache.try_get(&"key1").unwrap(), None);
    }

    #[test]
    fn test_lock_held_while_factory_runs() {
        let cache = LockingCacheDecorator::new(Cache::<&str, bool>::new());

        let held = cache
            .get_or_insert_with("key1", |_| cache.is_locked())
            .unwrap();

        assert!(held);
        assert!(!cache.is_locked());
    }

    #[test]
    fn test_reentry_reaches_inner_check_instead_of_deadlocking() {
        let cache = LockingCacheDecorator::new(Cache::<&str, u32>::new());

        let result = cache.get_or_create("key1", |_| {
            cache.try_get(&"key2")?;
            Ok::<u32, CacheError>(1)
        });

        assert_eq!(result.unwrap_err(), CacheError::reentrancy(&"key1"));
        assert!(!cache.is_locked());
    }

    #[test]
    fn test_factory_serializes_unrelated_keys() {
        let cache = LockingCacheDecorator::new(Cache::<&str, u32>::new());
        let factory_running = Barrier::new(2);
        let slow_done = AtomicBool::new(false);

        std::thread::scope(|s| {
            s.spawn(|| {
                cache.get_or_insert_with("slow", |_| {
                    factory_running.wait();
                    std::thread::sleep(Duration::from_millis(50));
                    slow_done.store(true, Ordering::SeqCst);
                    1
                })
            });

            factory_running.wait();
            cache.get_or_insert_with("fast", |_| 2).unwrap();
            assert!(slow_done.load(Ordering::SeqCst));
        });
    }
}
