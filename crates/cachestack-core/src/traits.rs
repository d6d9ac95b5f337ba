//! The keyed cache contract.

use crate::error::CacheError;

/// A keyed store with get-or-create semantics.
///
/// This trait abstracts over every cache and decorator in Cachestack, so call
/// sites can take a cache without knowing how (or whether) it synchronizes.
///
/// All operations take `&self`. Implementations use interior mutability, which
/// also means a factory may capture the cache it runs in; the implementations
/// detect such reentrant calls and report [`CacheError::Reentrancy`] instead of
/// deadlocking or corrupting their state.
///
/// # Implementors
///
/// - `Cache` - unsynchronized, single-threaded
/// - `NullCache` - stores nothing
/// - `ConcurrentCache` - lock-striped with per-key single flight
/// - `LockingCacheDecorator`, `InvalidationTokenBasedCacheDecorator`,
///   `LazyLockingCachingAdapter` - decorators over another cache
pub trait KeyedCache<K, V> {
    /// Returns the value stored for `key`, if any.
    ///
    /// # Errors
    ///
    /// - `CacheError::Reentrancy` if called from a factory that this cache is
    ///   currently running and the implementation forbids it
    fn try_get(&self, key: &K) -> Result<Option<V>, CacheError>;

    /// Returns the value stored for `key`, invoking `factory` to create it if
    /// it is absent.
    ///
    /// The factory is called at most once per call and dropped as soon as it
    /// returns. If it fails, its error is returned unchanged and the key
    /// stays absent, so the next call starts a fresh attempt.
    ///
    /// # Errors
    ///
    /// - the factory's own error
    /// - `CacheError::Reentrancy` (converted into `E`) on a reentrant call
    fn get_or_create<E, F>(&self, key: K, factory: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
        E: From<CacheError>;

    /// Removes every entry.
    fn clear(&self);

    /// Returns a point-in-time snapshot of the stored entries.
    ///
    /// Entries whose value is still being computed are not included.
    fn entries(&self) -> Vec<(K, V)>;

    /// Returns true only for the null-object cache.
    fn is_null(&self) -> bool {
        false
    }

    /// Like [`get_or_create`](Self::get_or_create) for a factory that cannot fail.
    fn get_or_insert_with<F>(&self, key: K, factory: F) -> Result<V, CacheError>
    where
        F: FnOnce(&K) -> V,
    {
        self.get_or_create(key, |key| Ok::<V, CacheError>(factory(key)))
    }
}
