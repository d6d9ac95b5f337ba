//! Decorator that clears its inner cache when a token is invalidated.

use std::fmt;

use cachestack_core::{CacheError, KeyedCache};
use parking_lot::Mutex;
use tracing::debug;

use super::token::{Revision, RevisionSource};

/// Binds a cache to an invalidation token.
///
/// The decorator remembers the last revision it saw. When the token has
/// advanced since, the next `try_get`/`get_or_create` clears the inner cache
/// before delegating. Clearing repeats until a revision read after the clear
/// is still current, so an `invalidate` racing with the clear is never lost.
///
/// `entries` on a stale decorator returns nothing and leaves the inner cache
/// untouched.
///
/// # Examples
///
/// ```
/// use cachestack_core::{Cache, KeyedCache};
/// use cachestack_sync::{InvalidationToken, InvalidationTokenBasedCacheDecorator, RevisionSource};
///
/// let token = InvalidationToken::create();
/// let cache = InvalidationTokenBasedCacheDecorator::new(Cache::new(), &token);
///
/// cache.get_or_insert_with("a", |_| 1).unwrap();
/// token.invalidate();
///
/// assert!(cache.entries().is_empty());
/// assert_eq!(cache.try_get(&"a").unwrap(), None);
/// ```
pub struct InvalidationTokenBasedCacheDecorator<C, T> {
    inner: C,
    token: T,
    seen: Mutex<Revision>,
}

impl<C, T: RevisionSource> InvalidationTokenBasedCacheDecorator<C, T> {
    /// Wraps `inner`, treating the token's current revision as already seen.
    pub fn new(inner: C, token: T) -> Self {
        let seen = Mutex::new(token.current());
        Self { inner, token, seen }
    }

    /// Returns the bound token.
    pub fn token(&self) -> &T {
        &self.token
    }

    /// Returns the wrapped cache.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Returns true if the token has not advanced since the last refresh.
    pub fn is_current(&self) -> bool {
        self.token.is_current(&self.seen.lock())
    }

    /// Clears `inner` until a post-clear revision is still current, then
    /// records that revision.
    fn clear_until_current<K, V>(&self)
    where
        C: KeyedCache<K, V>,
    {
        let mut rounds = 0u32;
        let revision = loop {
            let revision = self.token.current();
            self.inner.clear();
            rounds += 1;
            if self.token.is_current(&revision) {
                break revision;
            }
        };
        *self.seen.lock() = revision;
        debug!(rounds = rounds, revision = %revision, "Cleared cache for current revision");
    }

    fn refresh<K, V>(&self)
    where
        C: KeyedCache<K, V>,
    {
        if !self.is_current() {
            debug!("Invalidation token advanced, clearing cache");
            self.clear_until_current::<K, V>();
        }
    }
}

impl<C, T, K, V> KeyedCache<K, V> for InvalidationTokenBasedCacheDecorator<C, T>
where
    C: KeyedCache<K, V>,
    T: RevisionSource,
{
    fn try_get(&self, key: &K) -> Result<Option<V>, CacheError> {
        self.refresh::<K, V>();
        self.inner.try_get(key)
    }

    fn get_or_create<E, F>(&self, key: K, factory: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
        E: From<CacheError>,
    {
        self.refresh::<K, V>();
        self.inner.get_or_create(key, factory)
    }

    fn clear(&self) {
        self.clear_until_current::<K, V>();
    }

    fn entries(&self) -> Vec<(K, V)> {
        if self.is_current() {
            self.inner.entries()
        } else {
            Vec::new()
        }
    }
}

impl<C, T> fmt::Debug for InvalidationTokenBasedCacheDecorator<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationTokenBasedCacheDecorator")
            .field("seen", &*self.seen.lock())
            .finish_non_exhaustive()
    }
}
