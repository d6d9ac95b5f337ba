//! A cache that stores nothing.

use std::marker::PhantomData;

use crate::error::CacheError;
use crate::traits::KeyedCache;

/// Null-object cache used when caching is disabled.
///
/// Every lookup misses, every `get_or_create` runs its factory, and the
/// result is handed back without being stored.
pub struct NullCache<K, V> {
    _marker: PhantomData<fn(K) -> V>,
}

impl<K, V> NullCache<K, V> {
    /// Creates a new NullCache.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<K, V> Default for NullCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> std::fmt::Debug for NullCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NullCache")
    }
}

impl<K, V> KeyedCache<K, V> for NullCache<K, V> {
    fn try_get(&self, _key: &K) -> Result<Option<V>, CacheError> {
        Ok(None)
    }

    fn get_or_create<E, F>(&self, key: K, factory: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
        E: From<CacheError>,
    {
        factory(&key)
    }

    fn clear(&self) {}

    fn entries(&self) -> Vec<(K, V)> {
        Vec::new()
    }

    fn is_null(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_factory_runs_every_time() {
        let cache = NullCache::<&str, u32>::new();
        let calls = Cell::new(0);

        for expected in 1..=3 {
            let value = cache
                .get_or_insert_with("k", |_| {
                    calls.set(calls.get() + 1);
                    calls.get()
                })
                .unwrap();
            assert_eq!(value, expected);
        }

        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_never_reports_entries() {
        let cache = NullCache::<&str, u32>::new();
        cache.get_or_insert_with("k", |_| 1).unwrap();

        assert_eq!(cache.try_get(&"k").unwrap(), None);
        assert!(cache.entries().is_empty());
        assert!(cache.is_null());
        cache.clear();
    }

    #[test]
    fn test_factory_error_passes_through() {
        let cache = NullCache::<&str, u32>::new();
        let result = cache.get_or_create("k", |_| Err(anyhow::anyhow!("boom")));
        assert_eq!(result.unwrap_err().to_string(), "boom");
    }
}
