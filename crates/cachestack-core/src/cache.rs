//! Unsynchronized cache with reentrancy detection.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::comparer::{ComparedKey, KeyComparer, NaturalEq};
use crate::error::CacheError;
use crate::traits::KeyedCache;

/// Single-threaded key/value cache.
///
/// `Cache` is `!Sync`: it is meant for one thread, or for use behind a
/// locking decorator. While a factory runs, the key it is computing is
/// recorded; any `try_get` or `get_or_create` issued on the same cache before
/// the factory returns fails with [`CacheError::Reentrancy`] naming that key.
/// `clear` and `entries` stay available inside a factory.
///
/// # Examples
///
/// ```
/// use cachestack_core::{Cache, KeyedCache};
///
/// let cache = Cache::new();
/// let value = cache.get_or_insert_with("answer", |_| 42).unwrap();
/// assert_eq!(value, 42);
/// assert_eq!(cache.try_get(&"answer").unwrap(), Some(42));
/// ```
pub struct Cache<K, V, C = NaturalEq> {
    comparer: C,
    entries: RefCell<HashMap<ComparedKey<K, C>, V>>,
    /// Key whose factory is currently running, if any.
    creating: RefCell<Option<K>>,
}

impl<K, V> Cache<K, V, NaturalEq> {
    /// Creates an empty cache comparing keys with their own `Eq`.
    pub fn new() -> Self {
        Self::with_comparer(NaturalEq)
    }
}

impl<K, V> Default for Cache<K, V, NaturalEq> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> Cache<K, V, C> {
    /// Creates an empty cache comparing keys with `comparer`.
    pub fn with_comparer(comparer: C) -> Self {
        Self {
            comparer,
            entries: RefCell::new(HashMap::new()),
            creating: RefCell::new(None),
        }
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns true if no entry is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl<K, V, C> Cache<K, V, C>
where
    K: fmt::Debug,
{
    fn check_reentrancy(&self) -> Result<(), CacheError> {
        match self.creating.borrow().as_ref() {
            Some(key) => {
                warn!(key = ?key, "Reentrant cache access from inside a factory");
                Err(CacheError::reentrancy(key))
            },
            None => Ok(()),
        }
    }
}

impl<K, V, C> KeyedCache<K, V> for Cache<K, V, C>
where
    K: Clone + fmt::Debug,
    V: Clone,
    C: KeyComparer<K> + Clone,
{
    fn try_get(&self, key: &K) -> Result<Option<V>, CacheError> {
        self.check_reentrancy()?;

        let lookup = ComparedKey::new(key.clone(), self.comparer.clone());
        Ok(self.entries.borrow().get(&lookup).cloned())
    }

    fn get_or_create<E, F>(&self, key: K, factory: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
        E: From<CacheError>,
    {
        self.check_reentrancy()?;

        let lookup = ComparedKey::new(key, self.comparer.clone());
        if let Some(value) = self.entries.borrow().get(&lookup) {
            return Ok(value.clone());
        }

        *self.creating.borrow_mut() = Some(lookup.key().clone());
        let result = {
            let _guard = CreatingGuard(&self.creating);
            factory(lookup.key())
        };

        match result {
            Ok(value) => {
                self.entries.borrow_mut().insert(lookup, value.clone());
                Ok(value)
            },
            Err(e) => {
                debug!(key = ?lookup.key(), "Factory failed, key left absent");
                Err(e)
            },
        }
    }

    fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    fn entries(&self) -> Vec<(K, V)> {
        self.entries
            .borrow()
            .iter()
            .map(|(key, value)| (key.key().clone(), value.clone()))
            .collect()
    }
}

impl<K, V, C> fmt::Debug for Cache<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("len", &self.entries.borrow().len())
            .field("creating", &self.creating.borrow().is_some())
            .finish()
    }
}

/// Clears the in-progress marker, also when the factory panics.
struct CreatingGuard<'a, K>(&'a RefCell<Option<K>>);

impl<K> Drop for CreatingGuard<'_, K> {
    fn drop(&mut self) {
        *self.0.borrow_mut() = None;
    }
}
