//! Lock-striped concurrent cache with per-key single flight.
//!
//! The key space is partitioned across segments by hash; each segment is a
//! `parking_lot::Mutex` around a map from key to [`OnceSlot`]. A segment lock
//! is held only for map bookkeeping, never while a factory runs, so distinct
//! keys proceed in parallel and the slot serializes callers of the same key.

use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, RandomState};
use std::sync::Arc;

use cachestack_core::{CacheError, ComparedKey, KeyComparer, KeyedCache, NaturalEq};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::slot::{Force, OnceSlot};

/// Default number of lock stripes.
pub const DEFAULT_SEGMENTS: usize = 16;

type Segment<K, V, C> = Mutex<HashMap<ComparedKey<K, C>, Arc<OnceSlot<V>>>>;

/// Thread-safe cache where each key is computed at most once at a time.
///
/// - Concurrent `get_or_create` calls for the same key share one factory run;
///   the others block until it finishes and receive its value. If it fails,
///   the key stays absent and one of the waiters runs its own factory.
/// - `try_get` on a key that is being computed waits for the value.
/// - A factory that calls back into the cache for the key it is computing
///   gets [`CacheError::Reentrancy`] instead of deadlocking.
/// - `clear` also drops keys still being computed. Their value goes back to
///   the callers already waiting on it and is never stored.
///
/// # Examples
///
/// ```
/// use cachestack_core::KeyedCache;
/// use cachestack_sync::ConcurrentCache;
///
/// let cache = ConcurrentCache::new();
/// let len = cache.get_or_insert_with("config", |key| key.len()).unwrap();
/// assert_eq!(len, 6);
/// ```
pub struct ConcurrentCache<K, V, C = NaturalEq> {
    comparer: C,
    hasher: RandomState,
    segments: Box<[Segment<K, V, C>]>,
}

impl<K, V> ConcurrentCache<K, V, NaturalEq> {
    /// Creates a cache with [`DEFAULT_SEGMENTS`] stripes and natural key equality.
    pub fn new() -> Self {
        Self::with_comparer(NaturalEq)
    }

    /// Creates a cache with `segments` stripes (rounded up to a power of two).
    pub fn with_segments(segments: usize) -> Self {
        Self::with_segments_and_comparer(segments, NaturalEq)
    }
}

impl<K, V> Default for ConcurrentCache<K, V, NaturalEq> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> ConcurrentCache<K, V, C> {
    /// Creates a cache with [`DEFAULT_SEGMENTS`] stripes and the given comparer.
    pub fn with_comparer(comparer: C) -> Self {
        Self::with_segments_and_comparer(DEFAULT_SEGMENTS, comparer)
    }

    /// Creates a cache with `segments` stripes and the given comparer.
    pub fn with_segments_and_comparer(segments: usize, comparer: C) -> Self {
        let count = segments.max(1).next_power_of_two();
        Self {
            comparer,
            hasher: RandomState::new(),
            segments: (0..count).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    /// Returns the number of lock stripes.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Returns the number of keys holding a computed value.
    pub fn len(&self) -> usize {
        self.segments
            .iter()
            .map(|segment| {
                segment
                    .lock()
                    .values()
                    .filter(|slot| slot.is_filled())
                    .count()
            })
            .sum()
    }

    /// Returns true if no key holds a computed value.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V, C> ConcurrentCache<K, V, C>
where
    C: KeyComparer<K> + Clone,
{
    fn segment(&self, key: &ComparedKey<K, C>) -> &Segment<K, V, C> {
        let hash = self.hasher.hash_one(key) as usize;
        &self.segments[hash & (self.segments.len() - 1)]
    }

    /// Returns the slot for `key`, inserting a vacant one if needed.
    fn slot_for(&self, key: ComparedKey<K, C>) -> Arc<OnceSlot<V>> {
        let mut segment = self.segment(&key).lock();
        Arc::clone(segment.entry(key).or_default())
    }

    /// Returns the slot for `key` without inserting.
    fn existing_slot(&self, key: ComparedKey<K, C>) -> Option<Arc<OnceSlot<V>>> {
        self.segment(&key).lock().get(&key).cloned()
    }

    /// Removes `slot` from the map if it is still stored under `key` and
    /// nobody has filled or claimed it.
    fn remove_if_vacant(&self, key: ComparedKey<K, C>, slot: &Arc<OnceSlot<V>>) {
        let mut segment = self.segment(&key).lock();
        let stored = segment
            .get(&key)
            .is_some_and(|current| Arc::ptr_eq(current, slot));
        if stored && slot.retire_if_vacant() {
            segment.remove(&key);
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.segments.iter().map(|segment| segment.lock().len()).sum()
    }
}

/// Drops a key's slot once its factory has failed or panicked, so failed
/// lookups do not accumulate vacant entries.
struct PruneVacant<'a, K, V, C>
where
    C: KeyComparer<K> + Clone,
    K: Clone,
{
    cache: &'a ConcurrentCache<K, V, C>,
    key: &'a K,
    slot: &'a Arc<OnceSlot<V>>,
}

impl<K, V, C> Drop for PruneVacant<'_, K, V, C>
where
    C: KeyComparer<K> + Clone,
    K: Clone,
{
    fn drop(&mut self) {
        if !self.slot.is_filled() {
            let key = ComparedKey::new(self.key.clone(), self.cache.comparer.clone());
            self.cache.remove_if_vacant(key, self.slot);
        }
    }
}

impl<K, V, C> KeyedCache<K, V> for ConcurrentCache<K, V, C>
where
    K: Clone + fmt::Debug,
    V: Clone,
    C: KeyComparer<K> + Clone,
{
    fn try_get(&self, key: &K) -> Result<Option<V>, CacheError> {
        match self.existing_slot(ComparedKey::new(key.clone(), self.comparer.clone())) {
            Some(slot) => slot.get(key),
            None => Ok(None),
        }
    }

    fn get_or_create<E, F>(&self, key: K, factory: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
        E: From<CacheError>,
    {
        let mut factory = factory;
        loop {
            let slot = self.slot_for(ComparedKey::new(key.clone(), self.comparer.clone()));
            let _prune = PruneVacant {
                cache: self,
                key: &key,
                slot: &slot,
            };
            match slot.force(&key, factory) {
                Force::Done(result) => {
                    if result.is_err() {
                        debug!(key = ?key, "Factory failed, key left absent");
                    }
                    return result;
                },
                // Cleared between lookup and claim: start over on a fresh slot.
                Force::Detached(unused) => factory = unused,
            }
        }
    }

    fn clear(&self) {
        let mut removed = 0;
        for segment in self.segments.iter() {
            // Slots in flight are detached too: their value reaches only the
            // callers already holding them.
            for (_, slot) in segment.lock().drain() {
                removed += usize::from(slot.retire());
            }
        }
        info!(removed, "Concurrent cache cleared");
    }

    fn entries(&self) -> Vec<(K, V)> {
        let mut snapshot = Vec::new();
        for segment in self.segments.iter() {
            let segment = segment.lock();
            snapshot.extend(
                segment
                    .iter()
                    .filter_map(|(key, slot)| slot.peek().map(|value| (key.key().clone(), value))),
            );
        }
        snapshot
    }
}

impl<K, V, C> fmt::Debug for ConcurrentCache<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentCache")
            .field("segments", &self.segments.len())
            .field("len", &self.len())
            .finish()
    }
}
