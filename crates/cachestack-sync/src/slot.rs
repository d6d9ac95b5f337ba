//! One-shot value slot shared by racing callers.
//!
//! A slot starts vacant. The first caller to force it records its thread as
//! the owner and runs its factory outside the slot's lock; later callers park
//! on a condition variable until the owner publishes. A failed factory puts
//! the slot back to vacant and wakes everyone, so the next waiter takes over
//! with its own factory. The slot never holds on to a factory.

use std::fmt;
use std::thread::{self, ThreadId};

use cachestack_core::CacheError;
use parking_lot::{Condvar, Mutex};

enum SlotState<V> {
    Vacant,
    Computing(ThreadId),
    Filled(V),
}

struct SlotInner<V> {
    state: SlotState<V>,
    /// Set once the slot has been removed from its map.
    detached: bool,
}

/// What a caller sees when it looks at a slot.
enum Observed<V> {
    Ready(V),
    OwnComputation,
    Busy,
    Vacant,
    Detached,
}

/// Outcome of [`OnceSlot::force`].
pub enum Force<V, E, F> {
    /// The slot produced a value, or the factory (or reentrancy check) failed.
    Done(Result<V, E>),
    /// The slot was detached from its map before this caller could claim it;
    /// the unused factory is handed back so the caller can look up a fresh slot.
    Detached(F),
}

/// Thread-safe compute-once cell.
///
/// Used as the per-key entry of `ConcurrentCache` and as the lazy thunk
/// stored by `LazyLockingCachingAdapter`. The `Filled` state doubles as the
/// value wrapper: a filled slot holding `None` is distinguishable from a slot
/// that was never computed.
pub struct OnceSlot<V> {
    inner: Mutex<SlotInner<V>>,
    ready: Condvar,
}

impl<V> OnceSlot<V> {
    /// Creates a vacant slot.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SlotInner {
                state: SlotState::Vacant,
                detached: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Returns true if the slot holds a value.
    pub fn is_filled(&self) -> bool {
        matches!(self.inner.lock().state, SlotState::Filled(_))
    }

    /// Marks the slot as removed from its map. Returns true if it held a
    /// value.
    ///
    /// A detached vacant slot turns away new callers with
    /// [`Force::Detached`]. A detached filled slot keeps serving its value to
    /// callers that already hold it, and a computation in flight still
    /// publishes to its own caller and the waiters already parked on it.
    pub fn retire(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.detached = true;
        matches!(inner.state, SlotState::Filled(_))
    }

    /// Detaches the slot only if it is vacant. Returns true if it did.
    pub fn retire_if_vacant(&self) -> bool {
        let mut inner = self.inner.lock();
        if !matches!(inner.state, SlotState::Vacant) {
            return false;
        }
        inner.detached = true;
        true
    }

    /// Resets the slot to vacant and wakes every waiter.
    fn abandon(&self) {
        let mut inner = self.inner.lock();
        inner.state = SlotState::Vacant;
        drop(inner);
        self.ready.notify_all();
    }
}

impl<V: Clone> OnceSlot<V> {
    fn observe(inner: &SlotInner<V>, me: ThreadId) -> Observed<V> {
        match &inner.state {
            SlotState::Filled(value) => Observed::Ready(value.clone()),
            SlotState::Computing(owner) if *owner == me => Observed::OwnComputation,
            SlotState::Computing(_) => Observed::Busy,
            SlotState::Vacant if inner.detached => Observed::Detached,
            SlotState::Vacant => Observed::Vacant,
        }
    }

    /// Returns the value without waiting; `None` unless the slot is filled.
    pub fn peek(&self) -> Option<V> {
        match &self.inner.lock().state {
            SlotState::Filled(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Returns the value, waiting while another thread computes it.
    ///
    /// Returns `Ok(None)` for a vacant slot.
    ///
    /// # Errors
    ///
    /// - `CacheError::Reentrancy` if the calling thread is the one computing
    pub fn get<K: fmt::Debug + ?Sized>(&self, key: &K) -> Result<Option<V>, CacheError> {
        let me = thread::current().id();
        let mut inner = self.inner.lock();

        loop {
            match Self::observe(&inner, me) {
                Observed::Ready(value) => return Ok(Some(value)),
                Observed::OwnComputation => return Err(CacheError::reentrancy(key)),
                Observed::Busy => self.ready.wait(&mut inner),
                Observed::Vacant | Observed::Detached => return Ok(None),
            }
        }
    }

    /// Returns the value, running `factory` if this caller is the first to
    /// find the slot vacant.
    ///
    /// The slot's lock is released while the factory runs. Callers arriving
    /// meanwhile block until it finishes, then either share its value or, if
    /// it failed, race to run their own factory.
    pub fn force<K, E, F>(&self, key: &K, factory: F) -> Force<V, E, F>
    where
        K: fmt::Debug + ?Sized,
        F: FnOnce(&K) -> Result<V, E>,
        E: From<CacheError>,
    {
        let me = thread::current().id();
        let mut inner = self.inner.lock();

        loop {
            match Self::observe(&inner, me) {
                Observed::Ready(value) => return Force::Done(Ok(value)),
                Observed::OwnComputation => {
                    return Force::Done(Err(CacheError::reentrancy(key).into()));
                },
                Observed::Busy => self.ready.wait(&mut inner),
                Observed::Detached => return Force::Detached(factory),
                Observed::Vacant => break,
            }
        }

        inner.state = SlotState::Computing(me);
        drop(inner);

        let guard = AbandonOnUnwind { slot: self };
        let result = factory(key);
        std::mem::forget(guard);

        let mut inner = self.inner.lock();
        inner.state = match &result {
            Ok(value) => SlotState::Filled(value.clone()),
            Err(_) => SlotState::Vacant,
        };
        drop(inner);
        self.ready.notify_all();

        Force::Done(result)
    }
}

impl<V> Default for OnceSlot<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for OnceSlot<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        let state = match inner.state {
            SlotState::Vacant => "vacant",
            SlotState::Computing(_) => "computing",
            SlotState::Filled(_) => "filled",
        };
        f.debug_struct("OnceSlot")
            .field("state", &state)
            .field("detached", &inner.detached)
            .finish()
    }
}

/// Keeps waiters from parking forever when a factory panics.
struct AbandonOnUnwind<'a, V> {
    slot: &'a OnceSlot<V>,
}

impl<V> Drop for AbandonOnUnwind<'_, V> {
    fn drop(&mut self) {
        self.slot.abandon();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn done<V, E, F>(outcome: Force<V, E, F>) -> Result<V, E> {
        match outcome {
            Force::Done(result) => result,
            Force::Detached(_) => panic!("slot unexpectedly detached"),
        }
    }

    #[test]
    fn test_force_fills_once() {
        let slot = OnceSlot::new();
        let calls = AtomicU32::new(0);

        let first = done(slot.force("k", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, CacheError>(1)
        }));
        let second = done(slot.force("k", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, CacheError>(2)
        }));

        assert_eq!(first.unwrap(), 1);
        assert_eq!(second.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(slot.is_filled());
    }

    #[test]
    fn test_failure_returns_to_vacant() {
        let slot = OnceSlot::<u32>::new();

        let failed = done(slot.force("k", |_| Err(CacheError::invalid_settings("nope"))));
        assert!(failed.is_err());
        assert_eq!(slot.peek(), None);
        assert_eq!(slot.get("k").unwrap(), None);

        let retried = done(slot.force("k", |_| Ok::<_, CacheError>(3)));
        assert_eq!(retried.unwrap(), 3);
    }

    #[test]
    fn test_filled_none_is_not_vacant() {
        let slot = OnceSlot::<Option<u32>>::new();
        done(slot.force("k", |_| Ok::<_, CacheError>(None))).unwrap();

        assert!(slot.is_filled());
        assert_eq!(slot.get("k").unwrap(), Some(None));
    }

    #[test]
    fn test_same_thread_reentry_is_detected() {
        let slot = OnceSlot::<u32>::new();

        let result = done(slot.force("k", |key| {
            slot.get(key)?;
            Ok::<_, CacheError>(1)
        }));

        assert_eq!(result.unwrap_err(), CacheError::reentrancy("k"));
        assert!(!slot.is_filled());
    }

    #[test]
    fn test_detached_vacant_slot_returns_factory() {
        let slot = OnceSlot::<u32>::new();
        assert!(!slot.retire());

        match slot.force("k", |_| Ok::<_, CacheError>(1)) {
            Force::Detached(factory) => assert_eq!(factory("k").unwrap(), 1),
            Force::Done(_) => panic!("expected detached"),
        }
    }

    #[test]
    fn test_retire_if_vacant_skips_filled_and_computing() {
        let slot = OnceSlot::<u32>::new();

        let nested = done(slot.force("k", |_| {
            Ok::<_, CacheError>(u32::from(slot.retire_if_vacant()))
        }));
        assert_eq!(nested.unwrap(), 0);
        assert!(!slot.retire_if_vacant());

        let vacant = OnceSlot::<u32>::new();
        assert!(vacant.retire_if_vacant());
        assert!(matches!(vacant.force("k", |_| Ok::<_, CacheError>(1)), Force::Detached(_)));
    }

    #[test]
    fn test_retired_computation_still_reaches_its_caller() {
        let slot = OnceSlot::<u32>::new();

        let value = done(slot.force("k", |_| {
            assert!(!slot.retire());
            Ok::<_, CacheError>(4)
        }));

        assert_eq!(value.unwrap(), 4);
        assert_eq!(slot.peek(), Some(4));
        assert!(slot.retire());
    }

    #[test]
    fn test_waiter_receives_winner_value() {
        let slot = OnceSlot::<u32>::new();
        let started = Barrier::new(2);
        let calls = AtomicU32::new(0);

        std::thread::scope(|s| {
            s.spawn(|| {
                done(slot.force("k", |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    started.wait();
                    std::thread::sleep(Duration::from_millis(50));
                    Ok::<_, CacheError>(10)
                }))
                .unwrap()
            });

            started.wait();
            assert_eq!(slot.get("k").unwrap(), Some(10));
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_factory_releases_waiters() {
        let slot = OnceSlot::<u32>::new();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = slot.force("k", |_| -> Result<u32, CacheError> { panic!("factory panicked") });
        }));

        assert!(outcome.is_err());
        assert_eq!(slot.get("k").unwrap(), None);
        assert_eq!(done(slot.force("k", |_| Ok::<_, CacheError>(5))).unwrap(), 5);
    }
}
