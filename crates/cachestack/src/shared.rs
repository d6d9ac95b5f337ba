//! Settings-selected, thread-safe cache stack.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use cachestack_core::{
    CacheError, IgnoreAsciiCase, KeyComparer, KeyedCache, NaturalEq, NullCache,
};
use cachestack_sync::{ConcurrentCache, InvalidationToken};

use crate::factory::{
    InvalidatingConcurrentCache, InvalidatingLazyLockingCache, InvalidatingLockingCache,
    LazyLockingCache, LockingCache,
};

/// Key comparison chosen at runtime from `ignoreCase`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyEquality {
    /// The key's own `Hash`/`Eq`.
    #[default]
    Natural,
    /// ASCII case-insensitive string comparison.
    IgnoreAsciiCase,
}

impl<K: Hash + Eq + AsRef<str> + ?Sized> KeyComparer<K> for KeyEquality {
    fn hash_key<H: Hasher>(&self, key: &K, state: &mut H) {
        match self {
            Self::Natural => NaturalEq.hash_key(key, state),
            Self::IgnoreAsciiCase => IgnoreAsciiCase.hash_key(key, state),
        }
    }

    fn keys_equal(&self, a: &K, b: &K) -> bool {
        match self {
            Self::Natural => NaturalEq.keys_equal(a, b),
            Self::IgnoreAsciiCase => IgnoreAsciiCase.keys_equal(a, b),
        }
    }
}

pub(crate) type SharedToken = Arc<InvalidationToken>;

pub(crate) enum Stack<K, V, C> {
    Disabled(NullCache<K, V>),
    CoarseLock(LockingCache<K, V, C>),
    CoarseLockWithToken(InvalidatingLockingCache<K, V, SharedToken, C>),
    Concurrent(ConcurrentCache<K, V, C>),
    ConcurrentWithToken(InvalidatingConcurrentCache<K, V, SharedToken, C>),
    LazyLock(LazyLockingCache<K, V, C>),
    LazyLockWithToken(InvalidatingLazyLockingCache<K, V, SharedToken, C>),
}

impl<K, V, C> Stack<K, V, C> {
    fn name(&self) -> &'static str {
        match self {
            Self::Disabled(_) => "disabled",
            Self::CoarseLock(_) => "coarseLock",
            Self::CoarseLockWithToken(_) => "coarseLock+invalidation",
            Self::Concurrent(_) => "concurrent",
            Self::ConcurrentWithToken(_) => "concurrent+invalidation",
            Self::LazyLock(_) => "lazyLock",
            Self::LazyLockWithToken(_) => "lazyLock+invalidation",
        }
    }
}

/// A thread-safe cache whose stack was chosen by
/// [`CacheFactory::from_settings`](crate::CacheFactory::from_settings).
///
/// # Examples
///
/// ```
/// use cachestack::{CacheFactory, CacheSettings, KeyedCache, RevisionSource};
///
/// let settings = CacheSettings::from_json(r#"{"invalidation": true}"#).unwrap();
/// let cache = CacheFactory::from_settings::<String, u32>(&settings).unwrap();
///
/// cache.get_or_insert_with("a".to_string(), |_| 1).unwrap();
/// cache.invalidation_token().unwrap().invalidate();
/// assert!(cache.entries().is_empty());
/// ```
pub struct SharedCache<K, V, C = KeyEquality> {
    stack: Stack<K, V, C>,
    token: Option<SharedToken>,
}

impl<K, V, C> SharedCache<K, V, C> {
    pub(crate) fn new(stack: Stack<K, V, C>, token: Option<SharedToken>) -> Self {
        Self { stack, token }
    }

    /// Returns the token bound to this cache, if `invalidation` was enabled.
    pub fn invalidation_token(&self) -> Option<&Arc<InvalidationToken>> {
        self.token.as_ref()
    }

    /// Returns a short name of the selected stack.
    pub fn stack_name(&self) -> &'static str {
        self.stack.name()
    }
}

macro_rules! dispatch {
    ($stack:expr, $cache:ident => $body:expr) => {
        match $stack {
            Stack::Disabled($cache) => $body,
            Stack::CoarseLock($cache) => $body,
            Stack::CoarseLockWithToken($cache) => $body,
            Stack::Concurrent($cache) => $body,
            Stack::ConcurrentWithToken($cache) => $body,
            Stack::LazyLock($cache) => $body,
            Stack::LazyLockWithToken($cache) => $body,
        }
    };
}

impl<K, V, C> KeyedCache<K, V> for SharedCache<K, V, C>
where
    K: Clone + fmt::Debug,
    V: Clone,
    C: KeyComparer<K> + Clone,
{
    fn try_get(&self, key: &K) -> Result<Option<V>, CacheError> {
        dispatch!(&self.stack, cache => cache.try_get(key))
    }

    fn get_or_create<E, F>(&self, key: K, factory: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
        E: From<CacheError>,
    {
        dispatch!(&self.stack, cache => cache.get_or_create(key, factory))
    }

    fn clear(&self) {
        dispatch!(&self.stack, cache => cache.clear())
    }

    fn entries(&self) -> Vec<(K, V)> {
        dispatch!(&self.stack, cache => cache.entries())
    }

    fn is_null(&self) -> bool {
        matches!(self.stack, Stack::Disabled(_))
    }
}

impl<K, V, C> fmt::Debug for SharedCache<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCache")
            .field("stack", &self.stack_name())
            .field("invalidation", &self.token.is_some())
            .finish()
    }
}
