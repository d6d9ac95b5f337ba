//! Pluggable key equality.
//!
//! Every cache compares its keys through a [`KeyComparer`]. The default,
//! [`NaturalEq`], defers to the key's own `Hash`/`Eq`; [`IgnoreAsciiCase`]
//! treats string keys that differ only in ASCII case as the same key.

use std::hash::{Hash, Hasher};

/// Equality strategy for cache keys.
///
/// Implementations must keep `hash_key` consistent with `keys_equal`: two keys
/// that compare equal must feed identical data to the hasher.
pub trait KeyComparer<K: ?Sized> {
    /// Feeds the parts of `key` that define its identity into `state`.
    fn hash_key<H: Hasher>(&self, key: &K, state: &mut H);

    /// Returns true if both keys identify the same entry.
    fn keys_equal(&self, a: &K, b: &K) -> bool;
}

/// Compares keys with their own `Hash` and `Eq` implementations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NaturalEq;

impl<K: Hash + Eq + ?Sized> KeyComparer<K> for NaturalEq {
    fn hash_key<H: Hasher>(&self, key: &K, state: &mut H) {
        key.hash(state);
    }

    fn keys_equal(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

/// Compares string keys ignoring ASCII case.
///
/// # Examples
///
/// ```
/// use cachestack_core::{IgnoreAsciiCase, KeyComparer};
///
/// assert!(IgnoreAsciiCase.keys_equal("MyApp", "myapp"));
/// assert!(!IgnoreAsciiCase.keys_equal("myapp", "my-app"));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IgnoreAsciiCase;

impl<K: AsRef<str> + ?Sized> KeyComparer<K> for IgnoreAsciiCase {
    fn hash_key<H: Hasher>(&self, key: &K, state: &mut H) {
        for byte in key.as_ref().bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        // Terminator, same as `str`'s own Hash impl.
        state.write_u8(0xff);
    }

    fn keys_equal(&self, a: &K, b: &K) -> bool {
        a.as_ref().eq_ignore_ascii_case(b.as_ref())
    }
}

/// A key bundled with the comparer that defines its identity.
///
/// Maps inside the caches are keyed by `ComparedKey` so that the standard
/// `HashMap` honours a custom comparer.
#[derive(Debug, Clone)]
pub struct ComparedKey<K, C> {
    key: K,
    comparer: C,
}

impl<K, C> ComparedKey<K, C> {
    /// Pairs `key` with `comparer`.
    pub fn new(key: K, comparer: C) -> Self {
        Self { key, comparer }
    }

    /// Returns the original key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Consumes the wrapper and returns the original key.
    pub fn into_key(self) -> K {
        self.key
    }
}

impl<K, C: KeyComparer<K>> Hash for ComparedKey<K, C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.comparer.hash_key(&self.key, state);
    }
}

impl<K, C: KeyComparer<K>> PartialEq for ComparedKey<K, C> {
    fn eq(&self, other: &Self) -> bool {
        self.comparer.keys_equal(&self.key, &other.key)
    }
}

impl<K, C: KeyComparer<K>> Eq for ComparedKey<K, C> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_natural_eq_is_case_sensitive() {
        assert!(NaturalEq.keys_equal("key", "key"));
        assert!(!NaturalEq.keys_equal("Key", "key"));
    }

    #[test]
    fn test_ignore_case_in_hash_set() {
        let mut set = HashSet::new();
        set.insert(ComparedKey::new("MyApp".to_string(), IgnoreAsciiCase));

        assert!(set.contains(&ComparedKey::new("MYAPP".to_string(), IgnoreAsciiCase)));
        assert!(!set.contains(&ComparedKey::new("other".to_string(), IgnoreAsciiCase)));
    }

    #[test]
    fn test_compared_key_keeps_original_spelling() {
        let key = ComparedKey::new("MixedCase", IgnoreAsciiCase);
        assert_eq!(*key.key(), "MixedCase");
        assert_eq!(key.into_key(), "MixedCase");
    }
}
