//! Cachestack Core - cache contract and single-threaded caches
//!
//! This crate provides the [`KeyedCache`] contract shared by every cache in
//! Cachestack, the key equality strategies, the error type, and the two leaf
//! caches that need no synchronization: [`Cache`] and [`NullCache`].
//!
//! Thread-safe caches and decorators live in `cachestack-sync`.

pub mod cache;
pub mod comparer;
pub mod error;
pub mod null;
pub mod traits;

// Re-exports
pub use cache::Cache;
pub use comparer::{ComparedKey, IgnoreAsciiCase, KeyComparer, NaturalEq};
pub use error::{CacheError, Result};
pub use null::NullCache;
pub use traits::KeyedCache;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_defined() {
        assert!(!version().is_empty());
    }
}
