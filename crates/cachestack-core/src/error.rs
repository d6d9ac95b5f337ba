//! Error types for Cachestack.
//!
//! Factory errors never pass through this type: a factory returns the
//! caller's own error `E`, and the cache hands it back untouched. `CacheError`
//! covers only what the caches themselves detect, and reaches the caller
//! through the `E: From<CacheError>` bound on
//! [`KeyedCache::get_or_create`](crate::KeyedCache::get_or_create).
//!
//! # Example
//!
//! ```
//! use cachestack_core::{CacheError, Result};
//!
//! fn lookup(reentrant: bool) -> Result<u32> {
//!     if reentrant {
//!         return Err(CacheError::reentrancy(&"users:42"));
//!     }
//!     Ok(7)
//! }
//!
//! assert!(lookup(true).unwrap_err().is_reentrancy());
//! ```

use std::fmt;

use thiserror::Error;

/// Errors raised by the caches, decorators and invalidation tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// An operation re-entered a cache while a factory of that same cache
    /// was still computing `key`.
    #[error(
        "reentrant access detected while the value for key {key} was being created; \
         a factory must not call back into the cache that is running it"
    )]
    Reentrancy {
        /// The key whose factory was executing, rendered with `Debug`.
        key: String,
    },

    /// A revision minted by one invalidation token was checked against another.
    #[error("revision belongs to token {found}, not to token {expected}")]
    ForeignRevision {
        /// Identity of the token performing the check.
        expected: String,
        /// Identity recorded in the revision.
        found: String,
    },

    /// A default-constructed revision was passed where a minted one is required.
    #[error("revision was never obtained from an invalidation token")]
    UninitializedRevision,

    /// Cache settings were rejected while loading or validating.
    #[error("invalid cache settings: {0}")]
    InvalidSettings(String),
}

impl CacheError {
    /// Creates a Reentrancy error naming the key being computed.
    pub fn reentrancy<K: fmt::Debug + ?Sized>(key: &K) -> Self {
        Self::Reentrancy {
            key: format!("{key:?}"),
        }
    }

    /// Creates a ForeignRevision error.
    pub fn foreign_revision(expected: impl fmt::Display, found: impl fmt::Display) -> Self {
        Self::ForeignRevision {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Creates an InvalidSettings error.
    pub fn invalid_settings(reason: impl Into<String>) -> Self {
        Self::InvalidSettings(reason.into())
    }

    /// Returns true if this error reports a reentrant call.
    pub fn is_reentrancy(&self) -> bool {
        matches!(self, Self::Reentrancy { .. })
    }

    /// Returns true if this error reports a revision that cannot be compared.
    pub fn is_revision_error(&self) -> bool {
        matches!(
            self,
            Self::ForeignRevision { .. } | Self::UninitializedRevision
        )
    }
}

/// Type alias for Results with CacheError.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reentrancy_names_key() {
        let error = CacheError::reentrancy(&"key1");
        let msg = error.to_string();

        assert!(msg.contains("\"key1\""));
        assert!(error.is_reentrancy());
        assert!(!error.is_revision_error());
    }

    #[test]
    fn test_reentrancy_with_non_string_key() {
        let error = CacheError::reentrancy(&(3, 'x'));
        assert_eq!(
            error,
            CacheError::Reentrancy {
                key: "(3, 'x')".to_string()
            }
        );
    }

    #[test]
    fn test_revision_errors() {
        let foreign = CacheError::foreign_revision("a", "b");
        assert_eq!(
            foreign.to_string(),
            "revision belongs to token b, not to token a"
        );
        assert!(foreign.is_revision_error());
        assert!(CacheError::UninitializedRevision.is_revision_error());
    }

    #[test]
    fn test_invalid_settings_display() {
        let error = CacheError::invalid_settings("segments must be a power of two");
        assert_eq!(
            error.to_string(),
            "invalid cache settings: segments must be a power of two"
        );
    }

    #[test]
    fn test_converts_into_anyhow() {
        fn inner() -> anyhow::Result<()> {
            Err(CacheError::reentrancy(&1))?;
            Ok(())
        }

        let error = inner().unwrap_err();
        assert!(error.downcast_ref::<CacheError>().is_some());
    }
}
