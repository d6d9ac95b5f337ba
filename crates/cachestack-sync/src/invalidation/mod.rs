//! Generation-based bulk invalidation.
//!
//! An invalidation token is a counter. Caches bound to it remember the
//! [`Revision`] they last saw; once the token has moved on, the next access
//! clears the cache. Invalidating the token therefore drops every derived
//! cache without enumerating them.

mod decorator;
mod token;

pub use decorator::InvalidationTokenBasedCacheDecorator;
pub use token::{InvalidationToken, LocalInvalidationToken, Revision, RevisionSource};
