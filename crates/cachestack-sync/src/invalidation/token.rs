//! Invalidation tokens and revisions.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cachestack_core::CacheError;
use tracing::debug;
use uuid::Uuid;

/// Snapshot of a token's generation.
///
/// A revision records which token minted it, so revisions of two different
/// tokens never compare equal. `Revision::default()` belongs to no token and
/// is never current.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Revision {
    token: Uuid,
    generation: u64,
}

impl Revision {
    /// Returns the identity of the token that minted this revision.
    pub fn token_id(&self) -> Uuid {
        self.token
    }

    /// Returns the generation counter captured in this revision.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns false for a default-constructed revision.
    pub fn is_initialized(&self) -> bool {
        !self.token.is_nil()
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.token, self.generation)
    }
}

/// A source of revisions that can be invalidated.
///
/// Implemented by [`InvalidationToken`] and [`LocalInvalidationToken`], and
/// by references and shared pointers to them, so one token can be bound to
/// many caches.
pub trait RevisionSource {
    /// Returns this token's identity.
    fn token_id(&self) -> Uuid;

    /// Returns the current revision. Two calls without an intervening
    /// [`invalidate`](Self::invalidate) return equal revisions.
    fn current(&self) -> Revision;

    /// Advances the token; every revision obtained so far stops being current.
    fn invalidate(&self);

    /// Returns true if `revision` is this token's current revision.
    ///
    /// Foreign and default revisions are never current. Use
    /// [`try_is_current`](Self::try_is_current) to have them reported as
    /// errors instead.
    fn is_current(&self, revision: &Revision) -> bool {
        *revision == self.current()
    }

    /// Checks that `revision` was minted by this token.
    ///
    /// # Errors
    ///
    /// - `CacheError::UninitializedRevision` for a default revision
    /// - `CacheError::ForeignRevision` for a revision of another token
    fn check_revision(&self, revision: &Revision) -> Result<(), CacheError> {
        if !revision.is_initialized() {
            return Err(CacheError::UninitializedRevision);
        }
        if revision.token != self.token_id() {
            return Err(CacheError::foreign_revision(
                self.token_id(),
                revision.token,
            ));
        }
        Ok(())
    }

    /// Strict form of [`is_current`](Self::is_current).
    fn try_is_current(&self, revision: &Revision) -> Result<bool, CacheError> {
        self.check_revision(revision)?;
        Ok(self.is_current(revision))
    }
}

/// Thread-safe invalidation token backed by an atomic counter.
///
/// # Examples
///
/// ```
/// use cachestack_sync::{InvalidationToken, RevisionSource};
///
/// let token = InvalidationToken::create_with_locking();
/// let revision = token.current();
/// assert!(token.is_current(&revision));
///
/// token.invalidate();
/// assert!(!token.is_current(&revision));
/// ```
#[derive(Debug)]
pub struct InvalidationToken {
    id: Uuid,
    generation: AtomicU64,
}

impl InvalidationToken {
    /// Creates a token for single-threaded use.
    ///
    /// The returned [`LocalInvalidationToken`] is `!Sync`, so sharing it
    /// between threads is rejected at compile time.
    pub fn create() -> LocalInvalidationToken {
        LocalInvalidationToken::new()
    }

    /// Creates a token that supports concurrent `current`/`invalidate`.
    pub fn create_with_locking() -> Self {
        Self {
            id: Uuid::now_v7(),
            generation: AtomicU64::new(0),
        }
    }
}

impl Default for InvalidationToken {
    fn default() -> Self {
        Self::create_with_locking()
    }
}

impl RevisionSource for InvalidationToken {
    fn token_id(&self) -> Uuid {
        self.id
    }

    fn current(&self) -> Revision {
        Revision {
            token: self.id,
            generation: self.generation.load(Ordering::Acquire),
        }
    }

    fn invalidate(&self) {
        let previous = self.generation.fetch_add(1, Ordering::AcqRel);
        debug!(token = %self.id, generation = previous + 1, "Invalidation token advanced");
    }
}

/// Invalidation token with a plain counter, for single-threaded stacks.
#[derive(Debug)]
pub struct LocalInvalidationToken {
    id: Uuid,
    generation: Cell<u64>,
}

impl LocalInvalidationToken {
    /// Creates a new token.
    pub fn new() -> Self {
        Self {
            id: Uuid::now_v7(),
            generation: Cell::new(0),
        }
    }
}

impl Default for LocalInvalidationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl RevisionSource for LocalInvalidationToken {
    fn token_id(&self) -> Uuid {
        self.id
    }

    fn current(&self) -> Revision {
        Revision {
            token: self.id,
            generation: self.generation.get(),
        }
    }

    fn invalidate(&self) {
        self.generation.set(self.generation.get() + 1);
        debug!(token = %self.id, generation = self.generation.get(), "Invalidation token advanced");
    }
}

macro_rules! forward_revision_source {
    ($($ptr:ty),*) => {
        $(
            impl<T: RevisionSource + ?Sized> RevisionSource for $ptr {
                fn token_id(&self) -> Uuid {
                    (**self).token_id()
                }

                fn current(&self) -> Revision {
                    (**self).current()
                }

                fn invalidate(&self) {
                    (**self).invalidate()
                }
            }
        )*
    };
}

forward_revision_source!(&T, Rc<T>, Arc<T>);
