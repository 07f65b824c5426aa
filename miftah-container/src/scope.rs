//! Registration lifetimes.
//!
//! Every descriptor carries one of three lifetimes:
//! - [`Scope::Singleton`]: one instance per registration for the whole container
//! - [`Scope::Scoped`]: one instance per [`ScopedContainer`](crate::container::ScopedContainer)
//! - [`Scope::Transient`]: new instance on every resolve
//!
//! Keyed registrations and their indirection bindings always share the
//! lifetime the caller asked for.

use std::fmt;

/// Defines the lifetime of a registration.
///
/// # Examples
/// ```
/// use miftah_container::scope::Scope;
///
/// assert!(Scope::Singleton > Scope::Scoped);
/// assert!(Scope::Scoped > Scope::Transient);
/// assert!(!Scope::Transient.is_cached());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// One instance shared across the entire container.
    ///
    /// Created on first resolve, lives until the container is dropped.
    Singleton,

    /// One instance per scope.
    ///
    /// Resolving from the root container treats the root as a scope.
    Scoped,

    /// New instance created on every resolve call.
    Transient,
}

impl Scope {
    /// Returns `true` if this lifetime caches instances.
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, Scope::Singleton | Scope::Scoped)
    }

    #[inline]
    fn rank(&self) -> u8 {
        match self {
            Scope::Singleton => 2,
            Scope::Scoped => 1,
            Scope::Transient => 0,
        }
    }
}

impl PartialOrd for Scope {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scope {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scope::Singleton => "Singleton",
            Scope::Scoped => "Scoped",
            Scope::Transient => "Transient",
        })
    }
}
