//! Error types for Miftah operations.
//!
//! Every failure is local and synchronous. Nothing in this crate logs and
//! swallows an error; callers decide whether to recover.

use std::fmt;

use crate::identity::Identity;
use crate::type_key::TypeKey;

/// Main error type for all Miftah operations.
#[derive(Debug, thiserror::Error)]
pub enum MiftahError {
    /// A lookup (keyed or not) found no registration.
    #[error("{}", .0)]
    ServiceNotFound(ServiceNotFoundError),

    /// A target binding shape handed to a descriptor walker is unusable.
    #[error("Invalid dependency shape {shape}: {reason}")]
    InvalidDependencyShape { shape: TypeKey, reason: &'static str },

    /// A keyed registration carries a payload the translation layer cannot map.
    #[error("Unsupported registration kind for {identity}: {kind}")]
    UnsupportedRegistrationKind { identity: Identity, kind: &'static str },

    /// Factory returned an error, or produced a value of the wrong type.
    #[error("Failed to construct {identity}: {source}")]
    ConstructionFailed {
        identity: Identity,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Identity registered twice while overriding is disabled.
    #[error("{}", .0)]
    AlreadyRegistered(AlreadyRegisteredError),
}

impl MiftahError {
    /// Shorthand for a [`MiftahError::ServiceNotFound`] without suggestions.
    pub fn not_found(requested: impl Into<Lookup>) -> Self {
        Self::ServiceNotFound(ServiceNotFoundError {
            requested: requested.into(),
            required_by: None,
            suggestions: Vec::new(),
        })
    }

    /// Returns `true` if this is a [`MiftahError::ServiceNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ServiceNotFound(_))
    }
}

/// What a failed lookup asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Identity(Identity),
    /// A string token, for registries keyed by name
    Named(String),
}

impl From<Identity> for Lookup {
    fn from(identity: Identity) -> Self {
        Self::Identity(identity)
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity(identity) => write!(f, "{identity}"),
            Self::Named(name) => write!(f, "{name:?}"),
        }
    }
}

/// Error when nothing is registered under the requested identity.
#[derive(Debug)]
pub struct ServiceNotFoundError {
    /// The identity or name that was requested
    pub requested: Lookup,
    /// The binding or service that asked for it, if known
    pub required_by: Option<Identity>,
    /// Registered identities that look similar
    pub suggestions: Vec<String>,
}

impl fmt::Display for ServiceNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service not found: {}", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        match &self.requested {
            Lookup::Identity(identity) => match identity.deconstruct() {
                Some((key, service)) => write!(
                    f,
                    "\n  Hint: Did you forget to call .add_keyed::<{key}, {service}, _>()?"
                ),
                None => write!(f, "\n  Hint: Did you forget to register {identity}?"),
            },
            Lookup::Named(_) => write!(
                f,
                "\n  Hint: Named lookups only see registrations imported into a named registry"
            ),
        }
    }
}

/// Error when a composite identity is registered more than once.
#[derive(Debug)]
pub struct AlreadyRegisteredError {
    pub identity: Identity,
}

impl fmt::Display for AlreadyRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service already registered: {}", self.identity)?;
        write!(
            f,
            "\n  Hint: Use .try_add_keyed() to skip duplicates, or enable allow_override on the builder"
        )
    }
}

/// Convenient Result type for Miftah operations.
pub type Result<T> = std::result::Result<T, MiftahError>;
