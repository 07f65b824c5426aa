//! Registration identities.
//!
//! An [`Identity`] is what every registry in this crate is indexed by. A bare
//! identity is just a [`TypeKey`]; a composite identity pairs a *key* type
//! with a *service* type so that the same service can be registered several
//! times, once per key:
//!
//! ```
//! use miftah_container::identity::Identity;
//!
//! enum Primary {}
//! enum Replica {}
//!
//! let primary = Identity::keyed::<Primary, String>();
//! let replica = Identity::keyed::<Replica, String>();
//!
//! assert_ne!(primary, replica);
//! assert_ne!(primary, Identity::of::<String>());
//! assert_eq!(primary, Identity::keyed::<Primary, String>());
//! ```

use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

use miftah_support::rendering::render_keyed;

use crate::type_key::{Family, TypeKey};

/// A bare or composite registration identity.
///
/// Both variants share one equality and hash implementation, so a composite
/// can be stored anywhere a bare identity is. The only way to tell them apart
/// is [`Identity::is_composite`] / [`Identity::deconstruct`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Bare(TypeKey),
    Composite { key: TypeKey, service: TypeKey },
}

impl Identity {
    /// Bare identity of `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Bare(TypeKey::of::<T>())
    }

    /// Composite identity of service `S` under key `K`.
    #[inline]
    pub fn keyed<K: ?Sized + 'static, S: ?Sized + 'static>() -> Self {
        Self::create(TypeKey::of::<K>(), TypeKey::of::<S>())
    }

    /// Composite identity of `(key, service)`. Pure; never consults a registry.
    #[inline]
    pub fn create(key: TypeKey, service: TypeKey) -> Self {
        Self::Composite { key, service }
    }

    /// Composite identity whose service is the open shape of `service`.
    ///
    /// `key` may itself be an unresolved parameter ([`TypeKey::param`]).
    /// Close the result with [`Identity::close`].
    pub fn create_generic(key: TypeKey, service: Family) -> Self {
        Self::create(key, TypeKey::open(service))
    }

    #[inline]
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Composite { .. })
    }

    /// Splits a composite identity into `(key, service)`.
    ///
    /// Returns `None` for bare identities.
    pub fn deconstruct(&self) -> Option<(&TypeKey, &TypeKey)> {
        match self {
            Self::Composite { key, service } => Some((key, service)),
            Self::Bare(_) => None,
        }
    }

    /// The type key of a bare identity.
    pub fn bare(&self) -> Option<&TypeKey> {
        match self {
            Self::Bare(key) => Some(key),
            Self::Composite { .. } => None,
        }
    }

    /// The service half: the type itself for bare identities.
    pub fn service(&self) -> &TypeKey {
        match self {
            Self::Bare(key) => key,
            Self::Composite { service, .. } => service,
        }
    }

    pub fn is_open(&self) -> bool {
        match self {
            Self::Bare(key) => key.is_open(),
            Self::Composite { key, service } => key.is_open() || service.is_open(),
        }
    }

    /// Substitutes open parameters in both halves.
    pub fn close(&self, args: &[TypeKey]) -> Self {
        match self {
            Self::Bare(key) => Self::Bare(key.close(args)),
            Self::Composite { key, service } => Self::create(key.close(args), service.close(args)),
        }
    }

    /// A deterministic string token for registries keyed by strings.
    ///
    /// Equal identities always produce equal tokens within one build of the
    /// program.
    pub fn token(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        format!("{}#{:016x}", self.service(), hasher.finish())
    }
}

impl From<TypeKey> for Identity {
    fn from(key: TypeKey) -> Self {
        Self::Bare(key)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bare(key) => write!(f, "Identity({})", key.type_name()),
            Self::Composite { key, service } => write!(
                f,
                "Identity({}, key={})",
                service.type_name(),
                key.type_name()
            ),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bare(key) => write!(f, "{key}"),
            Self::Composite { key, service } => {
                f.write_str(&render_keyed(&key.type_name(), &service.type_name()))
            }
        }
    }
}
