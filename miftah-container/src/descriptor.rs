//! Canonical registrations.
//!
//! A [`Descriptor`] is one entry a caller wants registered: an identity
//! (bare or composite), a payload saying how to produce the value, and a
//! [`Scope`]. Descriptors are registry-agnostic; every backing registry and
//! every descriptor walker consumes the same list.

use std::fmt;
use std::sync::Arc;

use crate::dependency::BindingKit;
use crate::error::Result;
use crate::identity::Identity;
use crate::resolver::{FactoryFn, Instance, Resolver};
use crate::scope::Scope;
use crate::type_key::TypeKey;

/// Implementation type `Self` can be constructed as service `S`.
///
/// This is what "register by type" means here: the implementation type
/// knows how to build itself (resolving its own dependencies) and hand
/// itself out as the service shape.
///
/// ```
/// use std::sync::Arc;
/// use miftah_container::descriptor::Provides;
/// use miftah_container::error::Result;
/// use miftah_container::resolver::Resolver;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
///
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// impl Provides<Arc<dyn Greeter>> for English {
///     fn provide(_: &dyn Resolver) -> Result<Arc<dyn Greeter>> {
///         Ok(Arc::new(English))
///     }
/// }
/// ```
pub trait Provides<S>: 'static {
    fn provide(resolver: &dyn Resolver) -> Result<S>;
}

/// How a descriptor produces its value.
#[derive(Clone)]
pub enum Payload {
    /// Built by an implementation type.
    Type { implementation: TypeKey, factory: FactoryFn },
    /// A pre-built value, handed out as-is.
    Instance { implementation: TypeKey, instance: Instance },
    /// Built by an arbitrary factory function.
    Factory(FactoryFn),
    /// Forwards to another identity.
    Alias(Identity),
}

impl Payload {
    /// By-type payload for implementation `I` of service `S`.
    pub fn of_type<S, I>() -> Self
    where
        S: Send + Sync + 'static,
        I: Provides<S>,
    {
        Self::Type {
            implementation: TypeKey::of::<I>(),
            factory: Arc::new(|resolver: &dyn Resolver| Ok(Arc::new(I::provide(resolver)?) as Instance)),
        }
    }

    /// Instance payload.
    pub fn of_instance<S: Send + Sync + 'static>(value: S) -> Self {
        Self::Instance {
            implementation: TypeKey::of::<S>(),
            instance: Arc::new(value),
        }
    }

    /// Factory payload.
    pub fn of_factory<S, F>(factory: F) -> Self
    where
        S: Send + Sync + 'static,
        F: Fn(&dyn Resolver) -> Result<S> + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(move |resolver: &dyn Resolver| {
            Ok(Arc::new(factory(resolver)?) as Instance)
        }))
    }

    /// Short name of the payload kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Type { .. } => "type",
            Self::Instance { .. } => "instance",
            Self::Factory(_) => "factory",
            Self::Alias(_) => "alias",
        }
    }

    /// The implementation type, when known.
    pub fn implementation(&self) -> Option<&TypeKey> {
        match self {
            Self::Type { implementation, .. } | Self::Instance { implementation, .. } => Some(implementation),
            Self::Factory(_) | Self::Alias(_) => None,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type { implementation, .. } => write!(f, "Type({implementation})"),
            Self::Instance { implementation, .. } => write!(f, "Instance({implementation})"),
            Self::Factory(_) => write!(f, "Factory"),
            Self::Alias(target) => write!(f, "Alias({target})"),
        }
    }
}

/// One canonical registration.
#[derive(Clone)]
pub struct Descriptor {
    identity: Identity,
    payload: Payload,
    scope: Scope,
    binding: Option<Arc<dyn BindingKit>>,
}

impl Descriptor {
    pub fn new(identity: Identity, payload: Payload, scope: Scope) -> Self {
        Self { identity, payload, scope, binding: None }
    }

    /// An indirection binding registration.
    pub fn binding(payload: Payload, scope: Scope, kit: Arc<dyn BindingKit>) -> Self {
        Self {
            identity: kit.identity(),
            payload,
            scope,
            binding: Some(kit),
        }
    }

    /// Unqualified registration of `T` built by `factory`.
    pub fn factory<T, F>(scope: Scope, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
    {
        Self::new(Identity::of::<T>(), Payload::of_factory(factory), scope)
    }

    #[inline]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    #[inline]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// The binding kit of an indirection registration.
    #[inline]
    pub fn binding_kit(&self) -> Option<&Arc<dyn BindingKit>> {
        self.binding.as_ref()
    }

    /// The same registration under another identity.
    pub fn with_identity(self, identity: Identity) -> Self {
        Self { identity, ..self }
    }

    /// Returns the factory used to produce this registration's value.
    ///
    /// Aliases have none; resolve their target instead.
    pub fn factory_fn(&self) -> Option<&FactoryFn> {
        match &self.payload {
            Payload::Type { factory, .. } | Payload::Factory(factory) => Some(factory),
            Payload::Instance { .. } | Payload::Alias(_) => None,
        }
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("identity", &self.identity)
            .field("payload", &self.payload)
            .field("scope", &self.scope)
            .field("binding", &self.binding.is_some())
            .finish()
    }
}
