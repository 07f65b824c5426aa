//! Indirection bindings.
//!
//! A keyed registration is invisible to an unqualified lookup. To reach it,
//! the façade also registers a [`Keyed<K, S>`] binding under a plain type
//! identity; resolving that binding and calling [`Dependency::value`]
//! performs the qualified lookup.
//!
//! ```rust,ignore
//! struct Report {
//!     primary: Keyed<Primary, Arc<dyn Database>>,
//! }
//!
//! let db = report.primary.value()?;
//! ```
//!
//! Three strategies exist, one per kind of backing registry:
//! - [`ProviderDependency`] looks the composite identity up through a resolver;
//! - [`ValueDependency`] holds a value the registry already resolved;
//! - [`NamedDependency`] looks the identity up by its string token.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::trace;

use crate::error::{MiftahError, Result};
use crate::identity::Identity;
use crate::resolver::{FactoryFn, Instance, Resolver, downcast};
use crate::type_key::{Family, Strategy, TypeKey};

/// The value registered under key `K` for service `S`.
pub trait Dependency<K: ?Sized, S>: Send + Sync {
    /// Resolves the keyed service.
    ///
    /// # Errors
    /// [`MiftahError::ServiceNotFound`] if nothing is registered for `(K, S)`.
    fn value(&self) -> Result<S>;
}

/// What callers depend on: a binding for key `K`, service `S`.
pub type Keyed<K, S> = Arc<dyn Dependency<K, S>>;

/// The capability itself: `Keyed<K, S>`.
pub const KEYED: Family = Family::new("Keyed", 2);

/// Provider-mediated binding targeting `(K, S)`.
pub const PROVIDER: Family = Family::dependency("ProviderDependency", 2, Strategy::Provider);
/// Provider-mediated binding targeting `(K, I)` on behalf of `S`.
pub const PROVIDER_OF: Family = Family::dependency("ProviderDependency", 3, Strategy::Provider);
/// Direct-value binding for `(K, S)`.
pub const VALUE: Family = Family::dependency("ValueDependency", 2, Strategy::Value);
/// Direct-value binding for `(K, I)` on behalf of `S`.
pub const VALUE_OF: Family = Family::dependency("ValueDependency", 3, Strategy::Value);
/// Named binding for `(K, S)`.
pub const NAMED: Family = Family::dependency("NamedDependency", 2, Strategy::Named);
/// Named binding for `(K, I)` on behalf of `S`.
pub const NAMED_OF: Family = Family::dependency("NamedDependency", 3, Strategy::Named);

/// The bare identity under which `Keyed<K, S>` bindings are registered.
///
/// Carries the `(K, S)` shape so extraction can recognise it.
pub fn keyed_identity<K: ?Sized + 'static, S: 'static>() -> Identity {
    Identity::Bare(
        TypeKey::of::<Keyed<K, S>>().with_shape(KEYED, [TypeKey::of::<K>(), TypeKey::of::<S>()]),
    )
}

/// The indirection shape `family<key, service>` or, for collection entries,
/// `family<key, service, implementation>`.
pub fn binding_shape(family: Family, key: TypeKey, service: TypeKey, implementation: Option<TypeKey>) -> TypeKey {
    match implementation {
        Some(implementation) => TypeKey::apply(family, [key, service, implementation]),
        None => TypeKey::apply(family, [key, service]),
    }
}

/// Resolves `(K, S)` through a shared resolver on every call.
pub struct ProviderDependency<K: ?Sized, S> {
    resolver: Arc<dyn Resolver>,
    target: Identity,
    _marker: PhantomData<fn(&K) -> S>,
}

impl<K: ?Sized + 'static, S: 'static> ProviderDependency<K, S> {
    /// A binding targeting `create(K, S)`.
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self::targeting(resolver, Identity::keyed::<K, S>())
    }

    /// A binding targeting an arbitrary identity, e.g. `create(K, I)` for
    /// collection entries.
    pub fn targeting(resolver: Arc<dyn Resolver>, target: Identity) -> Self {
        Self { resolver, target, _marker: PhantomData }
    }

    pub fn target(&self) -> &Identity {
        &self.target
    }
}

impl<K, S> Dependency<K, S> for ProviderDependency<K, S>
where
    K: ?Sized + 'static,
    S: Clone + Send + Sync + 'static,
{
    fn value(&self) -> Result<S> {
        trace!(target = %self.target, "Resolving through provider");
        downcast(self.resolver.resolve_identity(&self.target)?, &self.target)
    }
}

/// Holds a value resolved by the backing registry itself.
pub struct ValueDependency<K: ?Sized, S> {
    value: S,
    _marker: PhantomData<fn(&K)>,
}

impl<K: ?Sized, S> ValueDependency<K, S> {
    pub fn new(value: S) -> Self {
        Self { value, _marker: PhantomData }
    }
}

impl<K, S> Dependency<K, S> for ValueDependency<K, S>
where
    K: ?Sized + 'static,
    S: Clone + Send + Sync + 'static,
{
    fn value(&self) -> Result<S> {
        Ok(self.value.clone())
    }
}

/// Resolves by string token, for registries keyed by name.
pub struct NamedDependency<K: ?Sized, S> {
    resolver: Arc<dyn Resolver>,
    target: Identity,
    token: String,
    _marker: PhantomData<fn(&K) -> S>,
}

impl<K: ?Sized + 'static, S: 'static> NamedDependency<K, S> {
    /// A binding looking up `target.token()`.
    pub fn new(resolver: Arc<dyn Resolver>, target: Identity) -> Self {
        let token = target.token();
        Self { resolver, target, token, _marker: PhantomData }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl<K, S> Dependency<K, S> for NamedDependency<K, S>
where
    K: ?Sized + 'static,
    S: Clone + Send + Sync + 'static,
{
    fn value(&self) -> Result<S> {
        trace!(token = %self.token, "Resolving by name");
        downcast(self.resolver.resolve_named(&self.token)?, &self.target)
    }
}

impl<K: ?Sized, S> fmt::Debug for ProviderDependency<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDependency").field("target", &self.target).finish()
    }
}

impl<K: ?Sized, S> fmt::Debug for NamedDependency<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedDependency").field("token", &self.token).finish()
    }
}

// ═══════════════════════════════════════════
// Binding kits
// ═══════════════════════════════════════════

/// Rebuilds an indirection binding for any [`Strategy`].
///
/// Registries only see type-erased descriptors, but constructing a
/// `Keyed<K, S>` needs the static types. The façade captures them here when
/// it registers the binding, so a descriptor walker can later hand the target
/// registry a factory for whichever strategy it uses.
pub trait BindingKit: Send + Sync {
    /// The bare `Keyed<K, S>` identity the binding is registered under.
    fn identity(&self) -> Identity;

    /// The composite identity the binding resolves.
    fn target(&self) -> &Identity;

    /// A factory producing the binding with `strategy`.
    fn factory(&self, strategy: Strategy) -> FactoryFn;
}

/// The [`BindingKit`] for `Keyed<K, S>`.
pub(crate) struct KeyedKit<K: ?Sized, S> {
    target: Identity,
    _marker: PhantomData<fn(&K) -> S>,
}

impl<K: ?Sized + 'static, S: 'static> KeyedKit<K, S> {
    pub fn new(target: Identity) -> Self {
        Self { target, _marker: PhantomData }
    }
}

impl<K, S> BindingKit for KeyedKit<K, S>
where
    K: ?Sized + 'static,
    S: Clone + Send + Sync + 'static,
{
    fn identity(&self) -> Identity {
        keyed_identity::<K, S>()
    }

    fn target(&self) -> &Identity {
        &self.target
    }

    fn factory(&self, strategy: Strategy) -> FactoryFn {
        let target = self.target.clone();
        match strategy {
            Strategy::Provider => Arc::new(move |resolver: &dyn Resolver| {
                let binding: Keyed<K, S> =
                    Arc::new(ProviderDependency::<K, S>::targeting(resolver.share(), target.clone()));
                Ok(Arc::new(binding) as Instance)
            }),
            Strategy::Named => Arc::new(move |resolver: &dyn Resolver| {
                let binding: Keyed<K, S> =
                    Arc::new(NamedDependency::<K, S>::new(resolver.share(), target.clone()));
                Ok(Arc::new(binding) as Instance)
            }),
            Strategy::Value => Arc::new(move |resolver: &dyn Resolver| {
                let value: S = downcast(resolver.resolve_identity(&target)?, &target)?;
                let binding: Keyed<K, S> = Arc::new(ValueDependency::<K, S>::new(value));
                Ok(Arc::new(binding) as Instance)
            }),
        }
    }
}

impl fmt::Debug for dyn BindingKit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingKit")
            .field("identity", &self.identity())
            .field("target", self.target())
            .finish()
    }
}

/// Returns `true` if `key` was built by [`keyed_identity`].
pub(crate) fn is_keyed_shape(key: &TypeKey) -> bool {
    key.shape().is_some_and(|shape| *shape.family() == KEYED)
}

/// Error helper for bindings that cannot be produced.
pub(crate) fn missing_kit(identity: &Identity) -> MiftahError {
    MiftahError::UnsupportedRegistrationKind {
        identity: identity.clone(),
        kind: "indirection binding without a binding kit",
    }
}
