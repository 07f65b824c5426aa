//! The lookup contract every backing registry implements.
//!
//! [`Resolver`] is deliberately small and object-safe: registries work with
//! type-erased [`Instance`]s indexed by [`Identity`]. Typed and keyed lookups
//! live in the [`ResolverApi`] extension trait, implemented for every
//! resolver (including `dyn Resolver`).

use std::any::{Any, type_name};
use std::sync::Arc;

use tracing::trace;

use crate::dependency::{Keyed, keyed_identity};
use crate::error::{MiftahError, Result};
use crate::identity::Identity;

/// A type-erased resolved value.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Factory functions stored in descriptors.
///
/// A factory receives the resolver of the scope it is being resolved in, so
/// it can pull its own dependencies.
pub type FactoryFn = Arc<dyn Fn(&dyn Resolver) -> Result<Instance> + Send + Sync>;

/// Lookup capability of a backing registry.
pub trait Resolver: Send + Sync {
    /// Returns `true` if at least one registration exists for `identity`.
    fn contains(&self, identity: &Identity) -> bool;

    /// Resolves the most recent registration for `identity`.
    fn resolve_identity(&self, identity: &Identity) -> Result<Instance>;

    /// Resolves every registration for `identity`, in registration order.
    ///
    /// An unknown identity yields an empty list, not an error.
    fn resolve_all_identity(&self, identity: &Identity) -> Result<Vec<Instance>>;

    /// Resolves a registration by its string token (see [`Identity::token`]).
    fn resolve_named(&self, name: &str) -> Result<Instance>;

    /// An owned handle to this resolver, for bindings that outlive the
    /// factory call that created them.
    fn share(&self) -> Arc<dyn Resolver>;
}

/// Recovers a typed value from an [`Instance`].
///
/// Unshared instances (transients) are moved out; shared ones are cloned.
pub fn downcast<T: Clone + Send + Sync + 'static>(instance: Instance, identity: &Identity) -> Result<T> {
    let typed = instance
        .downcast::<T>()
        .map_err(|_| MiftahError::ConstructionFailed {
            identity: identity.clone(),
            source: format!("Type mismatch: expected {}", type_name::<T>()).into(),
        })?;
    Ok(Arc::try_unwrap(typed).unwrap_or_else(|shared| (*shared).clone()))
}

/// Typed lookups, by type and by key.
///
/// ```
/// use miftah_container::prelude::*;
///
/// enum Primary {}
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton_value(7u32);
/// services.add_keyed_instance::<Primary, u32>(42);
///
/// let container = Container::builder().add_collection(services).build().unwrap();
///
/// assert_eq!(container.resolve::<u32>().unwrap(), 7);
/// assert_eq!(container.resolve_keyed::<Primary, u32>().unwrap(), 42);
/// ```
pub trait ResolverApi {
    /// Resolves `T` by unqualified lookup.
    fn resolve<T: Clone + Send + Sync + 'static>(&self) -> Result<T>;

    /// Like [`ResolverApi::resolve`], but `None` when `T` is not registered.
    fn get<T: Clone + Send + Sync + 'static>(&self) -> Result<Option<T>>;

    /// Every registration of `T`, in registration order.
    fn resolve_all<T: Clone + Send + Sync + 'static>(&self) -> Result<Vec<T>>;

    /// Resolves service `S` registered under key `K`.
    ///
    /// # Errors
    /// [`MiftahError::ServiceNotFound`] if nothing is registered for `(K, S)`.
    fn resolve_keyed<K, S>(&self) -> Result<S>
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static;

    /// Like [`ResolverApi::resolve_keyed`], but `None` when `(K, S)` is not registered.
    fn get_keyed<K, S>(&self) -> Result<Option<S>>
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static;

    /// Every registration of `S` under `K`, in registration order.
    fn resolve_all_keyed<K, S>(&self) -> Result<Vec<S>>
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static;
}

impl<R: Resolver + ?Sized> ResolverApi for R {
    fn resolve<T: Clone + Send + Sync + 'static>(&self) -> Result<T> {
        let identity = Identity::of::<T>();
        trace!(identity = %identity, "Resolving");
        let instance = self.resolve_identity(&identity)?;
        downcast(instance, &identity)
    }

    fn get<T: Clone + Send + Sync + 'static>(&self) -> Result<Option<T>> {
        if !self.contains(&Identity::of::<T>()) {
            return Ok(None);
        }
        self.resolve().map(Some)
    }

    fn resolve_all<T: Clone + Send + Sync + 'static>(&self) -> Result<Vec<T>> {
        let identity = Identity::of::<T>();
        self.resolve_all_identity(&identity)?
            .into_iter()
            .map(|instance| downcast(instance, &identity))
            .collect()
    }

    fn resolve_keyed<K, S>(&self) -> Result<S>
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static,
    {
        self.get_keyed::<K, S>()?
            .ok_or_else(|| MiftahError::not_found(Identity::keyed::<K, S>()))
    }

    fn get_keyed<K, S>(&self) -> Result<Option<S>>
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static,
    {
        let binding = keyed_identity::<K, S>();
        if !self.contains(&binding) {
            return Ok(None);
        }
        trace!(identity = %Identity::keyed::<K, S>(), "Resolving keyed");
        let dependency: Keyed<K, S> = downcast(self.resolve_identity(&binding)?, &binding)?;
        dependency.value().map(Some)
    }

    fn resolve_all_keyed<K, S>(&self) -> Result<Vec<S>>
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static,
    {
        let binding = keyed_identity::<K, S>();
        self.resolve_all_identity(&binding)?
            .into_iter()
            .map(|instance| downcast::<Keyed<K, S>>(instance, &binding)?.value())
            .collect()
    }
}
