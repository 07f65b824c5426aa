//! Keyed registrations.
//!
//! Every operation here performs two registrations on the
//! [`ServiceCollection`]:
//!
//! 1. the payload under the composite identity `(K, S)`, or `(K, I)` for
//!    collection entries;
//! 2. a provider-mediated [`Keyed<K, S>`](crate::dependency::Keyed) binding
//!    under its bare identity, with the same lifetime. It is skipped when
//!    the newest binding for `(K, S)` already has that lifetime.
//!
//! ```
//! use std::sync::Arc;
//! use miftah_container::prelude::*;
//!
//! trait Store: Send + Sync {
//!     fn name(&self) -> &'static str;
//! }
//!
//! struct Disk;
//! impl Store for Disk {
//!     fn name(&self) -> &'static str { "disk" }
//! }
//!
//! impl Provides<Arc<dyn Store>> for Disk {
//!     fn provide(_: &dyn Resolver) -> Result<Arc<dyn Store>> {
//!         Ok(Arc::new(Disk))
//!     }
//! }
//!
//! enum Archive {}
//!
//! let mut services = ServiceCollection::new();
//! services.add_keyed_singleton::<Archive, Arc<dyn Store>, Disk>();
//!
//! let container = Container::builder().add_collection(services).build().unwrap();
//! let store: Arc<dyn Store> = container.resolve_keyed::<Archive, Arc<dyn Store>>().unwrap();
//! assert_eq!(store.name(), "disk");
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::collection::ServiceCollection;
use crate::dependency::{BindingKit, KeyedKit, PROVIDER, PROVIDER_OF, binding_shape};
use crate::descriptor::{Descriptor, Payload, Provides};
use crate::error::Result;
use crate::identity::Identity;
use crate::resolver::Resolver;
use crate::scope::Scope;
use crate::type_key::{Strategy, TypeKey};

/// What to do when the composite identity is already registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overwrite {
    /// Append; single lookups see the newest registration.
    Always,
    /// Skip silently.
    IfAbsent,
}

impl ServiceCollection {
    // ── By type ──

    /// Register implementation `I` as service `S` under key `K`.
    pub fn add_keyed<K, S, I>(&mut self, scope: Scope) -> &mut Self
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static,
        I: Provides<S>,
    {
        self.register_keyed::<K, S>(None, Payload::of_type::<S, I>(), scope, Overwrite::Always)
    }

    /// Like [`ServiceCollection::add_keyed`], skipped if `(K, S)` is already registered.
    pub fn try_add_keyed<K, S, I>(&mut self, scope: Scope) -> &mut Self
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static,
        I: Provides<S>,
    {
        self.register_keyed::<K, S>(None, Payload::of_type::<S, I>(), scope, Overwrite::IfAbsent)
    }

    pub fn add_keyed_singleton<K, S, I>(&mut self) -> &mut Self
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static,
        I: Provides<S>,
    {
        self.add_keyed::<K, S, I>(Scope::Singleton)
    }

    pub fn add_keyed_scoped<K, S, I>(&mut self) -> &mut Self
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static,
        I: Provides<S>,
    {
        self.add_keyed::<K, S, I>(Scope::Scoped)
    }

    pub fn add_keyed_transient<K, S, I>(&mut self) -> &mut Self
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static,
        I: Provides<S>,
    {
        self.add_keyed::<K, S, I>(Scope::Transient)
    }

    // ── By factory ──

    /// Register a factory for service `S` under key `K`.
    pub fn add_keyed_with<K, S>(
        &mut self,
        scope: Scope,
        factory: impl Fn(&dyn Resolver) -> Result<S> + Send + Sync + 'static,
    ) -> &mut Self
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static,
    {
        self.register_keyed::<K, S>(None, Payload::of_factory(factory), scope, Overwrite::Always)
    }

    /// Like [`ServiceCollection::add_keyed_with`], skipped if `(K, S)` is already registered.
    pub fn try_add_keyed_with<K, S>(
        &mut self,
        scope: Scope,
        factory: impl Fn(&dyn Resolver) -> Result<S> + Send + Sync + 'static,
    ) -> &mut Self
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static,
    {
        self.register_keyed::<K, S>(None, Payload::of_factory(factory), scope, Overwrite::IfAbsent)
    }

    pub fn add_keyed_singleton_with<K, S>(
        &mut self,
        factory: impl Fn(&dyn Resolver) -> Result<S> + Send + Sync + 'static,
    ) -> &mut Self
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static,
    {
        self.add_keyed_with::<K, S>(Scope::Singleton, factory)
    }

    pub fn add_keyed_scoped_with<K, S>(
        &mut self,
        factory: impl Fn(&dyn Resolver) -> Result<S> + Send + Sync + 'static,
    ) -> &mut Self
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static,
    {
        self.add_keyed_with::<K, S>(Scope::Scoped, factory)
    }

    pub fn add_keyed_transient_with<K, S>(
        &mut self,
        factory: impl Fn(&dyn Resolver) -> Result<S> + Send + Sync + 'static,
    ) -> &mut Self
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static,
    {
        self.add_keyed_with::<K, S>(Scope::Transient, factory)
    }

    // ── By instance ──

    /// Register a pre-built value for service `S` under key `K`, as a singleton.
    pub fn add_keyed_instance<K, S>(&mut self, value: S) -> &mut Self
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static,
    {
        self.register_keyed::<K, S>(None, Payload::of_instance(value), Scope::Singleton, Overwrite::Always)
    }

    /// Like [`ServiceCollection::add_keyed_instance`], skipped if `(K, S)` is already registered.
    pub fn try_add_keyed_instance<K, S>(&mut self, value: S) -> &mut Self
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static,
    {
        self.register_keyed::<K, S>(None, Payload::of_instance(value), Scope::Singleton, Overwrite::IfAbsent)
    }

    // ── Collections ──

    /// Append implementation `I` to the collection of `S` under key `K`.
    ///
    /// Entries are stored under `(K, I)`, so several implementations of one
    /// service coexist under the same key and
    /// [`resolve_all_keyed`](crate::resolver::ResolverApi::resolve_all_keyed)
    /// returns them in registration order.
    pub fn add_keyed_to_collection<K, S, I>(&mut self, scope: Scope) -> &mut Self
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static,
        I: Provides<S>,
    {
        self.register_keyed::<K, S>(
            Some(TypeKey::of::<I>()),
            Payload::of_type::<S, I>(),
            scope,
            Overwrite::Always,
        )
    }

    /// Append a factory-built entry for implementation `I` to the collection
    /// of `S` under key `K`.
    pub fn add_keyed_to_collection_with<K, S, I>(
        &mut self,
        scope: Scope,
        factory: impl Fn(&dyn Resolver) -> Result<S> + Send + Sync + 'static,
    ) -> &mut Self
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static,
        I: ?Sized + 'static,
    {
        self.register_keyed::<K, S>(
            Some(TypeKey::of::<I>()),
            Payload::of_factory(factory),
            scope,
            Overwrite::Always,
        )
    }

    /// Like [`ServiceCollection::add_keyed_to_collection`], skipped if `I` is
    /// already in the collection under `K`.
    pub fn try_add_keyed_to_collection<K, S, I>(&mut self, scope: Scope) -> &mut Self
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static,
        I: Provides<S>,
    {
        self.register_keyed::<K, S>(
            Some(TypeKey::of::<I>()),
            Payload::of_type::<S, I>(),
            scope,
            Overwrite::IfAbsent,
        )
    }

    // ── Internal ──

    fn register_keyed<K, S>(
        &mut self,
        implementation: Option<TypeKey>,
        payload: Payload,
        scope: Scope,
        overwrite: Overwrite,
    ) -> &mut Self
    where
        K: ?Sized + 'static,
        S: Clone + Send + Sync + 'static,
    {
        let key = TypeKey::of::<K>();
        let service = TypeKey::of::<S>();
        let target = Identity::create(key.clone(), implementation.clone().unwrap_or_else(|| service.clone()));

        if overwrite == Overwrite::IfAbsent && self.contains(&target) {
            debug!(identity = %target, "Skipped keyed registration, already present");
            return self;
        }

        self.add(Descriptor::new(target.clone(), payload, scope));

        let collection = implementation.is_some();
        if !collection && self.binding_scope_for(&target) == Some(scope) {
            return self;
        }

        let family = if collection { PROVIDER_OF } else { PROVIDER };
        let shape = binding_shape(family, key, service, implementation);
        let kit: Arc<dyn BindingKit> = Arc::new(KeyedKit::<K, S>::new(target));
        let payload = Payload::Type {
            implementation: shape,
            factory: kit.factory(Strategy::Provider),
        };
        self.add(Descriptor::binding(payload, scope, kit))
    }

    /// Lifetime of the newest binding pointing at `target`.
    fn binding_scope_for(&self, target: &Identity) -> Option<Scope> {
        self.iter()
            .rev()
            .find(|d| d.binding_kit().is_some_and(|kit| kit.target() == target))
            .map(Descriptor::scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::keyed_identity;

    enum K1 {}
    enum K2 {}

    #[derive(Clone, Debug, PartialEq)]
    struct Thing(&'static str);

    struct First;
    struct Second;

    impl Provides<Thing> for First {
        fn provide(_: &dyn Resolver) -> Result<Thing> {
            Ok(Thing("first"))
        }
    }

    impl Provides<Thing> for Second {
        fn provide(_: &dyn Resolver) -> Result<Thing> {
            Ok(Thing("second"))
        }
    }

    fn identities(services: &ServiceCollection) -> Vec<Identity> {
        services.iter().map(|d| d.identity().clone()).collect()
    }

    #[test]
    fn keyed_registration_adds_payload_and_binding() {
        let mut services = ServiceCollection::new();
        services.add_keyed_transient::<K1, Thing, First>();

        assert_eq!(
            identities(&services),
            [Identity::keyed::<K1, Thing>(), keyed_identity::<K1, Thing>()]
        );

        let binding = &services.descriptors()[1];
        assert_eq!(binding.scope(), Scope::Transient);
        let kit = binding.binding_kit().unwrap();
        assert_eq!(kit.target(), &Identity::keyed::<K1, Thing>());

        let shape = binding.payload().implementation().unwrap().shape().unwrap();
        assert_eq!(*shape.family(), PROVIDER);
    }

    #[test]
    fn repeated_keyed_registration_shares_one_binding() {
        let mut services = ServiceCollection::new();
        services
            .add_keyed_singleton::<K1, Thing, First>()
            .add_keyed_singleton::<K1, Thing, Second>();

        assert_eq!(
            identities(&services),
            [
                Identity::keyed::<K1, Thing>(),
                keyed_identity::<K1, Thing>(),
                Identity::keyed::<K1, Thing>(),
            ]
        );
    }

    #[test]
    fn lifetime_change_appends_binding() {
        let mut services = ServiceCollection::new();
        services
            .add_keyed_singleton_with::<K1, u32>(|_| Ok(1))
            .add_keyed_scoped_with::<K1, u32>(|_| Ok(2))
            .add_keyed_scoped_with::<K1, u32>(|_| Ok(3));

        let bindings: Vec<Scope> = services
            .iter()
            .filter(|d| d.binding_kit().is_some())
            .map(Descriptor::scope)
            .collect();
        assert_eq!(bindings, [Scope::Singleton, Scope::Scoped]);
        assert_eq!(services.len(), 5);
    }

    #[test]
    fn try_add_skips_existing_composite() {
        let mut services = ServiceCollection::new();
        services
            .add_keyed_instance::<K1, Thing>(Thing("kept"))
            .try_add_keyed::<K1, Thing, Second>(Scope::Transient)
            .try_add_keyed_instance::<K2, Thing>(Thing("other key"));

        assert_eq!(services.len(), 4);
        assert_eq!(services.descriptors()[0].payload().kind(), "instance");
        assert_eq!(services.descriptors()[2].identity(), &Identity::keyed::<K2, Thing>());
    }

    #[test]
    fn collection_entries_are_keyed_by_implementation() {
        let mut services = ServiceCollection::new();
        services
            .add_keyed_to_collection::<K1, Thing, First>(Scope::Transient)
            .add_keyed_to_collection::<K1, Thing, Second>(Scope::Transient);

        assert_eq!(
            identities(&services),
            [
                Identity::keyed::<K1, First>(),
                keyed_identity::<K1, Thing>(),
                Identity::keyed::<K1, Second>(),
                keyed_identity::<K1, Thing>(),
            ]
        );

        let shape = services.descriptors()[3].payload().implementation().unwrap().shape().unwrap().clone();
        assert_eq!(*shape.family(), PROVIDER_OF);
        assert_eq!(shape.args()[2], TypeKey::of::<Second>());
    }

    #[test]
    fn try_add_to_collection_skips_same_implementation() {
        let mut services = ServiceCollection::new();
        services
            .add_keyed_to_collection::<K1, Thing, First>(Scope::Singleton)
            .try_add_keyed_to_collection::<K1, Thing, First>(Scope::Singleton)
            .try_add_keyed_to_collection::<K1, Thing, Second>(Scope::Singleton);

        assert_eq!(services.len(), 4);
    }

    #[test]
    fn factory_registration_per_lifetime() {
        let mut services = ServiceCollection::new();
        services
            .add_keyed_singleton_with::<K1, u32>(|_| Ok(1))
            .add_keyed_scoped_with::<K2, u32>(|_| Ok(2))
            .add_keyed_transient_with::<dyn Fn(), u32>(|_| Ok(3));

        let scopes: Vec<Scope> = services.iter().map(Descriptor::scope).collect();
        assert_eq!(
            scopes,
            [
                Scope::Singleton,
                Scope::Singleton,
                Scope::Scoped,
                Scope::Scoped,
                Scope::Transient,
                Scope::Transient,
            ]
        );
    }
}
