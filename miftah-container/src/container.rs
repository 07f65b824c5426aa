//! # The Container, heart of Miftah
//!
//! The reference backing registry. It stores identities natively, bare or
//! composite, so a [`ServiceCollection`] built with the keyed façade can be
//! handed to it without extraction.
//!
//! # Architecture
//! ```text
//! ServiceCollection ──add_collection()──> ContainerBuilder ──build()──> Container
//! Buckets ──────────import(walker)──────────────┘                          │
//!                                                                    create_scope()
//!                                                                          │
//!                                                                          ▼
//!                                                                   ScopedContainer
//! ```
//!
//! # Examples
//! ```rust
//! use miftah_container::prelude::*;
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, msg: &str) -> String;
//! }
//!
//! struct Console;
//! impl Logger for Console {
//!     fn log(&self, msg: &str) -> String { format!("console: {msg}") }
//! }
//!
//! struct Audit;
//! impl Logger for Audit {
//!     fn log(&self, msg: &str) -> String { format!("audit: {msg}") }
//! }
//!
//! enum Security {}
//!
//! let mut services = ServiceCollection::new();
//! services
//!     .add_singleton_with::<Arc<dyn Logger>>(|_| Ok(Arc::new(Console)))
//!     .add_keyed_singleton_with::<Security, Arc<dyn Logger>>(|_| Ok(Arc::new(Audit)));
//!
//! let container = Container::builder()
//!     .add_collection(services)
//!     .build()
//!     .expect("Failed to build container");
//!
//! let plain: Arc<dyn Logger> = container.resolve().unwrap();
//! let keyed: Arc<dyn Logger> = container.resolve_keyed::<Security, Arc<dyn Logger>>().unwrap();
//! assert_eq!(plain.log("hi"), "console: hi");
//! assert_eq!(keyed.log("hi"), "audit: hi");
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use miftah_support::rendering::suggest_similar;
use tracing::{debug, info, instrument, trace};

use crate::collection::ServiceCollection;
use crate::descriptor::{Descriptor, Payload};
use crate::error::{Lookup, MiftahError, Result, ServiceNotFoundError};
use crate::extract::Buckets;
use crate::identity::Identity;
use crate::registry::{Registration, Registry};
use crate::resolver::{Instance, Resolver};
use crate::scope::Scope;
use crate::type_key::TypeKey;
use crate::visitor::{DescriptorVisitor, DescriptorWalker};

/// Per-scope instance cache, keyed by registration id.
type ScopeCache = DashMap<usize, Instance>;

// ============================================================
// ContainerBuilder
// ============================================================

/// Builds a [`Container`] from registrations.
///
/// Collections and imported buckets are queued in order and stored at
/// [`build()`](ContainerBuilder::build), so `allow_override` applies to all
/// of them wherever it is called in the chain.
///
/// # Examples
/// ```rust,ignore
/// let container = Container::builder()
///     .add_collection(services)
///     .import(buckets, &DescriptorWalker::for_families(VALUE, VALUE_OF)?)?
///     .allow_override(false)
///     .build()?;
/// ```
pub struct ContainerBuilder {
    descriptors: Vec<Descriptor>,
    allow_override: bool,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self {
            descriptors: Vec::new(),
            allow_override: true,
        }
    }

    /// Allow a composite identity to be registered more than once.
    ///
    /// Enabled by default; single lookups then return the newest
    /// registration. When disabled, [`build()`](ContainerBuilder::build)
    /// fails with [`MiftahError::AlreadyRegistered`].
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.allow_override = allow;
        self
    }

    /// Queue every registration of `services`, in order.
    pub fn add_collection(mut self, services: ServiceCollection) -> Self {
        debug!(registrations = services.len(), "Adding collection");
        self.descriptors.extend(services);
        self
    }

    /// Queue a single registration.
    pub fn add(mut self, descriptor: Descriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Queue extracted buckets, rewriting bindings with `walker`.
    ///
    /// # Errors
    /// Whatever the walk raises, e.g. [`MiftahError::UnsupportedRegistrationKind`].
    pub fn import(mut self, buckets: Buckets, walker: &DescriptorWalker) -> Result<Self> {
        debug!(buckets = buckets.len(), pair = %walker.pair(), "Importing buckets");
        walker.walk(buckets, &mut self)?;
        Ok(self)
    }

    /// Build the container.
    ///
    /// # Errors
    /// [`MiftahError::AlreadyRegistered`] for a duplicated composite identity
    /// when overriding is disabled.
    #[instrument(skip(self), name = "container_build", fields(allow_override = self.allow_override))]
    pub fn build(self) -> Result<Container> {
        info!(registered = self.descriptors.len(), "Building container");

        let mut registry = Registry::new();
        for descriptor in self.descriptors {
            registry.register(descriptor, self.allow_override)?;
        }

        info!("Container built successfully ✓");
        Ok(Container {
            inner: Arc::new(Inner {
                registry,
                root: ScopeCache::new(),
            }),
        })
    }
}

impl DescriptorVisitor for ContainerBuilder {
    fn visit_service(&mut self, key: &TypeKey, descriptor: Descriptor) -> Result<()> {
        let identity = Identity::create(key.clone(), descriptor.identity().service().clone());
        self.descriptors.push(descriptor.with_identity(identity));
        Ok(())
    }

    fn visit_dependency(&mut self, descriptor: Descriptor) -> Result<()> {
        self.descriptors.push(descriptor);
        Ok(())
    }
}

impl fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("queued", &self.descriptors.len())
            .field("allow_override", &self.allow_override)
            .finish()
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

struct Inner {
    registry: Registry,
    /// Scoped instances resolved from the root container.
    root: ScopeCache,
}

/// Immutable, thread-safe container.
///
/// Created by [`ContainerBuilder::build()`]. Cloning is cheap and shares
/// singletons and the root scope. Bindings only hold a weak handle and fail
/// once every clone is dropped.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Container {
    /// Create a new builder.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Create a scoped child container.
    pub fn create_scope(&self) -> ScopedContainer {
        debug!("Creating new scope");
        ScopedContainer {
            root: self.clone(),
            cache: Arc::new(ScopeCache::new()),
        }
    }

    /// Number of stored registrations.
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resolve_in(&self, identity: &Identity, cache: &ScopeCache, scope: &dyn Resolver) -> Result<Instance> {
        trace!(identity = %identity, "Resolving");
        let registration = self
            .inner
            .registry
            .get(identity)
            .ok_or_else(|| self.not_found(identity))?;
        self.instantiate(registration, cache, scope)
    }

    fn resolve_all_in(&self, identity: &Identity, cache: &ScopeCache, scope: &dyn Resolver) -> Result<Vec<Instance>> {
        trace!(identity = %identity, "Resolving all");
        self.inner
            .registry
            .get_all(identity)
            .iter()
            .map(|registration| self.instantiate(registration, cache, scope))
            .collect()
    }

    fn instantiate(&self, registration: &Registration, cache: &ScopeCache, scope: &dyn Resolver) -> Result<Instance> {
        let descriptor = &registration.descriptor;
        let factory = match descriptor.payload() {
            Payload::Instance { instance, .. } => return Ok(instance.clone()),
            Payload::Type { factory, .. } | Payload::Factory(factory) => factory,
            Payload::Alias(target) => return self.resolve_in(target, cache, scope),
        };

        let build = |resolver: &dyn Resolver| {
            factory(resolver).map_err(|err| blame(err, descriptor.identity()))
        };

        match registration.scope() {
            // Singletons only see the root, never the scope that happened to
            // resolve them first.
            Scope::Singleton => registration.singleton.get_or_try_init(|| build(self)).cloned(),
            Scope::Scoped => {
                if let Some(cached) = cache.get(&registration.id) {
                    return Ok(cached.clone());
                }
                let instance = build(scope)?;
                Ok(cache.entry(registration.id).or_insert(instance).clone())
            }
            Scope::Transient => build(scope),
        }
    }

    fn not_found(&self, identity: &Identity) -> MiftahError {
        let requested = identity.to_string();
        let available = self.inner.registry.rendered_identities();
        let available: Vec<&str> = available.iter().map(String::as_str).collect();

        MiftahError::ServiceNotFound(ServiceNotFoundError {
            requested: Lookup::Identity(identity.clone()),
            required_by: None,
            suggestions: suggest_similar(&requested, &available, 3),
        })
    }

    fn resolve_named_in(&self, name: &str, cache: &ScopeCache, scope: &dyn Resolver) -> Result<Instance> {
        trace!(name, "Resolving by name");
        match self.inner.registry.by_token(name) {
            Some(identity) => self.resolve_in(identity, cache, scope),
            None => Err(MiftahError::not_found(Lookup::Named(name.to_string()))),
        }
    }
}

/// Records which registration asked for a missing service.
fn blame(err: MiftahError, identity: &Identity) -> MiftahError {
    match err {
        MiftahError::ServiceNotFound(mut missing) if missing.required_by.is_none() => {
            missing.required_by = Some(identity.clone());
            MiftahError::ServiceNotFound(missing)
        }
        other => other,
    }
}

impl Resolver for Container {
    fn contains(&self, identity: &Identity) -> bool {
        self.inner.registry.contains(identity)
    }

    fn resolve_identity(&self, identity: &Identity) -> Result<Instance> {
        self.resolve_in(identity, &self.inner.root, self)
    }

    fn resolve_all_identity(&self, identity: &Identity) -> Result<Vec<Instance>> {
        self.resolve_all_in(identity, &self.inner.root, self)
    }

    fn resolve_named(&self, name: &str) -> Result<Instance> {
        self.resolve_named_in(name, &self.inner.root, self)
    }

    fn share(&self) -> Arc<dyn Resolver> {
        Arc::new(WeakHandle {
            inner: Arc::downgrade(&self.inner),
            cache: None,
        })
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registered", &self.inner.registry.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// ScopedContainer
// ═══════════════════════════════════════════

/// A scoped child container.
///
/// Scoped registrations get one instance per `ScopedContainer`; singletons
/// are shared with the root. Bindings resolved here fail once the scope is
/// dropped.
#[derive(Clone)]
pub struct ScopedContainer {
    root: Container,
    cache: Arc<ScopeCache>,
}

impl ScopedContainer {
    /// The container this scope was created from.
    pub fn root(&self) -> &Container {
        &self.root
    }
}

impl Resolver for ScopedContainer {
    fn contains(&self, identity: &Identity) -> bool {
        self.root.contains(identity)
    }

    fn resolve_identity(&self, identity: &Identity) -> Result<Instance> {
        self.root.resolve_in(identity, &self.cache, self)
    }

    fn resolve_all_identity(&self, identity: &Identity) -> Result<Vec<Instance>> {
        self.root.resolve_all_in(identity, &self.cache, self)
    }

    fn resolve_named(&self, name: &str) -> Result<Instance> {
        self.root.resolve_named_in(name, &self.cache, self)
    }

    fn share(&self) -> Arc<dyn Resolver> {
        Arc::new(WeakHandle {
            inner: Arc::downgrade(&self.root.inner),
            cache: Some(Arc::downgrade(&self.cache)),
        })
    }
}

impl fmt::Debug for ScopedContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedContainer")
            .field("cached", &self.cache.len())
            .finish()
    }
}

/// What bindings hold on to.
///
/// Bindings are cached inside the very container or scope that created
/// them, so a strong handle would make it own itself.
struct WeakHandle {
    inner: Weak<Inner>,
    /// `None` for the root scope.
    cache: Option<Weak<ScopeCache>>,
}

impl WeakHandle {
    fn upgrade(&self) -> Option<Arc<dyn Resolver>> {
        let root = Container { inner: self.inner.upgrade()? };
        match &self.cache {
            None => Some(Arc::new(root)),
            Some(cache) => Some(Arc::new(ScopedContainer {
                root,
                cache: cache.upgrade()?,
            })),
        }
    }
}

fn dropped(identity: &Identity) -> MiftahError {
    MiftahError::ConstructionFailed {
        identity: identity.clone(),
        source: "container or scope has been dropped".into(),
    }
}

impl Resolver for WeakHandle {
    fn contains(&self, identity: &Identity) -> bool {
        self.upgrade().is_some_and(|resolver| resolver.contains(identity))
    }

    fn resolve_identity(&self, identity: &Identity) -> Result<Instance> {
        self.upgrade()
            .ok_or_else(|| dropped(identity))?
            .resolve_identity(identity)
    }

    fn resolve_all_identity(&self, identity: &Identity) -> Result<Vec<Instance>> {
        self.upgrade()
            .ok_or_else(|| dropped(identity))?
            .resolve_all_identity(identity)
    }

    fn resolve_named(&self, name: &str) -> Result<Instance> {
        self.upgrade()
            .ok_or_else(|| MiftahError::not_found(Lookup::Named(name.to_string())))?
            .resolve_named(name)
    }

    fn share(&self) -> Arc<dyn Resolver> {
        Arc::new(Self {
            inner: self.inner.clone(),
            cache: self.cache.clone(),
        })
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder, ScopedContainer};
    pub use crate::collection::ServiceCollection;
    pub use crate::dependency::{
        Dependency, Keyed, NAMED, NAMED_OF, PROVIDER, PROVIDER_OF, VALUE, VALUE_OF,
    };
    pub use crate::descriptor::{Descriptor, Provides};
    pub use crate::error::{MiftahError, Result};
    pub use crate::extract::{Buckets, extract};
    pub use crate::identity::Identity;
    pub use crate::named::NamedRegistry;
    pub use crate::resolver::{Resolver, ResolverApi};
    pub use crate::scope::Scope;
    pub use crate::type_key::TypeKey;
    pub use crate::visitor::{DescriptorVisitor, DescriptorWalker};
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::{Keyed, VALUE, VALUE_OF};
    use crate::descriptor::Provides;
    use crate::extract::extract;
    use crate::resolver::ResolverApi;
    use std::sync::atomic::{AtomicU32, Ordering};

    enum K1 {}
    enum K2 {}

    trait Thing: Send + Sync {
        fn name(&self) -> &'static str;
    }

    struct A;
    impl Thing for A {
        fn name(&self) -> &'static str {
            "a"
        }
    }

    struct B;
    impl Thing for B {
        fn name(&self) -> &'static str {
            "b"
        }
    }

    struct C;
    impl Thing for C {
        fn name(&self) -> &'static str {
            "c"
        }
    }

    impl Provides<Arc<dyn Thing>> for A {
        fn provide(_: &dyn Resolver) -> Result<Arc<dyn Thing>> {
            Ok(Arc::new(A))
        }
    }

    impl Provides<Arc<dyn Thing>> for B {
        fn provide(_: &dyn Resolver) -> Result<Arc<dyn Thing>> {
            Ok(Arc::new(B))
        }
    }

    impl Provides<Arc<dyn Thing>> for C {
        fn provide(_: &dyn Resolver) -> Result<Arc<dyn Thing>> {
            Ok(Arc::new(C))
        }
    }

    fn build(services: ServiceCollection) -> Container {
        Container::builder().add_collection(services).build().unwrap()
    }

    #[test]
    fn resolve_singleton_value() {
        let mut services = ServiceCollection::new();
        services.add_singleton_value(42i32);
        let container = build(services);

        assert_eq!(container.resolve::<i32>().unwrap(), 42);
        assert_eq!(container.resolve::<i32>().unwrap(), 42);
    }

    #[test]
    fn resolve_transient_creates_new_each_time() {
        let counter = Arc::new(AtomicU32::new(0));

        let mut services = ServiceCollection::new();
        services.add_transient_with::<u32>({
            let counter = counter.clone();
            move |_| Ok(counter.fetch_add(1, Ordering::SeqCst))
        });
        let container = build(services);

        assert_eq!(container.resolve::<u32>().unwrap(), 0);
        assert_eq!(container.resolve::<u32>().unwrap(), 1);
        assert_eq!(container.resolve::<u32>().unwrap(), 2);
    }

    #[test]
    fn singleton_factory_called_once() {
        let counter = Arc::new(AtomicU32::new(0));

        let mut services = ServiceCollection::new();
        services.add_singleton_with::<i32>({
            let counter = counter.clone();
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            }
        });
        let container = build(services);

        for _ in 0..3 {
            assert_eq!(container.resolve::<i32>().unwrap(), 42);
        }
        assert_eq!(container.create_scope().resolve::<i32>().unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn scoped_instances_are_per_scope() {
        let counter = Arc::new(AtomicU32::new(0));

        let mut services = ServiceCollection::new();
        services.add_scoped_with::<u32>({
            let counter = counter.clone();
            move |_| Ok(counter.fetch_add(1, Ordering::SeqCst))
        });
        let container = build(services);

        let first = container.create_scope();
        let second = container.create_scope();
        assert_eq!(first.resolve::<u32>().unwrap(), 0);
        assert_eq!(first.resolve::<u32>().unwrap(), 0);
        assert_eq!(second.resolve::<u32>().unwrap(), 1);
        assert_eq!(container.resolve::<u32>().unwrap(), 2);
        assert_eq!(container.resolve::<u32>().unwrap(), 2);
    }

    #[test]
    fn resolve_with_dependency() {
        let mut services = ServiceCollection::new();
        services
            .add_singleton_value(String::from("postgres://localhost"))
            .add_transient_with::<Vec<u8>>(|r| {
                let url: String = r.resolve()?;
                Ok(url.into_bytes())
            });
        let container = build(services);

        assert_eq!(container.resolve::<Vec<u8>>().unwrap(), b"postgres://localhost");
    }

    #[test]
    fn missing_dependency_names_requester() {
        let mut services = ServiceCollection::new();
        services.add_transient_with::<Vec<u8>>(|r| Ok(r.resolve::<String>()?.into_bytes()));
        let container = build(services);

        match container.resolve::<Vec<u8>>().unwrap_err() {
            MiftahError::ServiceNotFound(e) => {
                assert_eq!(e.requested, Lookup::Identity(Identity::of::<String>()));
                assert_eq!(e.required_by, Some(Identity::of::<Vec<u8>>()));
            }
            other => panic!("Expected ServiceNotFound, got: {other:?}"),
        }
    }

    #[test]
    fn not_found_suggests_keyed_registrations() {
        let mut services = ServiceCollection::new();
        services.add_keyed_singleton::<K1, Arc<dyn Thing>, A>();
        let container = build(services);

        match container.resolve::<Arc<dyn Thing>>() {
            Err(MiftahError::ServiceNotFound(e)) => {
                assert!(e.suggestions.iter().any(|s| s.contains("key = K1")), "{:?}", e.suggestions);
            }
            Err(other) => panic!("Expected ServiceNotFound, got: {other:?}"),
            Ok(thing) => panic!("Expected ServiceNotFound, got {}", thing.name()),
        }
    }

    #[test]
    fn keyed_round_trip() {
        let mut services = ServiceCollection::new();
        services
            .add_keyed_transient::<K1, Arc<dyn Thing>, A>()
            .add_keyed_transient::<K2, Arc<dyn Thing>, B>();
        let container = build(services);

        assert_eq!(container.resolve_keyed::<K1, Arc<dyn Thing>>().unwrap().name(), "a");
        assert_eq!(container.resolve_keyed::<K2, Arc<dyn Thing>>().unwrap().name(), "b");

        let binding: Keyed<K1, Arc<dyn Thing>> = container.resolve().unwrap();
        assert_eq!(binding.value().unwrap().name(), "a");
    }

    #[test]
    fn keyed_is_invisible_to_unqualified_lookup() {
        let mut services = ServiceCollection::new();
        services.add_keyed_instance::<K1, u32>(1);
        let container = build(services);

        assert!(container.get::<u32>().unwrap().is_none());
        assert!(container.resolve::<u32>().unwrap_err().is_not_found());
        assert!(container.get_keyed::<K2, u32>().unwrap().is_none());
        assert!(container.resolve_keyed::<K2, u32>().unwrap_err().is_not_found());
    }

    #[test]
    fn unqualified_and_keyed_coexist() {
        let mut services = ServiceCollection::new();
        services
            .add_singleton_value(String::from("plain"))
            .add_keyed_instance::<K1, String>(String::from("keyed"));
        let container = build(services);

        assert_eq!(container.resolve::<String>().unwrap(), "plain");
        assert_eq!(container.resolve_keyed::<K1, String>().unwrap(), "keyed");
    }

    #[test]
    fn unqualified_and_two_keys_resolve_independently() {
        let mut services = ServiceCollection::new();
        services
            .add_singleton_with::<Arc<dyn Thing>>(|_| Ok(Arc::new(A)))
            .add_keyed_singleton::<K1, Arc<dyn Thing>, B>()
            .add_keyed_singleton::<K2, Arc<dyn Thing>, C>();
        let container = build(services);

        assert_eq!(container.resolve::<Arc<dyn Thing>>().unwrap().name(), "a");
        assert_eq!(container.resolve_keyed::<K1, Arc<dyn Thing>>().unwrap().name(), "b");
        assert_eq!(container.resolve_keyed::<K2, Arc<dyn Thing>>().unwrap().name(), "c");
        assert_eq!(container.resolve_all::<Arc<dyn Thing>>().unwrap().len(), 1);
        assert_eq!(container.resolve_all_keyed::<K1, Arc<dyn Thing>>().unwrap().len(), 1);
    }

    #[test]
    fn keyed_collection_keeps_order() {
        let mut services = ServiceCollection::new();
        services
            .add_keyed_to_collection::<K1, Arc<dyn Thing>, A>(Scope::Transient)
            .add_keyed_to_collection::<K1, Arc<dyn Thing>, B>(Scope::Singleton)
            .add_keyed_to_collection::<K2, Arc<dyn Thing>, B>(Scope::Transient)
            .add_keyed_to_collection::<K1, Arc<dyn Thing>, C>(Scope::Scoped);
        let container = build(services);

        let names: Vec<&str> = container
            .resolve_all_keyed::<K1, Arc<dyn Thing>>()
            .unwrap()
            .iter()
            .map(|t| t.name())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(container.resolve_all_keyed::<K2, Arc<dyn Thing>>().unwrap().len(), 1);
    }

    #[test]
    fn last_keyed_registration_wins() {
        let mut services = ServiceCollection::new();
        services
            .add_keyed_singleton::<K1, Arc<dyn Thing>, A>()
            .add_keyed_singleton::<K1, Arc<dyn Thing>, B>();
        let container = build(services);

        assert_eq!(container.resolve_keyed::<K1, Arc<dyn Thing>>().unwrap().name(), "b");
    }

    #[test]
    fn duplicate_composite_rejected_without_override() {
        let mut services = ServiceCollection::new();
        services
            .add_keyed_instance::<K1, u32>(1)
            .add_keyed_instance::<K1, u32>(2);

        let err = Container::builder()
            .add_collection(services)
            .allow_override(false)
            .build()
            .unwrap_err();
        assert!(matches!(err, MiftahError::AlreadyRegistered(_)));
    }

    #[test]
    fn singleton_and_transient_under_different_keys() {
        let mut services = ServiceCollection::new();
        services
            .add_keyed_singleton_with::<K1, Arc<String>>(|_| Ok(Arc::new(String::from("one"))))
            .add_keyed_transient_with::<K2, Arc<String>>(|_| Ok(Arc::new(String::from("two"))));
        let container = build(services);

        let a = container.resolve_keyed::<K1, Arc<String>>().unwrap();
        let b = container.resolve_keyed::<K1, Arc<String>>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let c = container.resolve_keyed::<K2, Arc<String>>().unwrap();
        let d = container.resolve_keyed::<K2, Arc<String>>().unwrap();
        assert!(!Arc::ptr_eq(&c, &d));
        assert_eq!((a.as_str(), c.as_str()), ("one", "two"));
    }

    #[test]
    fn scoped_keyed_binding_follows_its_scope() {
        let mut services = ServiceCollection::new();
        services.add_keyed_scoped_with::<K1, Arc<String>>(|_| Ok(Arc::new(String::from("scoped"))));
        let container = build(services);

        let scope = container.create_scope();
        let a = scope.resolve_keyed::<K1, Arc<String>>().unwrap();
        let b = scope.resolve_keyed::<K1, Arc<String>>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let other = container.create_scope().resolve_keyed::<K1, Arc<String>>().unwrap();
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[test]
    fn scoped_override_of_keyed_singleton_is_per_scope() {
        let mut services = ServiceCollection::new();
        services
            .add_keyed_singleton_with::<K1, Arc<String>>(|_| Ok(Arc::new(String::from("singleton"))))
            .add_keyed_scoped_with::<K1, Arc<String>>(|_| Ok(Arc::new(String::from("scoped"))));
        let container = build(services);

        let first = container.create_scope();
        let a = first.resolve_keyed::<K1, Arc<String>>().unwrap();
        let b = first.resolve_keyed::<K1, Arc<String>>().unwrap();
        let other = container.create_scope().resolve_keyed::<K1, Arc<String>>().unwrap();

        assert_eq!(a.as_str(), "scoped");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[test]
    fn binding_outliving_its_scope_fails() {
        let mut services = ServiceCollection::new();
        services.add_keyed_transient_with::<K1, u32>(|_| Ok(1));
        let container = build(services);

        let scope = container.create_scope();
        let binding: Keyed<K1, u32> = scope.resolve().unwrap();
        assert_eq!(binding.value().unwrap(), 1);

        drop(scope);
        assert!(matches!(
            binding.value().unwrap_err(),
            MiftahError::ConstructionFailed { .. }
        ));
    }

    #[test]
    fn dropped_container_leaves_no_cycle() {
        let mut services = ServiceCollection::new();
        services.add_keyed_singleton_with::<K1, u32>(|_| Ok(1));
        let container = build(services);

        let binding: Keyed<K1, u32> = container.resolve().unwrap();
        let weak = Arc::downgrade(&container.inner);
        drop(container);

        assert!(weak.upgrade().is_none());
        assert!(binding.value().is_err());
    }

    #[test]
    fn import_with_value_strategy() {
        let mut services = ServiceCollection::new();
        services
            .add_singleton_value(7u8)
            .add_keyed_instance::<K1, u32>(1)
            .add_keyed_to_collection_with::<K2, u32, A>(Scope::Transient, |_| Ok(2))
            .add_keyed_to_collection_with::<K2, u32, B>(Scope::Transient, |_| Ok(3));

        let buckets = extract(&mut services).unwrap();
        let walker = DescriptorWalker::for_families(VALUE, VALUE_OF).unwrap();
        let container = Container::builder()
            .add_collection(services)
            .import(buckets, &walker)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(container.resolve::<u8>().unwrap(), 7);
        assert_eq!(container.resolve_keyed::<K1, u32>().unwrap(), 1);
        assert_eq!(container.resolve_all_keyed::<K2, u32>().unwrap(), [2, 3]);
    }

    #[test]
    fn resolve_named_by_token() {
        let mut services = ServiceCollection::new();
        services.add_keyed_instance::<K1, u32>(5);
        let container = build(services);

        let token = Identity::keyed::<K1, u32>().token();
        let instance = container.resolve_named(&token).unwrap();
        assert_eq!(instance.downcast_ref::<u32>(), Some(&5));
        assert!(container.resolve_named("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn debug_display() {
        let mut services = ServiceCollection::new();
        services.add_singleton_value(1i32).add_singleton_value(String::from("x"));
        let container = build(services);

        let debug = format!("{container:?}");
        assert!(debug.contains("Container"));
        assert!(debug.contains('2'));
    }
}
