//! The canonical registration list.
//!
//! A [`ServiceCollection`] is a plain, caller-owned, ordered list of
//! [`Descriptor`]s. It is a build-time artifact: nothing in it is locked, and
//! it is consumed by whichever backing registry the caller picks.
//!
//! Unqualified registrations live here; keyed registrations are added by the
//! façade in [`keyed`](crate::keyed).

use std::slice;

use tracing::debug;

use crate::descriptor::{Descriptor, Payload};
use crate::error::Result;
use crate::identity::Identity;
use crate::resolver::Resolver;
use crate::scope::Scope;

/// Ordered list of canonical registrations.
///
/// # Examples
/// ```
/// use miftah_container::collection::ServiceCollection;
/// use miftah_container::identity::Identity;
///
/// let mut services = ServiceCollection::new();
/// services
///     .add_singleton_value(String::from("postgres://localhost"))
///     .add_transient_with::<u32>(|_| Ok(7));
///
/// assert_eq!(services.len(), 2);
/// assert!(services.contains(&Identity::of::<u32>()));
/// ```
#[derive(Clone, Default, Debug)]
pub struct ServiceCollection {
    descriptors: Vec<Descriptor>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Descriptor> {
        self.descriptors.iter()
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Returns `true` if any descriptor targets `identity`.
    pub fn contains(&self, identity: &Identity) -> bool {
        self.descriptors.iter().any(|d| d.identity() == identity)
    }

    /// Appends a descriptor.
    pub fn add(&mut self, descriptor: Descriptor) -> &mut Self {
        debug!(
            identity = %descriptor.identity(),
            scope = %descriptor.scope(),
            kind = descriptor.payload().kind(),
            "Registered service"
        );
        self.descriptors.push(descriptor);
        self
    }

    /// Appends a descriptor unless its identity is already present.
    ///
    /// Returns `true` if the descriptor was added.
    pub fn try_add(&mut self, descriptor: Descriptor) -> bool {
        if self.contains(descriptor.identity()) {
            debug!(identity = %descriptor.identity(), "Skipped registration, already present");
            return false;
        }
        self.add(descriptor);
        true
    }

    // ── Unqualified registrations ──

    /// Register a pre-built value as a singleton.
    ///
    /// Cloned on every resolve (use `Arc<T>` for cheap sharing).
    pub fn add_singleton_value<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.add(Descriptor::new(Identity::of::<T>(), Payload::of_instance(value), Scope::Singleton))
    }

    /// Register a singleton factory. Called once, on first resolve.
    pub fn add_singleton_with<T: Clone + Send + Sync + 'static>(
        &mut self,
        factory: impl Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
    ) -> &mut Self {
        self.add(Descriptor::factory::<T, _>(Scope::Singleton, factory))
    }

    /// Register a scoped factory. Called once per scope.
    pub fn add_scoped_with<T: Clone + Send + Sync + 'static>(
        &mut self,
        factory: impl Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
    ) -> &mut Self {
        self.add(Descriptor::factory::<T, _>(Scope::Scoped, factory))
    }

    /// Register a transient factory. Called on every resolve.
    pub fn add_transient_with<T: Clone + Send + Sync + 'static>(
        &mut self,
        factory: impl Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
    ) -> &mut Self {
        self.add(Descriptor::factory::<T, _>(Scope::Transient, factory))
    }

    /// Register `from` as a forward to `to`.
    ///
    /// Both identities must produce values of the same type. Aliases are
    /// resolved by the reference container only; the descriptor walkers
    /// reject them under composite identities.
    pub fn add_alias(&mut self, from: Identity, to: Identity) -> &mut Self {
        self.add(Descriptor::new(from, Payload::Alias(to), Scope::Transient))
    }

    pub(crate) fn descriptors_mut(&mut self) -> &mut Vec<Descriptor> {
        &mut self.descriptors
    }
}

impl Extend<Descriptor> for ServiceCollection {
    fn extend<I: IntoIterator<Item = Descriptor>>(&mut self, iter: I) {
        for descriptor in iter {
            self.add(descriptor);
        }
    }
}

impl FromIterator<Descriptor> for ServiceCollection {
    fn from_iter<I: IntoIterator<Item = Descriptor>>(iter: I) -> Self {
        let mut collection = Self::new();
        collection.extend(iter);
        collection
    }
}

impl IntoIterator for ServiceCollection {
    type Item = Descriptor;
    type IntoIter = std::vec::IntoIter<Descriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ServiceCollection {
    type Item = &'a Descriptor;
    type IntoIter = slice::Iter<'a, Descriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter()
    }
}
