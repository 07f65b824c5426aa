//! A registry keyed by string.
//!
//! [`NamedRegistry`] stands in for third-party registries that index
//! everything by name. It cannot hold composite identities, so it is fed
//! through extraction and a [`DescriptorWalker`] configured with the named
//! binding families: every keyed registration is stored under the token of
//! its composite identity, and every `Keyed<K, S>` binding looks that token
//! up again.
//!
//! ```
//! use miftah_container::prelude::*;
//!
//! enum Primary {}
//!
//! let mut services = ServiceCollection::new();
//! services
//!     .add_singleton_value(String::from("plain"))
//!     .add_keyed_instance::<Primary, String>(String::from("primary"));
//!
//! let registry = NamedRegistry::from_collection(services).unwrap();
//! assert_eq!(registry.resolve::<String>().unwrap(), "plain");
//! assert_eq!(registry.resolve_keyed::<Primary, String>().unwrap(), "primary");
//! ```
//!
//! The registry has no scopes: scoped registrations live as long as it does.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use tracing::{debug, trace};

use crate::collection::ServiceCollection;
use crate::dependency::{NAMED, NAMED_OF};
use crate::descriptor::{Descriptor, Payload};
use crate::error::{Lookup, MiftahError, Result};
use crate::extract::extract;
use crate::identity::Identity;
use crate::resolver::{Instance, Resolver};
use crate::type_key::TypeKey;
use crate::visitor::{DescriptorVisitor, DescriptorWalker};

struct Entry {
    descriptor: Descriptor,
    cached: OnceCell<Instance>,
}

type Entries = HashMap<String, Vec<Entry>>;

/// String-keyed backing registry.
#[derive(Clone)]
pub struct NamedRegistry {
    entries: Arc<Entries>,
}

impl NamedRegistry {
    /// Builds a registry from a canonical collection.
    ///
    /// # Errors
    /// [`MiftahError::UnsupportedRegistrationKind`] if a keyed registration
    /// is an alias.
    pub fn from_collection(mut services: ServiceCollection) -> Result<Self> {
        let buckets = extract(&mut services)?;
        let walker = DescriptorWalker::for_families(NAMED, NAMED_OF)?;

        let mut visitor = NamedVisitor::default();
        walker.walk(buckets, &mut visitor)?;
        for descriptor in services {
            visitor.add(descriptor.identity().token(), descriptor);
        }
        Ok(visitor.finish())
    }

    /// Every registered name.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn instantiate(&self, entry: &Entry) -> Result<Instance> {
        let factory = match entry.descriptor.payload() {
            Payload::Instance { instance, .. } => return Ok(instance.clone()),
            Payload::Alias(target) => return self.resolve_named(&target.token()),
            Payload::Type { factory, .. } | Payload::Factory(factory) => factory,
        };

        if entry.descriptor.scope().is_cached() {
            entry.cached.get_or_try_init(|| factory(self)).cloned()
        } else {
            factory(self)
        }
    }
}

impl Resolver for NamedRegistry {
    fn contains(&self, identity: &Identity) -> bool {
        self.entries.contains_key(&identity.token())
    }

    fn resolve_identity(&self, identity: &Identity) -> Result<Instance> {
        let entry = self
            .entries
            .get(&identity.token())
            .and_then(|entries| entries.last())
            .ok_or_else(|| MiftahError::not_found(identity.clone()))?;
        self.instantiate(entry)
    }

    fn resolve_all_identity(&self, identity: &Identity) -> Result<Vec<Instance>> {
        self.entries
            .get(&identity.token())
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|entry| self.instantiate(entry))
            .collect()
    }

    fn resolve_named(&self, name: &str) -> Result<Instance> {
        trace!(name, "Resolving by name");
        let entry = self
            .entries
            .get(name)
            .and_then(|entries| entries.last())
            .ok_or_else(|| MiftahError::not_found(Lookup::Named(name.to_string())))?;
        self.instantiate(entry)
    }

    fn share(&self) -> Arc<dyn Resolver> {
        Arc::new(WeakRegistry(Arc::downgrade(&self.entries)))
    }
}

/// Handed to bindings, which are cached inside the registry itself.
struct WeakRegistry(Weak<Entries>);

impl WeakRegistry {
    fn upgrade(&self) -> Option<NamedRegistry> {
        self.0.upgrade().map(|entries| NamedRegistry { entries })
    }
}

impl Resolver for WeakRegistry {
    fn contains(&self, identity: &Identity) -> bool {
        self.upgrade().is_some_and(|registry| registry.contains(identity))
    }

    fn resolve_identity(&self, identity: &Identity) -> Result<Instance> {
        self.upgrade()
            .ok_or_else(|| MiftahError::not_found(identity.clone()))?
            .resolve_identity(identity)
    }

    fn resolve_all_identity(&self, identity: &Identity) -> Result<Vec<Instance>> {
        match self.upgrade() {
            Some(registry) => registry.resolve_all_identity(identity),
            None => Ok(Vec::new()),
        }
    }

    fn resolve_named(&self, name: &str) -> Result<Instance> {
        self.upgrade()
            .ok_or_else(|| MiftahError::not_found(Lookup::Named(name.to_string())))?
            .resolve_named(name)
    }

    fn share(&self) -> Arc<dyn Resolver> {
        Arc::new(WeakRegistry(self.0.clone()))
    }
}

impl fmt::Debug for NamedRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedRegistry")
            .field("names", &self.entries.len())
            .field("registered", &self.len())
            .finish()
    }
}

/// Maps bucket entries onto names.
///
/// Services are named after their composite identity, bindings after their
/// bare `Keyed<K, S>` identity.
#[derive(Default)]
pub struct NamedVisitor {
    entries: HashMap<String, Vec<Entry>>,
}

impl NamedVisitor {
    /// Store `descriptor` under `name`, after anything already there.
    pub fn add(&mut self, name: String, descriptor: Descriptor) {
        debug!(name = %name, identity = %descriptor.identity(), "Registered by name");
        self.entries.entry(name).or_default().push(Entry {
            descriptor,
            cached: OnceCell::new(),
        });
    }

    pub fn finish(self) -> NamedRegistry {
        NamedRegistry {
            entries: Arc::new(self.entries),
        }
    }
}

impl DescriptorVisitor for NamedVisitor {
    fn visit_service(&mut self, key: &TypeKey, descriptor: Descriptor) -> Result<()> {
        let identity = Identity::create(key.clone(), descriptor.identity().service().clone());
        self.add(identity.token(), descriptor.with_identity(identity));
        Ok(())
    }

    fn visit_dependency(&mut self, descriptor: Descriptor) -> Result<()> {
        self.add(descriptor.identity().token(), descriptor);
        Ok(())
    }
}

impl fmt::Debug for NamedVisitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedVisitor").field("names", &self.entries.len()).finish()
    }
}
