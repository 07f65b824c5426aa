//! Registration storage for the reference container.
//!
//! The registry maps every [`Identity`], bare or composite, to the list of
//! registrations made under it, in registration order. It is populated during
//! the build phase and is immutable once the container is constructed.

use std::collections::HashMap;

use once_cell::sync::OnceCell;
use tracing::{debug, trace};

use crate::descriptor::{Descriptor, Payload};
use crate::error::{AlreadyRegisteredError, MiftahError, Result};
use crate::identity::Identity;
use crate::resolver::Instance;
use crate::scope::Scope;

/// One registration, with its singleton cell.
pub(crate) struct Registration {
    /// Unique within a registry; keys scoped caches.
    pub id: usize,
    pub descriptor: Descriptor,
    pub singleton: OnceCell<Instance>,
}

impl Registration {
    #[inline]
    pub fn scope(&self) -> Scope {
        self.descriptor.scope()
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("identity", self.descriptor.identity())
            .field("scope", &self.scope())
            .field("initialized", &self.singleton.get().is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    registrations: HashMap<Identity, Vec<Registration>>,
    aliases: HashMap<Identity, Identity>,
    tokens: HashMap<String, Identity>,
    next_id: usize,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a descriptor.
    ///
    /// Alias payloads become forwards; everything else is appended to the
    /// list of its identity.
    ///
    /// # Errors
    /// [`MiftahError::AlreadyRegistered`] if a composite identity is already
    /// registered and `allow_override` is false.
    pub fn register(&mut self, descriptor: Descriptor, allow_override: bool) -> Result<()> {
        let identity = descriptor.identity().clone();

        if !allow_override && identity.is_composite() && self.contains(&identity) {
            return Err(MiftahError::AlreadyRegistered(AlreadyRegisteredError { identity }));
        }

        if let Payload::Alias(target) = descriptor.payload() {
            debug!(from = %identity, to = %target, "Registered alias");
            self.tokens.insert(identity.token(), identity.clone());
            self.aliases.insert(identity, target.clone());
            return Ok(());
        }

        debug!(identity = %identity, scope = %descriptor.scope(), "Registered dependency");
        let registration = Registration {
            id: self.next_id,
            descriptor,
            singleton: OnceCell::new(),
        };
        self.next_id += 1;

        self.tokens.entry(identity.token()).or_insert_with(|| identity.clone());
        self.registrations.entry(identity).or_default().push(registration);
        Ok(())
    }

    /// Follows one alias hop, if `identity` is an alias.
    fn target<'a>(&'a self, identity: &'a Identity) -> &'a Identity {
        match self.aliases.get(identity) {
            Some(target) => {
                trace!(from = %identity, to = %target, "Following alias");
                target
            }
            None => identity,
        }
    }

    /// The newest registration for `identity`.
    pub fn get(&self, identity: &Identity) -> Option<&Registration> {
        self.get_all(identity).last()
    }

    /// Every registration for `identity`, oldest first.
    pub fn get_all(&self, identity: &Identity) -> &[Registration] {
        self.registrations
            .get(self.target(identity))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.aliases.contains_key(identity) || self.registrations.contains_key(identity)
    }

    /// The identity whose token is `name`.
    pub fn by_token(&self, name: &str) -> Option<&Identity> {
        self.tokens.get(name)
    }

    /// Number of registrations, aliases excluded.
    pub fn len(&self) -> usize {
        self.registrations.values().map(Vec::len).sum()
    }

    /// Every registered identity, rendered for suggestions.
    pub fn rendered_identities(&self) -> Vec<String> {
        self.registrations
            .keys()
            .chain(self.aliases.keys())
            .map(ToString::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    enum Primary {}
    enum Replica {}

    fn value(identity: Identity, n: u32) -> Descriptor {
        Descriptor::new(identity, Payload::of_instance(n), Scope::Singleton)
    }

    #[test]
    fn register_and_get() {
        let mut reg = Registry::new();
        let identity = Identity::of::<u32>();
        reg.register(value(identity.clone(), 1), false).unwrap();
        assert!(reg.get(&identity).is_some());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn last_registration_wins() {
        let mut reg = Registry::new();
        let identity = Identity::keyed::<Primary, u32>();
        reg.register(value(identity.clone(), 1), true).unwrap();
        reg.register(value(identity.clone(), 2), true).unwrap();

        assert_eq!(reg.get_all(&identity).len(), 2);
        assert_eq!(reg.get(&identity).map(|r| r.id), Some(1));
    }

    #[test]
    fn duplicate_composite_fails_without_override() {
        let mut reg = Registry::new();
        let identity = Identity::keyed::<Primary, u32>();
        reg.register(value(identity.clone(), 1), false).unwrap();

        let err = reg.register(value(identity, 2), false).unwrap_err();
        assert!(matches!(err, MiftahError::AlreadyRegistered(_)));
    }

    #[test]
    fn duplicate_bare_identity_appends() {
        let mut reg = Registry::new();
        reg.register(value(Identity::of::<u32>(), 1), false).unwrap();
        reg.register(value(Identity::of::<u32>(), 2), false).unwrap();
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn alias_resolves() {
        let mut reg = Registry::new();
        let concrete = Identity::keyed::<Primary, u32>();
        reg.register(value(concrete.clone(), 1), false).unwrap();

        let alias = Identity::keyed::<Replica, u32>();
        reg.register(Descriptor::new(alias.clone(), Payload::Alias(concrete), Scope::Transient), false)
            .unwrap();

        assert!(reg.contains(&alias));
        assert!(reg.get(&alias).is_some());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn tokens_index_identities() {
        let mut reg = Registry::new();
        let identity = Identity::keyed::<Primary, u32>();
        reg.register(value(identity.clone(), 1), false).unwrap();

        assert_eq!(reg.by_token(&identity.token()), Some(&identity));
        assert!(reg.by_token("missing").is_none());
    }
}
