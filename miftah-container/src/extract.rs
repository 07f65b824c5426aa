//! Extraction of keyed registrations into per-key buckets.
//!
//! Registries that cannot store composite identities first pull every keyed
//! descriptor out of the [`ServiceCollection`]. What stays behind is plain
//! unqualified registrations the registry can take as-is; what comes out is
//! grouped by key, ready for a [`DescriptorWalker`](crate::visitor::DescriptorWalker).

use std::slice;

use tracing::debug;

use crate::collection::ServiceCollection;
use crate::dependency::is_keyed_shape;
use crate::descriptor::{Descriptor, Payload};
use crate::error::{MiftahError, Result};
use crate::identity::Identity;
use crate::type_key::TypeKey;

/// The registrations that used one key, in original registration order.
#[derive(Debug)]
pub struct Bucket {
    key: TypeKey,
    descriptors: Vec<Descriptor>,
}

impl Bucket {
    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn into_parts(self) -> (TypeKey, Vec<Descriptor>) {
        (self.key, self.descriptors)
    }
}

/// Key → bucket mapping, ordered by first registration of each key.
#[derive(Debug, Default)]
pub struct Buckets {
    buckets: Vec<Bucket>,
}

impl Buckets {
    #[inline]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// The bucket of `key`.
    pub fn get(&self, key: &TypeKey) -> Option<&[Descriptor]> {
        self.buckets
            .iter()
            .find(|bucket| &bucket.key == key)
            .map(Bucket::descriptors)
    }

    pub fn keys(&self) -> impl Iterator<Item = &TypeKey> {
        self.buckets.iter().map(Bucket::key)
    }

    pub fn iter(&self) -> slice::Iter<'_, Bucket> {
        self.buckets.iter()
    }

    fn file(&mut self, key: TypeKey, descriptor: Descriptor) {
        match self.buckets.iter_mut().find(|bucket| bucket.key == key) {
            Some(bucket) => bucket.descriptors.push(descriptor),
            None => self.buckets.push(Bucket { key, descriptors: vec![descriptor] }),
        }
    }
}

impl IntoIterator for Buckets {
    type Item = Bucket;
    type IntoIter = std::vec::IntoIter<Bucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.into_iter()
    }
}

/// Where a keyed descriptor goes: its key, and the identity it is rewritten to.
fn classify(descriptor: &Descriptor) -> Option<(TypeKey, Identity)> {
    match descriptor.identity() {
        Identity::Composite { key, service } => Some((key.clone(), Identity::Bare(service.clone()))),
        Identity::Bare(bare) if is_keyed_shape(bare) => {
            let key = bare.shape()?.args().first()?.clone();
            Some((key.clone(), Identity::create(key.clone(), key)))
        }
        Identity::Bare(_) => None,
    }
}

/// Removes every keyed descriptor from `services` and groups it by key.
///
/// - A composite `(K, S)` descriptor is retargeted to the bare `S` and filed
///   under `K`.
/// - A `Keyed<K, S>` binding is retargeted to the sentinel `(K, K)` and filed
///   under `K`. Walkers recognise bindings by that sentinel.
/// - Everything else stays in `services`, untouched.
///
/// Running it on an already extracted collection returns empty buckets.
///
/// # Errors
/// [`MiftahError::UnsupportedRegistrationKind`] if a keyed descriptor is an
/// alias. The collection is left unchanged in that case.
pub fn extract(services: &mut ServiceCollection) -> Result<Buckets> {
    if let Some(alias) = services
        .iter()
        .find(|d| matches!(d.payload(), Payload::Alias(_)) && classify(d).is_some())
    {
        return Err(MiftahError::UnsupportedRegistrationKind {
            identity: alias.identity().clone(),
            kind: alias.payload().kind(),
        });
    }

    let descriptors = services.descriptors_mut();
    let mut taken = Vec::new();
    for index in (0..descriptors.len()).rev() {
        if let Some((key, identity)) = classify(&descriptors[index]) {
            let descriptor = descriptors.remove(index);
            taken.push((key, descriptor.with_identity(identity)));
        }
    }

    let extracted = taken.len();
    let mut buckets = Buckets::default();
    for (key, descriptor) in taken.into_iter().rev() {
        buckets.file(key, descriptor);
    }

    debug!(
        extracted,
        buckets = buckets.len(),
        remaining = services.len(),
        "Extracted keyed registrations"
    );
    Ok(buckets)
}

impl ServiceCollection {
    /// See [`extract`].
    pub fn extract_keyed(&mut self) -> Result<Buckets> {
        extract(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::{Keyed, ValueDependency, keyed_identity};
    use crate::scope::Scope;
    use std::sync::Arc;

    enum K1 {}
    enum K2 {}

    fn sample() -> ServiceCollection {
        let mut services = ServiceCollection::new();
        services
            .add_singleton_value(String::from("plain"))
            .add_keyed_instance::<K1, u32>(1)
            .add_transient_with::<u8>(|_| Ok(8))
            .add_keyed_transient_with::<K2, u32>(|_| Ok(2))
            .add_keyed_scoped_with::<K1, u16>(|_| Ok(16));
        services
    }

    #[test]
    fn plain_registrations_stay_behind() {
        let mut services = sample();
        extract(&mut services).unwrap();

        let remaining: Vec<Identity> = services.iter().map(|d| d.identity().clone()).collect();
        assert_eq!(remaining, [Identity::of::<String>(), Identity::of::<u8>()]);
    }

    #[test]
    fn buckets_follow_first_key_appearance() {
        let mut services = sample();
        let buckets = extract(&mut services).unwrap();

        let keys: Vec<&TypeKey> = buckets.keys().collect();
        assert_eq!(keys, [&TypeKey::of::<K1>(), &TypeKey::of::<K2>()]);
    }

    #[test]
    fn bucket_entries_are_rewritten_in_order() {
        let mut services = sample();
        let buckets = extract(&mut services).unwrap();

        let k1 = buckets.get(&TypeKey::of::<K1>()).unwrap();
        let identities: Vec<&Identity> = k1.iter().map(Descriptor::identity).collect();
        let sentinel = Identity::keyed::<K1, K1>();
        assert_eq!(
            identities,
            [&Identity::of::<u32>(), &sentinel, &Identity::of::<u16>(), &sentinel]
        );

        assert_eq!(k1[2].scope(), Scope::Scoped);
        assert!(k1[1].binding_kit().is_some());
        assert!(k1[0].binding_kit().is_none());
    }

    #[test]
    fn nothing_keyed_is_a_no_op() {
        let mut services = ServiceCollection::new();
        services.add_singleton_value(1u8).add_transient_with::<u16>(|_| Ok(2));

        let buckets = extract(&mut services).unwrap();
        assert!(buckets.is_empty());
        assert_eq!(services.len(), 2);
    }

    #[test]
    fn second_extraction_is_a_no_op() {
        let mut services = sample();
        let first = services.extract_keyed().unwrap();
        assert_eq!(first.len(), 2);

        let second = services.extract_keyed().unwrap();
        assert!(second.is_empty());
        assert_eq!(services.len(), 2);
    }

    #[test]
    fn keyed_alias_is_rejected_without_mutation() {
        let mut services = sample();
        services.add_alias(Identity::keyed::<K2, u16>(), Identity::keyed::<K1, u16>());
        let before = services.len();

        let err = extract(&mut services).unwrap_err();
        assert!(matches!(
            err,
            MiftahError::UnsupportedRegistrationKind { kind: "alias", .. }
        ));
        assert_eq!(services.len(), before);
    }

    #[test]
    fn unkeyed_alias_is_left_alone() {
        let mut services = sample();
        services.add_alias(Identity::of::<u64>(), Identity::of::<u8>());

        extract(&mut services).unwrap();
        assert!(services.contains(&Identity::of::<u64>()));
    }

    #[test]
    fn hand_registered_binding_type_is_untouched() {
        let mut services = ServiceCollection::new();
        services.add_transient_with::<Keyed<K1, u8>>(|_| Ok(Arc::new(ValueDependency::new(0u8)) as Keyed<K1, u8>));

        let buckets = extract(&mut services).unwrap();
        assert!(buckets.is_empty());
        assert!(services.contains(&keyed_identity::<K1, u8>()));
    }
}
