//! Translation of extracted buckets into a target registry.
//!
//! A [`DescriptorWalker`] is configured with the two binding shapes a target
//! registry wants: one for `(K, S)` bindings and one for `(K, S, I)`
//! collection bindings. It walks [`Buckets`] in order and hands every entry to
//! a [`DescriptorVisitor`], rewriting indirection bindings on the way.
//!
//! ```
//! use miftah_container::dependency::{NAMED, NAMED_OF};
//! use miftah_container::type_key::TypeKey;
//! use miftah_container::visitor::DescriptorWalker;
//!
//! let walker = DescriptorWalker::new(TypeKey::open(NAMED), TypeKey::open(NAMED_OF)).unwrap();
//! assert_eq!(walker.pair().to_string(), "NamedDependency<T0, T1>");
//!
//! // Swapped arities are rejected up front.
//! assert!(DescriptorWalker::new(TypeKey::open(NAMED_OF), TypeKey::open(NAMED)).is_err());
//! ```

use tracing::{debug, trace};

use crate::dependency::{PROVIDER, PROVIDER_OF, binding_shape, missing_kit};
use crate::descriptor::{Descriptor, Payload};
use crate::error::{MiftahError, Result};
use crate::extract::Buckets;
use crate::identity::Identity;
use crate::type_key::{Family, Strategy, TypeKey};

/// Receives the entries of extracted buckets.
pub trait DescriptorVisitor {
    /// A plain keyed registration, filed under `key`.
    ///
    /// `descriptor` targets the bare service identity; the registry decides
    /// how to qualify it.
    fn visit_service(&mut self, key: &TypeKey, descriptor: Descriptor) -> Result<()>;

    /// An indirection binding, already rewritten for the walker's target shapes.
    fn visit_dependency(&mut self, descriptor: Descriptor) -> Result<()>;
}

/// Walks [`Buckets`] on behalf of a target registry.
#[derive(Debug, Clone)]
pub struct DescriptorWalker {
    pair: TypeKey,
    pair_strategy: Strategy,
    triple: TypeKey,
    triple_strategy: Strategy,
}

impl DescriptorWalker {
    /// A walker rewriting bindings into `pair` and `triple`.
    ///
    /// # Errors
    /// [`MiftahError::InvalidDependencyShape`] unless `pair` and `triple` are
    /// open shapes of binding families with two and three parameters.
    pub fn new(pair: TypeKey, triple: TypeKey) -> Result<Self> {
        let pair_strategy = validate(&pair, 2)?;
        let triple_strategy = validate(&triple, 3)?;
        Ok(Self { pair, pair_strategy, triple, triple_strategy })
    }

    /// Shorthand for the open shapes of two families.
    pub fn for_families(pair: Family, triple: Family) -> Result<Self> {
        Self::new(TypeKey::open(pair), TypeKey::open(triple))
    }

    pub fn pair(&self) -> &TypeKey {
        &self.pair
    }

    pub fn triple(&self) -> &TypeKey {
        &self.triple
    }

    /// Feeds every bucket entry to `visitor`, in order.
    ///
    /// Stops at the first error, either from the rewrite or from the visitor.
    pub fn walk<V: DescriptorVisitor + ?Sized>(&self, buckets: Buckets, visitor: &mut V) -> Result<()> {
        for bucket in buckets {
            let (key, descriptors) = bucket.into_parts();
            debug!(key = %key, entries = descriptors.len(), "Visiting bucket");

            for descriptor in descriptors {
                if let Payload::Alias(_) = descriptor.payload() {
                    return Err(MiftahError::UnsupportedRegistrationKind {
                        identity: descriptor.identity().clone(),
                        kind: descriptor.payload().kind(),
                    });
                }

                if !is_binding(&key, &descriptor) {
                    trace!(key = %key, identity = %descriptor.identity(), "Dispatching service");
                    visitor.visit_service(&key, descriptor)?;
                    continue;
                }

                let Some(args) = binding_args(&descriptor) else {
                    return Err(MiftahError::UnsupportedRegistrationKind {
                        identity: descriptor.identity().clone(),
                        kind: "binding without a dependency implementation",
                    });
                };
                let rewritten = self.rewrite(&key, descriptor, &args)?;
                trace!(identity = %rewritten.identity(), "Dispatching dependency");
                visitor.visit_dependency(rewritten)?;
            }
        }
        Ok(())
    }

    fn rewrite(&self, key: &TypeKey, descriptor: Descriptor, args: &[TypeKey]) -> Result<Descriptor> {
        let (target, strategy) = match args.len() {
            2 => (&self.pair, self.pair_strategy),
            3 => (&self.triple, self.triple_strategy),
            _ => {
                return Err(MiftahError::UnsupportedRegistrationKind {
                    identity: descriptor.identity().clone(),
                    kind: "binding with an unexpected number of type parameters",
                });
            }
        };

        if args.first() != Some(key) {
            return Err(MiftahError::UnsupportedRegistrationKind {
                identity: descriptor.identity().clone(),
                kind: "binding filed under a foreign key",
            });
        }

        let kit = descriptor
            .binding_kit()
            .cloned()
            .ok_or_else(|| missing_kit(descriptor.identity()))?;

        let payload = Payload::Type {
            implementation: target.close(args),
            factory: kit.factory(strategy),
        };
        Ok(Descriptor::binding(payload, descriptor.scope(), kit))
    }
}

/// Bindings are filed under the sentinel `(key, key)`, or carry a kit.
fn is_binding(key: &TypeKey, descriptor: &Descriptor) -> bool {
    let sentinel = matches!(
        descriptor.identity(),
        Identity::Composite { key: k, service } if k == key && service == key
    );
    sentinel || descriptor.binding_kit().is_some()
}

/// The `(K, S[, I])` arguments of an indirection binding.
fn binding_args(descriptor: &Descriptor) -> Option<Vec<TypeKey>> {
    let shape = descriptor.payload().implementation()?.shape()?;
    shape
        .family()
        .is_dependency()
        .then(|| shape.args().to_vec())
}

fn validate(shape: &TypeKey, arity: usize) -> Result<Strategy> {
    let invalid = |reason| MiftahError::InvalidDependencyShape { shape: shape.clone(), reason };

    let generic = shape.shape().ok_or_else(|| invalid("not a generic shape"))?;
    if !shape.is_open() {
        return Err(invalid("shape is closed"));
    }
    let in_order = generic
        .args()
        .iter()
        .enumerate()
        .all(|(index, arg)| *arg == TypeKey::param(index));
    if !in_order {
        return Err(invalid("parameters must be T0, T1, .. in order"));
    }
    let family = generic.family();
    let strategy = family
        .strategy()
        .ok_or_else(|| invalid("family does not implement Dependency"))?;
    if family.arity() != arity || generic.args().len() != arity {
        return Err(invalid(if arity == 2 {
            "expected two type parameters"
        } else {
            "expected three type parameters"
        }));
    }
    Ok(strategy)
}

/// The canonical binding shape for `(key, service)`.
pub fn dependency_shape(key: TypeKey, service: TypeKey) -> TypeKey {
    binding_shape(PROVIDER, key, service, None)
}

/// The canonical collection binding shape for `(key, service, implementation)`.
pub fn dependency_shape_of(key: TypeKey, service: TypeKey, implementation: TypeKey) -> TypeKey {
    binding_shape(PROVIDER_OF, key, service, Some(implementation))
}
