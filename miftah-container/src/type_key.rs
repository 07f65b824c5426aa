//! Bare type identities.
//!
//! A [`TypeKey`] is what an unqualified registry indexes by. Most keys are
//! plain Rust types ([`TypeId`]), but the translation layer also needs to talk
//! about *shapes*: an open generic family such as `NamedDependency<_, _>`, or
//! the same family closed over runtime type keys. Rust has no reflection, so
//! these shapes are represented explicitly as [`Family`] + arguments.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use miftah_support::rendering::{render_generic, shorten_type_name};

/// How a binding family resolves its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Looks the target identity up through a shared resolver.
    Provider,
    /// Holds an already resolved value.
    Value,
    /// Looks the target up by its string token.
    Named,
}

/// A generic type family: a name and a number of type parameters.
///
/// Families that carry a [`Strategy`] implement the dependency capability,
/// i.e. closing them over `(key, service[, implementation])` yields an
/// indirection binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Family {
    name: &'static str,
    arity: usize,
    strategy: Option<Strategy>,
}

impl Family {
    /// A plain generic family.
    pub const fn new(name: &'static str, arity: usize) -> Self {
        Self { name, arity, strategy: None }
    }

    /// A family whose instances are indirection bindings resolved with `strategy`.
    pub const fn dependency(name: &'static str, arity: usize, strategy: Strategy) -> Self {
        Self { name, arity, strategy: Some(strategy) }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }

    #[inline]
    pub fn strategy(&self) -> Option<Strategy> {
        self.strategy
    }

    /// Returns `true` if instances of this family are indirection bindings.
    #[inline]
    pub fn is_dependency(&self) -> bool {
        self.strategy.is_some()
    }
}

/// A family applied to a list of arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    family: Family,
    args: Box<[TypeKey]>,
}

impl Shape {
    #[inline]
    pub fn family(&self) -> &Family {
        &self.family
    }

    #[inline]
    pub fn args(&self) -> &[TypeKey] {
        &self.args
    }
}

#[derive(Clone)]
enum Repr {
    Concrete {
        id: TypeId,
        name: &'static str,
        shape: Option<Arc<Shape>>,
    },
    Param(usize),
    Applied(Arc<Shape>),
}

/// A bare type identity.
///
/// # Examples
/// ```
/// use miftah_container::type_key::{Family, TypeKey};
///
/// assert_eq!(TypeKey::of::<String>(), TypeKey::of::<String>());
/// assert_ne!(TypeKey::of::<String>(), TypeKey::of::<u8>());
///
/// const PAIR: Family = Family::new("Pair", 2);
/// let open = TypeKey::open(PAIR);
/// assert!(open.is_open());
///
/// let closed = open.close(&[TypeKey::of::<u8>(), TypeKey::of::<u16>()]);
/// assert!(!closed.is_open());
/// assert_eq!(closed.to_string(), "Pair<u8, u16>");
/// ```
#[derive(Clone)]
pub struct TypeKey(Repr);

impl TypeKey {
    /// The identity of type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Repr::Concrete {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            shape: None,
        })
    }

    /// An unresolved type parameter at position `index`.
    #[inline]
    pub fn param(index: usize) -> Self {
        Self(Repr::Param(index))
    }

    /// The open shape of `family`: `Family<T0, .., Tn>`.
    pub fn open(family: Family) -> Self {
        let args = (0..family.arity()).map(Self::param).collect();
        Self(Repr::Applied(Arc::new(Shape { family, args })))
    }

    /// `family` applied to `args`.
    pub fn apply(family: Family, args: impl IntoIterator<Item = TypeKey>) -> Self {
        Self(Repr::Applied(Arc::new(Shape {
            family,
            args: args.into_iter().collect(),
        })))
    }

    /// Attaches shape metadata to a concrete key.
    ///
    /// The metadata records how the type was built so that it can be read
    /// back later with [`TypeKey::shape`]. It never takes part in equality.
    pub fn with_shape(self, family: Family, args: impl IntoIterator<Item = TypeKey>) -> Self {
        match self.0 {
            Repr::Concrete { id, name, .. } => Self(Repr::Concrete {
                id,
                name,
                shape: Some(Arc::new(Shape {
                    family,
                    args: args.into_iter().collect(),
                })),
            }),
            _ => self,
        }
    }

    /// The generic shape of this key, if known.
    pub fn shape(&self) -> Option<&Shape> {
        match &self.0 {
            Repr::Concrete { shape, .. } => shape.as_deref(),
            Repr::Applied(shape) => Some(shape),
            Repr::Param(_) => None,
        }
    }

    /// The [`TypeId`] behind a concrete key.
    pub fn type_id(&self) -> Option<TypeId> {
        match &self.0 {
            Repr::Concrete { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Returns `true` if the key still contains unresolved parameters.
    pub fn is_open(&self) -> bool {
        match &self.0 {
            Repr::Concrete { .. } => false,
            Repr::Param(_) => true,
            Repr::Applied(shape) => shape.args.iter().any(TypeKey::is_open),
        }
    }

    /// Substitutes parameter `i` with `args[i]`.
    ///
    /// Parameters without a matching argument stay open.
    pub fn close(&self, args: &[TypeKey]) -> Self {
        match &self.0 {
            Repr::Concrete { .. } => self.clone(),
            Repr::Param(index) => args.get(*index).cloned().unwrap_or_else(|| self.clone()),
            Repr::Applied(shape) => Self::apply(
                shape.family,
                shape.args.iter().map(|arg| arg.close(args)),
            ),
        }
    }

    /// Full, human-readable name.
    pub fn type_name(&self) -> String {
        match &self.0 {
            Repr::Concrete { name, .. } => (*name).to_string(),
            Repr::Param(index) => format!("T{index}"),
            Repr::Applied(shape) => {
                let args: Vec<String> = shape.args.iter().map(TypeKey::type_name).collect();
                render_generic(shape.family.name(), &args)
            }
        }
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Repr::Concrete { id: a, .. }, Repr::Concrete { id: b, .. }) => a == b,
            (Repr::Param(a), Repr::Param(b)) => a == b,
            (Repr::Applied(a), Repr::Applied(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0 {
            Repr::Concrete { id, .. } => {
                state.write_u8(0);
                id.hash(state);
            }
            Repr::Param(index) => {
                state.write_u8(1);
                index.hash(state);
            }
            Repr::Applied(shape) => {
                state.write_u8(2);
                shape.hash(state);
            }
        }
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.type_name())
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shorten_type_name(&self.type_name()))
    }
}
