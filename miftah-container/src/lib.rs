//! Keyed service lookup over a type-indexed registry.
//!
//! Registrations are collected in a [`ServiceCollection`]. Keyed ones are
//! stored under a composite [`Identity`] and exposed to unqualified lookup
//! through a [`Keyed<K, S>`](dependency::Keyed) binding. The collection is then
//! consumed by the reference [`Container`], or extracted into buckets and
//! walked into any other registry, such as the string-keyed [`NamedRegistry`](named::NamedRegistry).

pub mod collection;
pub mod container;
pub mod dependency;
pub mod descriptor;
pub mod error;
pub mod extract;
pub mod identity;
pub mod keyed;
pub mod named;
mod registry;
pub mod resolver;
pub mod scope;
pub mod type_key;
pub mod visitor;

pub use collection::ServiceCollection;
pub use container::{Container, ContainerBuilder, ScopedContainer, prelude};
pub use error::{MiftahError, Result};
pub use identity::Identity;
pub use scope::Scope;
pub use type_key::TypeKey;
