//! # Miftah: keyed services for type-indexed containers
//!
//! Register several implementations of one service under distinct key types,
//! resolve them by key, and feed the same registration list to registries
//! that only know how to index by type or by name.
//!
//! ```
//! use miftah::prelude::*;
//!
//! enum Primary {}
//! enum Replica {}
//!
//! let mut services = ServiceCollection::new();
//! services
//!     .add_keyed_instance::<Primary, &'static str>("postgres://primary")
//!     .add_keyed_instance::<Replica, &'static str>("postgres://replica");
//!
//! let container = Container::builder().add_collection(services).build().unwrap();
//! assert_eq!(container.resolve_keyed::<Replica, &'static str>().unwrap(), "postgres://replica");
//! ```

pub use miftah_container::*;
pub use miftah_support;
