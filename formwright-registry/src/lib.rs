//! Field type and custom component registries for Formwright.
//!
//! - [`FieldHandler`] — the capability interface every field type implements
//!   (default value, accepted rule kinds, value shape, multiplicity)
//! - [`FieldTypeRegistry`] — maps a type discriminator (`"text"`, `"number"`,
//!   a host's `"rating"`, ...) to its handler; last registration wins
//! - [`ComponentRegistry`] — maps a reference key to an opaque render handler
//!   supplied by the host's render layer
//!
//! Both registries publish immutable snapshots: a reader observes either the
//! map before a registration or the map after it, never a half-built entry.

mod builtin;
mod components;
mod error;
mod handler;
mod registry;
mod snapshot;

pub use builtin::{builtin_handlers, CheckboxHandler};
pub use components::ComponentRegistry;
pub use error::{RegistryError, RegistryResult};
pub use handler::{BasicHandler, FieldHandler};
pub use registry::{FieldTypeRegistry, RegistrySnapshot};
