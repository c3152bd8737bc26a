//! Form engine for Formwright.
//!
//! [`FormStore`] owns the runtime state of one mounted form: every field's
//! value, initial value, touched/dirty flags, validation state and activity.
//! It keeps them consistent as values change by recomputing only what a
//! change can affect:
//!
//! - the written fields themselves,
//! - fields whose rules read a written field (`compare`, `required_if`),
//! - fields whose `show_if` / `enable_if` read a written field and whose
//!   activity flipped as a result.
//!
//! Inactive fields are never validated and never submitted, but they keep
//! their values.
//!
//! Asynchronous validation results are tagged with a per-field generation;
//! anything that arrives for an older generation is dropped.

pub mod config;
pub mod logging;

mod entry;
mod error;
mod store;
mod submit;
mod subscription;

pub use config::EngineConfig;
pub use entry::{FieldChange, ValidationState, ValueEntry};
pub use error::{ConfigError, FormError, FormResult, StoreError, StoreResult, SubmitError};
pub use store::{FormOptions, FormStore, PendingValidation};
pub use subscription::{Listener, SubscriptionId};

pub use formwright_conditions::Activity;
pub use formwright_model::{OverrideError, OverridePatch, RawSchema};
