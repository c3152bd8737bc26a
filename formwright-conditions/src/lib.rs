//! Conditional visibility and enablement for Formwright.
//!
//! An [`Evaluator`] is built once per canonical schema. Construction walks
//! every `show_if` / `enable_if` expression into a [`DependencyGraph`],
//! rejects cycles and fixes an evaluation order; afterwards the active set
//! can be recomputed wholesale or for just the fields a change affects.
//!
//! Expressions read values only, never the activity of other fields: a
//! hidden field keeps its value and conditions keep seeing it.

mod error;
mod evaluator;
mod graph;

pub use error::{DependencyCycleError, DependencyResult};
pub use evaluator::{compute_active_set, ActiveSet, Activity, Evaluator};
pub use graph::DependencyGraph;
