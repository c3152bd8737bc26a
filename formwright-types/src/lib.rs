//! Core type definitions for Formwright.
//!
//! This crate defines the schema-agnostic types shared by every other crate
//! in the workspace:
//! - [`FieldId`] — the unique identifier of a form field
//! - [`ValueMap`] / [`ValueSnapshot`] — field values keyed by id
//! - [`Comparison`], [`RuleKind`], [`ValueShape`] — small vocabularies used by
//!   the registry, the rule compiler and the condition evaluator
//!
//! Field values are plain `serde_json::Value`s. An absent value is `Null`.

mod ids;
mod kinds;
mod value;

pub use ids::FieldId;
pub use kinds::{Comparison, RuleKind, ValueShape};
pub use value::{compare_values, is_empty_value, values_equal, ValueMap, ValueSnapshot};

/// Re-exported so downstream crates agree on a single value type.
pub use serde_json::Value;
