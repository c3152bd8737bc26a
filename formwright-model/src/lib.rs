//! Schema model for Formwright.
//!
//! Defines the declarative form description and its canonical form:
//! - [`RawSchema`] — what hosts write (sections, fields, shorthand allowed)
//! - [`normalize`] — resolves field types, expands shorthand, fills defaults
//!   and rejects malformed schemas, producing a [`CanonicalSchema`]
//! - [`Rule`] — the declarative validation rule vocabulary
//! - [`Condition`] — the `show_if` / `enable_if` expression language
//! - [`apply_overrides`] — merges an [`OverridePatch`] into a canonical schema
//!
//! Everything here is a pure data transform. Compiling rules into validators
//! and evaluating visibility over time live in the rules, conditions and
//! engine crates.

mod condition;
mod error;
mod normalize;
mod overrides;
mod raw;
mod rule;
mod schema;

pub use condition::{Condition, FieldTest, GenericPresence, Presence, TestOp};
pub use error::{NormalizationError, NormalizationResult, OverrideError, OverrideResult};
pub use normalize::{normalize, normalize_json};
pub use overrides::{apply_overrides, changed_rule_fields, NodePatch, OverridePatch};
pub use raw::{RawNode, RawRule, RawSchema, RawSection};
pub use rule::Rule;
pub use schema::{CanonicalSchema, FieldNode, FieldPresence, RenderSection};
