//! Error types for schema normalization and overrides.

use formwright_types::{FieldId, RuleKind};
use thiserror::Error;

/// The schema could not be turned into a canonical schema.
///
/// Fatal to the form instance being mounted: a later registration of a
/// missing field type does not repair a schema that already failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizationError {
    #[error("schema is not valid JSON: {0}")]
    Parse(String),

    #[error("field at {location} has an empty id")]
    EmptyId { location: String },

    #[error("duplicate field id '{id}' at {first} and {second}")]
    DuplicateId {
        id: FieldId,
        first: String,
        second: String,
    },

    #[error("field '{id}' at {location} has unknown type '{kind}'")]
    UnknownType {
        id: FieldId,
        kind: String,
        location: String,
    },

    #[error("field '{id}' of type '{kind}' does not accept rule '{rule}'")]
    UnsupportedRule {
        id: FieldId,
        kind: String,
        rule: RuleKind,
    },

    #[error("field '{id}' has an invalid rule: {reason}")]
    InvalidRule { id: FieldId, reason: String },

    #[error("field '{id}' has an invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        id: FieldId,
        pattern: String,
        reason: String,
    },

    #[error("field '{id}' has an invalid condition: {reason}")]
    InvalidCondition { id: FieldId, reason: String },

    #[error("field '{id}' has a default value that type '{kind}' does not accept")]
    InvalidDefault { id: FieldId, kind: String },
}

impl NormalizationError {
    /// The field the error is about, when there is one.
    pub fn field_id(&self) -> Option<&FieldId> {
        match self {
            Self::Parse(_) | Self::EmptyId { .. } => None,
            Self::DuplicateId { id, .. }
            | Self::UnknownType { id, .. }
            | Self::UnsupportedRule { id, .. }
            | Self::InvalidRule { id, .. }
            | Self::InvalidPattern { id, .. }
            | Self::InvalidCondition { id, .. }
            | Self::InvalidDefault { id, .. } => Some(id),
        }
    }
}

/// Result type for normalization.
pub type NormalizationResult<T> = Result<T, NormalizationError>;

/// An override patch could not be applied. The canonical schema is left
/// unmodified.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OverrideError {
    #[error("override targets unknown field '{0}'")]
    UnknownField(FieldId),

    #[error("override gives field '{id}' unknown type '{kind}'")]
    UnknownType { id: FieldId, kind: String },

    #[error("override value for field '{id}' is not accepted by type '{kind}'")]
    InvalidValue { id: FieldId, kind: String },

    #[error("override produces an invalid field: {0}")]
    InvalidNode(#[from] NormalizationError),

    #[error("override introduces a dependency cycle: {0}")]
    DependencyCycle(String),

    #[error("override rules could not be compiled: {0}")]
    Compile(String),
}

/// Result type for overrides.
pub type OverrideResult<T> = Result<T, OverrideError>;
