//! Error types for rule compilation.

use formwright_types::FieldId;
use thiserror::Error;

/// A rule list could not be compiled. Surfaced to the host at mount time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("field '{field}' uses unregistered predicate '{name}'")]
    UnknownPredicate { field: FieldId, name: String },

    #[error("field '{field}' has an invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        field: FieldId,
        pattern: String,
        reason: String,
    },
}

/// Result type for rule compilation.
pub type CompileResult<T> = Result<T, CompileError>;
