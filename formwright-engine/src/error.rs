use formwright_conditions::DependencyCycleError;
use formwright_model::{NormalizationError, OverrideError};
use formwright_rules::CompileError;
use formwright_types::FieldId;
use std::collections::BTreeMap;
use thiserror::Error;

/// A form could not be mounted.
#[derive(Debug, Error)]
pub enum FormError {
    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    #[error(transparent)]
    Cycle(#[from] DependencyCycleError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Override(#[from] OverrideError),
}

pub type FormResult<T> = std::result::Result<T, FormError>;

/// A value write was refused. The store is left unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("unknown field '{0}'")]
    UnknownField(FieldId),

    #[error("value for field '{id}' is not accepted by type '{kind}'")]
    RejectedValue { id: FieldId, kind: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Submission did not reach the host callback.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    /// One or more active fields failed validation. Holds every failing
    /// field's message, not just the first.
    #[error("{} field(s) failed validation", .errors.len())]
    Invalid { errors: BTreeMap<FieldId, String> },

    /// Asynchronous validation did not settle in time.
    #[error("validation still pending for {pending:?}")]
    Timeout { pending: Vec<FieldId> },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] toml::de::Error),
}
