//! Error types for the registries.

use thiserror::Error;

/// Registry lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No field handler registered under this discriminator.
    #[error("unknown field type: {0}")]
    UnknownFieldType(String),

    /// No render component registered under this reference key.
    #[error("unknown component: {0}")]
    UnknownComponent(String),
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
