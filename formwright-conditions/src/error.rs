use formwright_types::FieldId;
use thiserror::Error;

/// Condition expressions that depend on each other in a loop.
///
/// `path` starts and ends with the same field, e.g. `[a, b, a]`; a self
/// reference is `[a, a]`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("dependency cycle: {}", render(.path))]
pub struct DependencyCycleError {
    pub path: Vec<FieldId>,
}

fn render(path: &[FieldId]) -> String {
    path.iter()
        .map(FieldId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub type DependencyResult<T> = std::result::Result<T, DependencyCycleError>;
