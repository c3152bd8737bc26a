//! Default error texts, used when a rule carries no `message`.

use formwright_types::{Comparison, FieldId};

pub(crate) const REQUIRED: &str = "This field is required";
pub(crate) const PATTERN: &str = "Invalid format";
pub(crate) const ONE_OF: &str = "Must be one of the allowed values";
pub(crate) const FALLBACK: &str = "Invalid value";

/// Renders a bound without a trailing `.0` for whole numbers.
pub(crate) fn number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

pub(crate) fn min_value(limit: f64) -> String {
    format!("Must be at least {}", number(limit))
}

pub(crate) fn max_value(limit: f64) -> String {
    format!("Must be at most {}", number(limit))
}

pub(crate) fn min_length(limit: f64, items: bool) -> String {
    if items {
        format!("Select at least {} items", number(limit))
    } else {
        format!("Must be at least {} characters", number(limit))
    }
}

pub(crate) fn max_length(limit: f64, items: bool) -> String {
    if items {
        format!("Select at most {} items", number(limit))
    } else {
        format!("Must be at most {} characters", number(limit))
    }
}

pub(crate) fn compare(op: Comparison, other: &FieldId) -> String {
    match op {
        Comparison::Eq => format!("Must match {other}"),
        Comparison::Ne => format!("Must differ from {other}"),
        Comparison::Lt => format!("Must be less than {other}"),
        Comparison::Le => format!("Must not be greater than {other}"),
        Comparison::Gt => format!("Must be greater than {other}"),
        Comparison::Ge => format!("Must not be less than {other}"),
    }
}
