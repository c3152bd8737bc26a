//! Small shared vocabularies: rule kinds, value shapes and comparison operators.

use crate::value::{compare_values, values_equal};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// The kind of a declarative validation rule.
///
/// Field handlers declare which kinds they accept; the normalizer rejects
/// rules outside that set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Required,
    RequiredIf,
    Pattern,
    Min,
    Max,
    OneOf,
    Compare,
    Custom,
}

impl RuleKind {
    /// Every rule kind, in declaration order.
    pub const ALL: [RuleKind; 8] = [
        Self::Required,
        Self::RequiredIf,
        Self::Pattern,
        Self::Min,
        Self::Max,
        Self::OneOf,
        Self::Compare,
        Self::Custom,
    ];

    /// Returns the schema key for this rule kind.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::RequiredIf => "required_if",
            Self::Pattern => "pattern",
            Self::Min => "min",
            Self::Max => "max",
            Self::OneOf => "one_of",
            Self::Compare => "compare",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The shape of the values a field type holds.
///
/// Decides how `min`/`max` bounds are measured: numerically for
/// [`ValueShape::Number`], by length for text and lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueShape {
    Text,
    Number,
    Boolean,
    List,
    Any,
}

impl ValueShape {
    /// Returns true if `value` has this shape. `Null` fits every shape.
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (Self::Any, _) => true,
            (Self::Text, Value::String(_)) => true,
            (Self::Number, Value::Number(_)) => true,
            (Self::Boolean, Value::Bool(_)) => true,
            (Self::List, Value::Array(_)) => true,
            _ => false,
        }
    }
}

/// Binary comparison operator shared by `compare` rules and condition tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    /// Applies the operator to `left op right`.
    ///
    /// Ordering operators are false when the values are not mutually
    /// comparable (e.g. a number against a string, or `Null`).
    pub fn holds(&self, left: &Value, right: &Value) -> bool {
        match self {
            Self::Eq => values_equal(left, right),
            Self::Ne => !values_equal(left, right),
            Self::Lt => compare_values(left, right) == Some(Ordering::Less),
            Self::Le => matches!(
                compare_values(left, right),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Self::Gt => compare_values(left, right) == Some(Ordering::Greater),
            Self::Ge => matches!(
                compare_values(left, right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }

    /// Human-readable symbol, used in default error messages.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}
