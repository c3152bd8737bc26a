use crate::condition::Condition;
use formwright_types::{Comparison, FieldId, RuleKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One declarative validation rule.
///
/// Serialized with a `"rule"` tag, e.g. `{"rule": "min", "value": 18}`.
/// Every rule takes an optional `message` overriding the default text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    /// The value must not be empty.
    Required {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// The value must not be empty while `when` holds.
    RequiredIf {
        when: Condition,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// The text value must match a regular expression.
    Pattern {
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Lower bound: numeric for number fields, length otherwise.
    Min {
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Upper bound: numeric for number fields, length otherwise.
    Max {
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// The value must equal one of `values`.
    OneOf {
        values: Vec<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// `this op field` must hold.
    Compare {
        field: FieldId,
        op: Comparison,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// A predicate registered by the host under `name`.
    Custom {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl Rule {
    /// `required` with the default message.
    pub fn required() -> Self {
        Self::Required { message: None }
    }

    /// The rule's kind.
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Required { .. } => RuleKind::Required,
            Self::RequiredIf { .. } => RuleKind::RequiredIf,
            Self::Pattern { .. } => RuleKind::Pattern,
            Self::Min { .. } => RuleKind::Min,
            Self::Max { .. } => RuleKind::Max,
            Self::OneOf { .. } => RuleKind::OneOf,
            Self::Compare { .. } => RuleKind::Compare,
            Self::Custom { .. } => RuleKind::Custom,
        }
    }

    /// The author-supplied message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Required { message }
            | Self::RequiredIf { message, .. }
            | Self::Pattern { message, .. }
            | Self::Min { message, .. }
            | Self::Max { message, .. }
            | Self::OneOf { message, .. }
            | Self::Compare { message, .. }
            | Self::Custom { message, .. } => message.as_deref(),
        }
    }

    /// Other fields whose values this rule reads.
    pub fn references(&self) -> Vec<FieldId> {
        match self {
            Self::Compare { field, .. } => vec![field.clone()],
            Self::RequiredIf { when, .. } => when.references().into_iter().collect(),
            _ => Vec::new(),
        }
    }
}
