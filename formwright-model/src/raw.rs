//! The schema as hosts write it, before normalization.

use crate::condition::Condition;
use crate::rule::Rule;
use formwright_types::FieldId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A whole form description.
///
/// Top-level `fields` are shorthand for an untitled leading section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSchema {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<RawNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<RawSection>,
}

/// A structural grouping of fields and nested sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<RawNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<RawSection>,
}

/// One field as written by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    pub id: FieldId,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Shorthand for a leading `required` rule.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RawRule>,
    /// `null` or omitted means "use the field type's default".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_if: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_if: Option<Condition>,
    /// Type-specific options, opaque to the core.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
    /// Reference key of a host render component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
}

fn default_kind() -> String {
    "text".to_string()
}

impl RawNode {
    /// A node of the given type with no rules.
    pub fn new(id: impl Into<FieldId>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            label: None,
            required: false,
            rules: Vec::new(),
            default: None,
            show_if: None,
            enable_if: None,
            options: Value::Null,
            component: None,
        }
    }

    /// Adds a rule.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(RawRule::Full(rule));
        self
    }

    /// Sets the `required` shorthand.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Sets the visibility expression.
    pub fn show_if(mut self, condition: Condition) -> Self {
        self.show_if = Some(condition);
        self
    }

    /// Sets the enablement expression.
    pub fn enable_if(mut self, condition: Condition) -> Self {
        self.enable_if = Some(condition);
        self
    }
}

/// A rule as written: either a full tagged rule or a bare name for
/// parameterless rules (`"required"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRule {
    Shorthand(String),
    Full(Rule),
}

impl RawRule {
    /// Expands shorthand into a full rule.
    pub fn expand(&self) -> Result<Rule, String> {
        match self {
            Self::Full(rule) => Ok(rule.clone()),
            Self::Shorthand(name) => match name.as_str() {
                "required" => Ok(Rule::required()),
                other => Err(format!("'{other}' cannot be written without parameters")),
            },
        }
    }
}

impl From<Rule> for RawRule {
    fn from(rule: Rule) -> Self {
        Self::Full(rule)
    }
}
