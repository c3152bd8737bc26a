//! The dependency expression language used by `show_if`, `enable_if` and
//! `required_if`.
//!
//! ```json
//! { "all": [
//!     { "field": "age", "op": "lt", "value": 18 },
//!     { "any": [
//!         { "field": "country", "op": "in", "values": ["DE", "AT"] },
//!         { "not": { "field": "consent", "op": "present" } }
//!     ]}
//! ]}
//! ```
//!
//! Expressions read values only. A referenced field that is hidden still
//! contributes its last-known value; an unknown field id reads as absent.

use formwright_types::{is_empty_value, Comparison, FieldId, ValueSnapshot};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Decides whether a referenced field's value counts as filled in for
/// `present` / `absent` tests.
pub trait Presence {
    fn is_empty(&self, field: &str, value: &Value) -> bool;
}

/// Judges every field with [`is_empty_value`], ignoring field types.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericPresence;

impl Presence for GenericPresence {
    fn is_empty(&self, _field: &str, value: &Value) -> bool {
        is_empty_value(value)
    }
}

/// A boolean expression over field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    /// True when every nested condition is true.
    All { all: Vec<Condition> },
    /// True when at least one nested condition is true.
    Any { any: Vec<Condition> },
    /// Negation.
    Not { not: Box<Condition> },
    /// A test against one field's value.
    Test(FieldTest),
}

/// Operator of a [`FieldTest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Present,
    Absent,
}

impl TestOp {
    fn comparison(self) -> Option<Comparison> {
        match self {
            Self::Eq => Some(Comparison::Eq),
            Self::Ne => Some(Comparison::Ne),
            Self::Lt => Some(Comparison::Lt),
            Self::Le => Some(Comparison::Le),
            Self::Gt => Some(Comparison::Gt),
            Self::Ge => Some(Comparison::Ge),
            Self::In | Self::NotIn | Self::Present | Self::Absent => None,
        }
    }
}

/// `field op operand`, where the operand is a literal (`value`), another
/// field (`other`), a literal list (`values`) or nothing (`present`/`absent`).
/// A literal `null` is a value like any other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldTest {
    pub field: FieldId,
    pub op: TestOp,
    #[serde(default, deserialize_with = "literal_operand", skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other: Option<FieldId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
}

/// Maps a key that is present (even as `null`) to `Some`.
fn literal_operand<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl FieldTest {
    fn new(field: impl Into<FieldId>, op: TestOp) -> Self {
        Self {
            field: field.into(),
            op,
            value: None,
            other: None,
            values: Vec::new(),
        }
    }

    fn evaluate(&self, snapshot: &ValueSnapshot, presence: &dyn Presence) -> bool {
        let left = snapshot.get(self.field.as_str());
        match self.op {
            TestOp::Present => !presence.is_empty(self.field.as_str(), left),
            TestOp::Absent => presence.is_empty(self.field.as_str(), left),
            TestOp::In => self.values.iter().any(|v| Comparison::Eq.holds(left, v)),
            TestOp::NotIn => !self.values.iter().any(|v| Comparison::Eq.holds(left, v)),
            op => {
                let Some(comparison) = op.comparison() else {
                    return false;
                };
                let right = match (&self.value, &self.other) {
                    (Some(value), _) => value,
                    (None, Some(other)) => snapshot.get(other.as_str()),
                    (None, None) => &Value::Null,
                };
                comparison.holds(left, right)
            }
        }
    }

    fn check(&self) -> Result<(), String> {
        if self.field.is_blank() {
            return Err("test has an empty field id".into());
        }
        let has_value = self.value.is_some();
        let has_other = self.other.is_some();
        let has_values = !self.values.is_empty();
        match self.op {
            TestOp::Present | TestOp::Absent => {
                if has_value || has_other || has_values {
                    return Err(format!("'{:?}' on '{}' takes no operand", self.op, self.field));
                }
            }
            TestOp::In | TestOp::NotIn => {
                if !has_values || has_value || has_other {
                    return Err(format!(
                        "'{:?}' on '{}' needs a non-empty 'values' list and nothing else",
                        self.op, self.field
                    ));
                }
            }
            _ => {
                if has_value == has_other || has_values {
                    return Err(format!(
                        "'{:?}' on '{}' needs exactly one of 'value' or 'other'",
                        self.op, self.field
                    ));
                }
            }
        }
        Ok(())
    }
}

impl Condition {
    /// `field == value`
    pub fn eq(field: impl Into<FieldId>, value: Value) -> Self {
        Self::literal(field, TestOp::Eq, value)
    }

    /// `field != value`
    pub fn ne(field: impl Into<FieldId>, value: Value) -> Self {
        Self::literal(field, TestOp::Ne, value)
    }

    /// `field < value`
    pub fn lt(field: impl Into<FieldId>, value: Value) -> Self {
        Self::literal(field, TestOp::Lt, value)
    }

    /// `field >= value`
    pub fn ge(field: impl Into<FieldId>, value: Value) -> Self {
        Self::literal(field, TestOp::Ge, value)
    }

    /// `field op other_field`
    pub fn against(field: impl Into<FieldId>, op: TestOp, other: impl Into<FieldId>) -> Self {
        let mut test = FieldTest::new(field, op);
        test.other = Some(other.into());
        Self::Test(test)
    }

    /// `field in values`
    pub fn one_of(field: impl Into<FieldId>, values: Vec<Value>) -> Self {
        let mut test = FieldTest::new(field, TestOp::In);
        test.values = values;
        Self::Test(test)
    }

    /// The field holds a non-empty value.
    pub fn present(field: impl Into<FieldId>) -> Self {
        Self::Test(FieldTest::new(field, TestOp::Present))
    }

    /// The field is empty or absent.
    pub fn absent(field: impl Into<FieldId>) -> Self {
        Self::Test(FieldTest::new(field, TestOp::Absent))
    }

    /// Conjunction.
    pub fn all(conditions: Vec<Condition>) -> Self {
        Self::All { all: conditions }
    }

    /// Disjunction.
    pub fn any(conditions: Vec<Condition>) -> Self {
        Self::Any { any: conditions }
    }

    /// Negation.
    pub fn negate(condition: Condition) -> Self {
        Self::Not {
            not: Box::new(condition),
        }
    }

    fn literal(field: impl Into<FieldId>, op: TestOp, value: Value) -> Self {
        let mut test = FieldTest::new(field, op);
        test.value = Some(value);
        Self::Test(test)
    }

    /// Evaluates the expression against a value snapshot, judging
    /// `present` / `absent` with [`GenericPresence`].
    pub fn evaluate(&self, snapshot: &ValueSnapshot) -> bool {
        self.evaluate_with(snapshot, &GenericPresence)
    }

    /// Evaluates the expression, asking `presence` whether a field is filled
    /// in. Use a [`FieldPresence`](crate::FieldPresence) so that an unchecked
    /// checkbox reads as absent, the same way `required` sees it.
    pub fn evaluate_with(&self, snapshot: &ValueSnapshot, presence: &dyn Presence) -> bool {
        match self {
            Self::All { all } => all.iter().all(|c| c.evaluate_with(snapshot, presence)),
            Self::Any { any } => any.iter().any(|c| c.evaluate_with(snapshot, presence)),
            Self::Not { not } => !not.evaluate_with(snapshot, presence),
            Self::Test(test) => test.evaluate(snapshot, presence),
        }
    }

    /// Every field id the expression reads.
    pub fn references(&self) -> BTreeSet<FieldId> {
        let mut out = BTreeSet::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut BTreeSet<FieldId>) {
        match self {
            Self::All { all: list } | Self::Any { any: list } => {
                for c in list {
                    c.collect_references(out);
                }
            }
            Self::Not { not } => not.collect_references(out),
            Self::Test(test) => {
                out.insert(test.field.clone());
                if let Some(other) = &test.other {
                    out.insert(other.clone());
                }
            }
        }
    }

    /// Checks operand arity and non-empty combinators.
    pub fn check(&self) -> Result<(), String> {
        match self {
            Self::All { all: list } | Self::Any { any: list } => {
                if list.is_empty() {
                    return Err("'all'/'any' needs at least one condition".into());
                }
                list.iter().try_for_each(Condition::check)
            }
            Self::Not { not } => not.check(),
            Self::Test(test) => test.check(),
        }
    }
}
