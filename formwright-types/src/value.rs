//! Value maps, snapshots and comparison helpers.

use crate::FieldId;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

/// Field values keyed by id, ordered for deterministic iteration.
pub type ValueMap = BTreeMap<FieldId, Value>;

static ABSENT: Value = Value::Null;

/// An immutable, cheaply clonable view of every field value at one instant.
///
/// Cross-field rules and condition expressions read from a snapshot rather
/// than subscribing to individual fields. Looking up an id that is not in the
/// snapshot yields `Null` (absent) instead of failing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueSnapshot(Arc<ValueMap>);

impl ValueSnapshot {
    /// Wraps a value map.
    #[must_use]
    pub fn new(values: ValueMap) -> Self {
        Self(Arc::new(values))
    }

    /// Returns the value for `id`, or `Null` when the id is unknown.
    pub fn get(&self, id: &str) -> &Value {
        self.0.get(id).unwrap_or(&ABSENT)
    }

    /// Returns true if the snapshot holds an entry for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    /// Returns the underlying map.
    pub fn values(&self) -> &ValueMap {
        &self.0
    }

    /// Sets the value for `id`. Copies the map first only if another clone of
    /// this snapshot is still alive.
    pub fn insert(&mut self, id: FieldId, value: Value) {
        Arc::make_mut(&mut self.0).insert(id, value);
    }
}

impl Deref for ValueSnapshot {
    type Target = ValueMap;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<ValueMap> for ValueSnapshot {
    fn from(values: ValueMap) -> Self {
        Self::new(values)
    }
}

impl FromIterator<(FieldId, Value)> for ValueSnapshot {
    fn from_iter<I: IntoIterator<Item = (FieldId, Value)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Returns true if a value counts as "not filled in".
///
/// Empty means `Null`, a whitespace-only string, an empty array or an empty
/// object. `false` and `0` are values, not emptiness.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Equality with numeric normalisation: `1` equals `1.0`.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => left == right,
    }
}

/// Orders two values of the same primitive kind.
///
/// Numbers compare numerically, strings lexicographically, booleans with
/// `false < true`. Mixed kinds, `Null`, arrays and objects are unordered.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
