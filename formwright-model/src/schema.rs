//! The canonical, normalized schema.

use crate::condition::{Condition, Presence};
use crate::rule::Rule;
use formwright_registry::FieldHandler;
use formwright_types::{is_empty_value, FieldId};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// A normalized field: shorthand expanded, default filled in, type resolved.
///
/// The data fields serialize back to the plain keyed structure the host
/// wrote; the resolved handler and source location are runtime-only.
#[derive(Clone, Serialize)]
pub struct FieldNode {
    pub id: FieldId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub rules: Vec<Rule>,
    pub default: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_if: Option<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_if: Option<Condition>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub options: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(skip)]
    pub(crate) handler: Arc<dyn FieldHandler>,
    #[serde(skip)]
    pub(crate) location: String,
}

impl FieldNode {
    /// The handler resolved for this node's type at normalization time.
    pub fn handler(&self) -> &Arc<dyn FieldHandler> {
        &self.handler
    }

    /// Where the node sits in the raw schema, e.g. `sections[0].fields[2]`.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Fields read by this node's `show_if` / `enable_if` expressions.
    pub fn condition_references(&self) -> BTreeSet<FieldId> {
        self.show_if
            .iter()
            .chain(self.enable_if.iter())
            .flat_map(Condition::references)
            .collect()
    }

    /// Fields read by this node's rules.
    pub fn rule_references(&self) -> BTreeSet<FieldId> {
        self.rules.iter().flat_map(Rule::references).collect()
    }
}

impl fmt::Debug for FieldNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldNode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("rules", &self.rules)
            .field("default", &self.default)
            .field("show_if", &self.show_if)
            .field("enable_if", &self.enable_if)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// One section of the ordered render tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub fields: Vec<FieldId>,
    pub sections: Vec<RenderSection>,
}

/// The normalized form description: a flat id → node map, the flat field
/// order, and the nested render tree.
#[derive(Debug, Clone, Default)]
pub struct CanonicalSchema {
    pub(crate) nodes: HashMap<FieldId, FieldNode>,
    pub(crate) order: Vec<FieldId>,
    pub(crate) tree: Vec<RenderSection>,
}

impl CanonicalSchema {
    /// Looks up a node by id.
    pub fn node(&self, id: &str) -> Option<&FieldNode> {
        self.nodes.get(id)
    }

    /// Returns true if the schema defines `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes in render order.
    pub fn nodes(&self) -> impl Iterator<Item = &FieldNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Field ids in render order.
    pub fn field_ids(&self) -> &[FieldId] {
        &self.order
    }

    /// The nested render tree.
    pub fn tree(&self) -> &[RenderSection] {
        &self.tree
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Handler-aware emptiness for every field of a schema.
///
/// Conditions evaluated through this judge `present` / `absent` with the
/// referenced field's [`FieldHandler::is_empty`]. Ids the schema does not
/// define fall back to [`is_empty_value`]. Cheap to clone.
#[derive(Clone, Default)]
pub struct FieldPresence(Arc<HashMap<FieldId, Arc<dyn FieldHandler>>>);

impl FieldPresence {
    /// Captures the handler of every node in `schema`.
    pub fn of(schema: &CanonicalSchema) -> Self {
        let handlers = schema
            .nodes
            .iter()
            .map(|(id, node)| (id.clone(), Arc::clone(&node.handler)))
            .collect();
        Self(Arc::new(handlers))
    }
}

impl Presence for FieldPresence {
    fn is_empty(&self, field: &str, value: &Value) -> bool {
        match self.0.get(field) {
            Some(handler) => handler.is_empty(value),
            None => is_empty_value(value),
        }
    }
}

impl fmt::Debug for FieldPresence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldPresence").field(&self.0.len()).finish()
    }
}
