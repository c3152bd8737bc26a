//! Host-supplied partial overrides of a canonical schema.

use crate::condition::Condition;
use crate::error::{OverrideError, OverrideResult};
use crate::normalize::{check_node, expand_rules};
use crate::raw::{RawNode, RawRule};
use crate::schema::{CanonicalSchema, FieldNode};
use formwright_registry::RegistrySnapshot;
use formwright_types::{FieldId, ValueMap};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::info;

/// A partial schema/value patch, applied once and then discarded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverridePatch {
    /// Node-level replacements keyed by field id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<FieldId, NodePatch>,
    /// Values to write into the form once the schema part is applied.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: ValueMap,
}

impl OverridePatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.values.is_empty()
    }
}

/// Keys present in a node patch replace the canonical key wholesale; rule
/// lists are replaced, never appended to. For optional keys, an explicit
/// `null` clears the key while an omitted key leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub label: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<RawRule>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub show_if: Option<Option<Condition>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub enable_if: Option<Option<Condition>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub component: Option<Option<String>>,
}

/// Maps a key that is present (even as `null`) to `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Merges `patch` into `schema`, returning the patched copy.
///
/// Fields not named in the patch are carried over untouched. Naming an id the
/// schema does not define is an error, never an insertion. The input schema
/// is not modified, so a failed override leaves the caller's state intact.
pub fn apply_overrides(
    schema: &CanonicalSchema,
    patch: &OverridePatch,
    registry: &RegistrySnapshot,
) -> OverrideResult<CanonicalSchema> {
    for id in patch.fields.keys().chain(patch.values.keys()) {
        if !schema.contains(id.as_str()) {
            return Err(OverrideError::UnknownField(id.clone()));
        }
    }

    let mut next = schema.clone();
    for (id, node_patch) in &patch.fields {
        let Some(node) = next.nodes.get_mut(id.as_str()) else {
            return Err(OverrideError::UnknownField(id.clone()));
        };
        patch_node(node, node_patch, registry)?;
    }

    for (id, value) in &patch.values {
        let Some(node) = next.node(id.as_str()) else {
            continue;
        };
        if !node.handler().accepts(value) {
            return Err(OverrideError::InvalidValue {
                id: id.clone(),
                kind: node.kind.clone(),
            });
        }
    }

    info!(
        fields = patch.fields.len(),
        values = patch.values.len(),
        "Overrides applied"
    );
    Ok(next)
}

fn patch_node(
    node: &mut FieldNode,
    patch: &NodePatch,
    registry: &RegistrySnapshot,
) -> OverrideResult<()> {
    if let Some(kind) = &patch.kind {
        node.handler = registry
            .resolve(kind)
            .map_err(|_| OverrideError::UnknownType {
                id: node.id.clone(),
                kind: kind.clone(),
            })?;
        node.kind = kind.clone();
    }
    if let Some(label) = &patch.label {
        node.label = label.clone();
    }
    if let Some(rules) = &patch.rules {
        let mut raw = RawNode::new(node.id.clone(), node.kind.clone());
        raw.rules = rules.clone();
        node.rules = expand_rules(&raw)?;
    }
    if let Some(default) = &patch.default {
        node.default = default.clone();
    }
    if let Some(show_if) = &patch.show_if {
        node.show_if = show_if.clone();
    }
    if let Some(enable_if) = &patch.enable_if {
        node.enable_if = enable_if.clone();
    }
    if let Some(options) = &patch.options {
        node.options = options.clone();
    }
    if let Some(component) = &patch.component {
        node.component = component.clone();
    }
    if patch.kind.is_some() && patch.default.is_none() && !node.handler.accepts(&node.default) {
        node.default = node.handler.default_value();
    }
    check_node(node)?;
    Ok(())
}

/// Ids whose validator must be rebuilt after going from `before` to `after`:
/// the rule list changed, or the type (and with it the handler) changed.
pub fn changed_rule_fields(before: &CanonicalSchema, after: &CanonicalSchema) -> Vec<FieldId> {
    after
        .nodes()
        .filter(|node| match before.node(node.id.as_str()) {
            Some(old) => old.rules != node.rules || old.kind != node.kind,
            None => true,
        })
        .map(|node| node.id.clone())
        .collect()
}
