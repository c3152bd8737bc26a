//! Active-set computation.

use crate::error::DependencyResult;
use crate::graph::DependencyGraph;
use formwright_model::{CanonicalSchema, Condition, FieldPresence};
use formwright_types::{FieldId, ValueSnapshot};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Visibility and enablement of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Activity {
    pub visible: bool,
    pub enabled: bool,
}

impl Activity {
    /// Visible and enabled.
    pub const ACTIVE: Self = Self {
        visible: true,
        enabled: true,
    };

    /// Active fields are validated and submitted.
    pub fn is_active(&self) -> bool {
        self.visible && self.enabled
    }
}

impl Default for Activity {
    fn default() -> Self {
        Self::ACTIVE
    }
}

/// Activity of every evaluated field.
pub type ActiveSet = BTreeMap<FieldId, Activity>;

#[derive(Debug, Clone, Default)]
struct Gates {
    show_if: Option<Condition>,
    enable_if: Option<Condition>,
}

/// Evaluates `show_if` / `enable_if` for a fixed schema.
///
/// `present` / `absent` tests judge the referenced field through its own
/// handler, so an unchecked checkbox reads as absent.
#[derive(Debug, Clone)]
pub struct Evaluator {
    graph: DependencyGraph,
    gates: HashMap<FieldId, Gates>,
    presence: FieldPresence,
}

impl Evaluator {
    /// Builds the dependency graph, rejecting condition cycles.
    pub fn new(schema: &CanonicalSchema) -> DependencyResult<Self> {
        let graph = DependencyGraph::build(schema)?;
        let gates = schema
            .nodes()
            .filter(|node| node.show_if.is_some() || node.enable_if.is_some())
            .map(|node| {
                let gates = Gates {
                    show_if: node.show_if.clone(),
                    enable_if: node.enable_if.clone(),
                };
                (node.id.clone(), gates)
            })
            .collect();
        debug!(fields = graph.order().len(), "Evaluator built");
        Ok(Self {
            graph,
            gates,
            presence: FieldPresence::of(schema),
        })
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Activity of a single field. Unknown ids and ungated fields are active.
    pub fn activity(&self, id: &str, snapshot: &ValueSnapshot) -> Activity {
        let Some(gates) = self.gates.get(id) else {
            return Activity::ACTIVE;
        };
        let holds = |gate: &Option<Condition>| {
            gate.as_ref()
                .is_none_or(|c| c.evaluate_with(snapshot, &self.presence))
        };
        Activity {
            visible: holds(&gates.show_if),
            enabled: holds(&gates.enable_if),
        }
    }

    /// Activity of every field.
    pub fn evaluate(&self, snapshot: &ValueSnapshot) -> ActiveSet {
        self.graph
            .order()
            .iter()
            .map(|id| (id.clone(), self.activity(id.as_str(), snapshot)))
            .collect()
    }

    /// Activity of just `ids`, in evaluation order.
    pub fn evaluate_fields<'a, I>(&self, ids: I, snapshot: &ValueSnapshot) -> ActiveSet
    where
        I: IntoIterator<Item = &'a FieldId>,
    {
        let wanted: BTreeSet<&FieldId> = ids.into_iter().collect();
        self.graph
            .order()
            .iter()
            .filter(|id| wanted.contains(id))
            .map(|id| (id.clone(), self.activity(id.as_str(), snapshot)))
            .collect()
    }

    /// Fields whose conditions read any of `changed`.
    pub fn affected_by<'a, I>(&self, changed: I) -> BTreeSet<FieldId>
    where
        I: IntoIterator<Item = &'a FieldId>,
    {
        changed
            .into_iter()
            .flat_map(|id| self.graph.condition_dependents(id.as_str()))
            .cloned()
            .collect()
    }
}

/// One-shot active-set computation.
pub fn compute_active_set(
    schema: &CanonicalSchema,
    snapshot: &ValueSnapshot,
) -> DependencyResult<ActiveSet> {
    Ok(Evaluator::new(schema)?.evaluate(snapshot))
}
