//! Field-to-field dependency edges.

use crate::error::{DependencyCycleError, DependencyResult};
use formwright_model::CanonicalSchema;
use formwright_types::FieldId;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Who reads whom.
///
/// Condition edges come from `show_if` / `enable_if` and must be acyclic.
/// Rule edges come from `compare` and `required_if` and may form loops
/// (password and confirmation legitimately check each other).
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// field → fields its conditions read
    condition_inputs: HashMap<FieldId, BTreeSet<FieldId>>,
    /// field → fields whose conditions read it
    condition_dependents: HashMap<FieldId, BTreeSet<FieldId>>,
    /// field → fields whose rules read it
    rule_dependents: HashMap<FieldId, BTreeSet<FieldId>>,
    /// Every field after the fields its conditions read.
    order: Vec<FieldId>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

impl DependencyGraph {
    /// Builds the graph and its evaluation order.
    ///
    /// References to ids the schema does not contain are dropped with a
    /// warning; such fields always read as absent.
    pub fn build(schema: &CanonicalSchema) -> DependencyResult<Self> {
        let mut graph = Self::default();

        for node in schema.nodes() {
            let inputs: BTreeSet<FieldId> = node
                .condition_references()
                .into_iter()
                .filter(|dep| known(schema, &node.id, dep, "condition"))
                .collect();
            for dep in &inputs {
                graph
                    .condition_dependents
                    .entry(dep.clone())
                    .or_default()
                    .insert(node.id.clone());
            }
            graph.condition_inputs.insert(node.id.clone(), inputs);

            for dep in node.rule_references() {
                if known(schema, &node.id, &dep, "rule") {
                    graph
                        .rule_dependents
                        .entry(dep)
                        .or_default()
                        .insert(node.id.clone());
                }
            }
        }

        graph.order = graph.sort(schema.field_ids())?;
        Ok(graph)
    }

    /// Depth-first post-order over condition inputs, roots taken in schema
    /// order so the result is deterministic.
    fn sort(&self, roots: &[FieldId]) -> DependencyResult<Vec<FieldId>> {
        let mut marks: HashMap<&FieldId, Mark> = HashMap::with_capacity(roots.len());
        let mut order = Vec::with_capacity(roots.len());
        let mut stack = Vec::new();
        for root in roots {
            self.visit(root, &mut marks, &mut stack, &mut order)?;
        }
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        id: &'a FieldId,
        marks: &mut HashMap<&'a FieldId, Mark>,
        stack: &mut Vec<&'a FieldId>,
        order: &mut Vec<FieldId>,
    ) -> DependencyResult<()> {
        match marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = stack.iter().position(|f| *f == id).unwrap_or(0);
                let mut path: Vec<FieldId> = stack[start..].iter().map(|f| (*f).clone()).collect();
                path.push(id.clone());
                return Err(DependencyCycleError { path });
            }
            None => {}
        }

        marks.insert(id, Mark::Visiting);
        stack.push(id);
        if let Some(inputs) = self.condition_inputs.get(id) {
            for dep in inputs {
                self.visit(dep, marks, stack, order)?;
            }
        }
        stack.pop();
        marks.insert(id, Mark::Done);
        order.push(id.clone());
        Ok(())
    }

    /// Fields in evaluation order.
    pub fn order(&self) -> &[FieldId] {
        &self.order
    }

    /// Fields the conditions of `id` read.
    pub fn condition_inputs(&self, id: &str) -> impl Iterator<Item = &FieldId> {
        self.condition_inputs.get(id).into_iter().flatten()
    }

    /// Fields whose `show_if` / `enable_if` read `id`.
    pub fn condition_dependents(&self, id: &str) -> impl Iterator<Item = &FieldId> {
        self.condition_dependents.get(id).into_iter().flatten()
    }

    /// Fields whose rules read `id`.
    pub fn rule_dependents(&self, id: &str) -> impl Iterator<Item = &FieldId> {
        self.rule_dependents.get(id).into_iter().flatten()
    }
}

fn known(schema: &CanonicalSchema, from: &FieldId, dep: &FieldId, edge: &str) -> bool {
    let found = schema.contains(dep.as_str());
    if !found {
        warn!(
            field = %from,
            reference = %dep,
            edge,
            "Reference to unknown field, treated as absent"
        );
    }
    found
}
