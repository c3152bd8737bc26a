//! Rule list → [`Validator`].

use crate::error::{CompileError, CompileResult};
use crate::messages;
use crate::predicate::{PredicateHandle, PredicateRegistry};
use crate::validator::{Check, Measure, Validator};
use formwright_model::{CanonicalSchema, FieldNode, FieldPresence, Rule};
use formwright_registry::FieldHandler;
use formwright_types::{FieldId, ValueShape};
use regex_lite::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Compiler settings shared by every validator of a form.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Message for rules whose host predicate faulted, and for `custom`
    /// rules without a message of their own.
    pub fallback_message: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            fallback_message: messages::FALLBACK.to_string(),
        }
    }
}

/// Compiles one node's rules into a validator.
///
/// The handler decides how emptiness is judged and whether `min`/`max`
/// measure the number itself or its length. `presence` judges the fields a
/// `required_if` condition reads.
pub fn compile(
    node: &FieldNode,
    handler: &Arc<dyn FieldHandler>,
    presence: &FieldPresence,
    predicates: &PredicateRegistry,
    options: &CompileOptions,
) -> CompileResult<Validator> {
    let measure = match handler.value_shape() {
        ValueShape::Number => Measure::Numeric,
        ValueShape::Text | ValueShape::List => Measure::Length,
        ValueShape::Boolean | ValueShape::Any => Measure::Auto,
    };

    let checks = node
        .rules
        .iter()
        .map(|rule| compile_rule(&node.id, rule, measure, presence, predicates))
        .collect::<CompileResult<Vec<_>>>()?;

    debug!(field = %node.id, rules = checks.len(), "Validator compiled");
    Ok(Validator::new(
        node.id.clone(),
        Arc::clone(handler),
        checks,
        node.rule_references(),
        options.fallback_message.clone(),
    ))
}

/// Compiles every node of a schema, keyed by field id.
pub fn compile_all(
    schema: &CanonicalSchema,
    predicates: &PredicateRegistry,
    options: &CompileOptions,
) -> CompileResult<HashMap<FieldId, Validator>> {
    let presence = FieldPresence::of(schema);
    schema
        .nodes()
        .map(|node| {
            let validator = compile(node, node.handler(), &presence, predicates, options)?;
            Ok((node.id.clone(), validator))
        })
        .collect()
}

fn compile_rule(
    field: &FieldId,
    rule: &Rule,
    measure: Measure,
    presence: &FieldPresence,
    predicates: &PredicateRegistry,
) -> CompileResult<Check> {
    let message = rule.message().map(str::to_string);
    let check = match rule {
        Rule::Required { .. } => Check::Required {
            message: message.unwrap_or_else(|| messages::REQUIRED.to_string()),
        },
        Rule::RequiredIf { when, .. } => Check::RequiredIf {
            when: when.clone(),
            presence: presence.clone(),
            message: message.unwrap_or_else(|| messages::REQUIRED.to_string()),
        },
        Rule::Pattern { pattern, .. } => Check::Pattern {
            regex: Regex::new(pattern).map_err(|e| CompileError::InvalidPattern {
                field: field.clone(),
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?,
            message: message.unwrap_or_else(|| messages::PATTERN.to_string()),
        },
        Rule::Min { value, .. } => Check::Bound {
            limit: *value,
            lower: true,
            measure,
            message,
        },
        Rule::Max { value, .. } => Check::Bound {
            limit: *value,
            lower: false,
            measure,
            message,
        },
        Rule::OneOf { values, .. } => Check::OneOf {
            values: values.clone(),
            message: message.unwrap_or_else(|| messages::ONE_OF.to_string()),
        },
        Rule::Compare { field: other, op, .. } => Check::Compare {
            other: other.clone(),
            op: *op,
            message: message.unwrap_or_else(|| messages::compare(*op, other)),
        },
        Rule::Custom { name, .. } => {
            let handle = predicates
                .get(name)
                .ok_or_else(|| CompileError::UnknownPredicate {
                    field: field.clone(),
                    name: name.clone(),
                })?;
            match handle {
                PredicateHandle::Sync(predicate) => Check::Predicate {
                    name: name.clone(),
                    predicate: Arc::clone(predicate),
                    message,
                },
                PredicateHandle::Async(predicate) => Check::AsyncPredicate {
                    name: name.clone(),
                    predicate: Arc::clone(predicate),
                    message,
                },
            }
        }
    };
    Ok(check)
}
