//! Built-in field types seeded into every registry created with
//! [`FieldTypeRegistry::with_builtins`](crate::FieldTypeRegistry::with_builtins).

use crate::handler::{BasicHandler, FieldHandler};
use formwright_types::{RuleKind, ValueShape};
use serde_json::{json, Value};
use std::sync::Arc;

const TEXT_RULES: &[RuleKind] = &RuleKind::ALL;

const NUMBER_RULES: &[RuleKind] = &[
    RuleKind::Required,
    RuleKind::RequiredIf,
    RuleKind::Min,
    RuleKind::Max,
    RuleKind::OneOf,
    RuleKind::Compare,
    RuleKind::Custom,
];

const CHOICE_RULES: &[RuleKind] = &[
    RuleKind::Required,
    RuleKind::RequiredIf,
    RuleKind::OneOf,
    RuleKind::Compare,
    RuleKind::Custom,
];

const MULTI_CHOICE_RULES: &[RuleKind] = &[
    RuleKind::Required,
    RuleKind::RequiredIf,
    RuleKind::Min,
    RuleKind::Max,
    RuleKind::Custom,
];

const DATE_RULES: &[RuleKind] = &[
    RuleKind::Required,
    RuleKind::RequiredIf,
    RuleKind::Pattern,
    RuleKind::Compare,
    RuleKind::Custom,
];

const CHECKBOX_RULES: &[RuleKind] = &[
    RuleKind::Required,
    RuleKind::RequiredIf,
    RuleKind::Compare,
    RuleKind::Custom,
];

/// A boolean toggle. Unchecked (`false`) counts as empty, so `required`
/// means "must be checked".
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckboxHandler;

impl FieldHandler for CheckboxHandler {
    fn value_shape(&self) -> ValueShape {
        ValueShape::Boolean
    }

    fn default_value(&self) -> Value {
        Value::Bool(false)
    }

    fn accepted_rules(&self) -> &[RuleKind] {
        CHECKBOX_RULES
    }

    fn is_empty(&self, value: &Value) -> bool {
        !matches!(value, Value::Bool(true))
    }
}

fn entry(
    discriminator: &'static str,
    handler: impl FieldHandler + 'static,
) -> (&'static str, Arc<dyn FieldHandler>) {
    (discriminator, Arc::new(handler))
}

/// Returns the built-in `(discriminator, handler)` pairs.
pub fn builtin_handlers() -> Vec<(&'static str, Arc<dyn FieldHandler>)> {
    let text = BasicHandler::new(ValueShape::Text)
        .with_default(json!(""))
        .with_rules(TEXT_RULES);

    vec![
        entry("text", text.clone()),
        entry("textarea", text.clone()),
        entry("email", text),
        entry(
            "number",
            BasicHandler::new(ValueShape::Number).with_rules(NUMBER_RULES),
        ),
        entry("checkbox", CheckboxHandler),
        entry(
            "select",
            BasicHandler::new(ValueShape::Any).with_rules(CHOICE_RULES),
        ),
        entry(
            "multiselect",
            BasicHandler::new(ValueShape::List)
                .with_default(json!([]))
                .with_rules(MULTI_CHOICE_RULES)
                .with_multiple(true),
        ),
        entry(
            "date",
            BasicHandler::new(ValueShape::Text).with_rules(DATE_RULES),
        ),
        entry("hidden", BasicHandler::new(ValueShape::Any)),
    ]
}
