use formwright_model::{
    normalize, normalize_json, Condition, NormalizationError, RawNode, RawSchema, RawSection, Rule,
};
use formwright_registry::{BasicHandler, FieldTypeRegistry};
use formwright_types::{FieldId, RuleKind, ValueShape};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn registry() -> FieldTypeRegistry {
    FieldTypeRegistry::with_builtins()
}

// ── Shorthand & defaults ─────────────────────────────────────────

#[test]
fn omitted_type_defaults_to_text() {
    let schema = normalize_json(r#"{"fields": [{"id": "name"}]}"#, &registry().snapshot()).unwrap();
    let node = schema.node("name").unwrap();
    assert_eq!(node.kind, "text");
    assert_eq!(node.default, json!(""));
}

#[test]
fn required_flag_becomes_leading_rule() {
    let json = r#"{"fields": [{
        "id": "email",
        "required": true,
        "rules": [{"rule": "pattern", "pattern": "@"}]
    }]}"#;
    let schema = normalize_json(json, &registry().snapshot()).unwrap();
    let kinds: Vec<RuleKind> = schema.node("email").unwrap().rules.iter().map(Rule::kind).collect();
    assert_eq!(kinds, vec![RuleKind::Required, RuleKind::Pattern]);
}

#[test]
fn required_flag_not_duplicated() {
    let json = r#"{"fields": [{"id": "a", "required": true, "rules": ["required"]}]}"#;
    let schema = normalize_json(json, &registry().snapshot()).unwrap();
    assert_eq!(schema.node("a").unwrap().rules, vec![Rule::required()]);
}

#[test]
fn shorthand_rule_needing_parameters_is_rejected() {
    let json = r#"{"fields": [{"id": "a", "rules": ["pattern"]}]}"#;
    let err = normalize_json(json, &registry().snapshot()).unwrap_err();
    assert!(matches!(err, NormalizationError::InvalidRule { .. }));
}

#[test]
fn handler_default_fills_missing_default() {
    let json = r#"{"fields": [
        {"id": "tags", "type": "multiselect"},
        {"id": "agree", "type": "checkbox"},
        {"id": "age", "type": "number", "default": 30}
    ]}"#;
    let schema = normalize_json(json, &registry().snapshot()).unwrap();
    assert_eq!(schema.node("tags").unwrap().default, json!([]));
    assert_eq!(schema.node("agree").unwrap().default, json!(false));
    assert_eq!(schema.node("age").unwrap().default, json!(30));
}

#[test]
fn rejected_default_is_an_error() {
    let json = r#"{"fields": [{"id": "age", "type": "number", "default": "thirty"}]}"#;
    let err = normalize_json(json, &registry().snapshot()).unwrap_err();
    assert_eq!(
        err,
        NormalizationError::InvalidDefault {
            id: FieldId::new("age"),
            kind: "number".into()
        }
    );
}

// ── Flattening ───────────────────────────────────────────────────

#[test]
fn nested_sections_flatten_in_order() {
    let raw = RawSchema {
        fields: vec![RawNode::new("first", "text")],
        sections: vec![RawSection {
            id: Some("personal".into()),
            title: Some("Personal".into()),
            fields: vec![RawNode::new("name", "text")],
            sections: vec![RawSection {
                id: Some("address".into()),
                fields: vec![RawNode::new("street", "text"), RawNode::new("zip", "text")],
                ..RawSection::default()
            }],
        }],
    };
    let schema = normalize(&raw, &registry().snapshot()).unwrap();

    let order: Vec<&str> = schema.field_ids().iter().map(FieldId::as_str).collect();
    assert_eq!(order, vec!["first", "name", "street", "zip"]);
    assert_eq!(schema.tree().len(), 2);
    assert_eq!(schema.tree()[1].title.as_deref(), Some("Personal"));
    assert_eq!(schema.tree()[1].sections[0].fields.len(), 2);
    assert_eq!(schema.node("zip").unwrap().location(), "sections[0].sections[0].fields[1]");
}

#[test]
fn empty_schema_is_valid() {
    let schema = normalize(&RawSchema::default(), &registry().snapshot()).unwrap();
    assert!(schema.is_empty());
}

// ── Rejections ───────────────────────────────────────────────────

#[test]
fn duplicate_id_names_both_locations() {
    let raw = RawSchema {
        fields: vec![RawNode::new("email", "text")],
        sections: vec![RawSection {
            fields: vec![RawNode::new("other", "text"), RawNode::new("email", "email")],
            ..RawSection::default()
        }],
    };
    let err = normalize(&raw, &registry().snapshot()).unwrap_err();
    assert_eq!(
        err,
        NormalizationError::DuplicateId {
            id: FieldId::new("email"),
            first: "fields[0]".into(),
            second: "sections[0].fields[1]".into(),
        }
    );
    assert!(err.to_string().contains("fields[0]"));
    assert!(err.to_string().contains("sections[0].fields[1]"));
}

#[test]
fn unknown_type_is_an_error_not_a_skip() {
    let json = r#"{"fields": [{"id": "stars", "type": "rating"}]}"#;
    let err = normalize_json(json, &registry().snapshot()).unwrap_err();
    assert_eq!(
        err,
        NormalizationError::UnknownType {
            id: FieldId::new("stars"),
            kind: "rating".into(),
            location: "fields[0]".into(),
        }
    );
}

#[test]
fn custom_type_resolves_once_registered() {
    let registry = registry();
    registry.register(
        "rating",
        Arc::new(BasicHandler::new(ValueShape::Number).with_default(json!(3))),
    );
    let json = r#"{"fields": [{"id": "stars", "type": "rating"}]}"#;
    let schema = normalize_json(json, &registry.snapshot()).unwrap();
    assert_eq!(schema.node("stars").unwrap().default, json!(3));
}

#[test]
fn unsupported_rule_is_rejected() {
    let raw = RawSchema {
        fields: vec![RawNode::new("age", "number").with_rule(Rule::Pattern {
            pattern: "^[0-9]+$".into(),
            message: None,
        })],
        ..RawSchema::default()
    };
    let err = normalize(&raw, &registry().snapshot()).unwrap_err();
    assert!(matches!(
        err,
        NormalizationError::UnsupportedRule { rule: RuleKind::Pattern, .. }
    ));
}

#[test]
fn invalid_pattern_is_rejected() {
    let json = r#"{"fields": [{"id": "a", "rules": [{"rule": "pattern", "pattern": "("}]}]}"#;
    let err = normalize_json(json, &registry().snapshot()).unwrap_err();
    assert!(matches!(err, NormalizationError::InvalidPattern { .. }));
}

#[test]
fn malformed_condition_is_rejected() {
    let json = r#"{"fields": [{"id": "a", "show_if": {"field": "b", "op": "eq"}}]}"#;
    let err = normalize_json(json, &registry().snapshot()).unwrap_err();
    assert!(matches!(err, NormalizationError::InvalidCondition { .. }));
}

#[test]
fn blank_id_is_rejected() {
    let json = r#"{"fields": [{"id": " "}]}"#;
    let err = normalize_json(json, &registry().snapshot()).unwrap_err();
    assert_eq!(err, NormalizationError::EmptyId { location: "fields[0]".into() });
}

#[test]
fn bad_json_is_a_parse_error() {
    let err = normalize_json("{", &registry().snapshot()).unwrap_err();
    assert!(matches!(err, NormalizationError::Parse(_)));
}

// ── Conditions in schema ─────────────────────────────────────────

#[test]
fn conditions_deserialize_from_json() {
    let json = r#"{"fields": [
        {"id": "age", "type": "number"},
        {"id": "guardian", "show_if": {"all": [
            {"field": "age", "op": "lt", "value": 18},
            {"not": {"field": "age", "op": "absent"}}
        ]}}
    ]}"#;
    let schema = normalize_json(json, &registry().snapshot()).unwrap();
    let node = schema.node("guardian").unwrap();
    assert_eq!(
        node.show_if,
        Some(Condition::all(vec![
            Condition::lt("age", json!(18)),
            Condition::negate(Condition::absent("age")),
        ]))
    );
    assert_eq!(
        node.condition_references().into_iter().collect::<Vec<_>>(),
        vec![FieldId::new("age")]
    );
}
