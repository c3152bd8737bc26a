use formwright_conditions::{compute_active_set, Activity, DependencyCycleError, Evaluator};
use formwright_model::{normalize_json, CanonicalSchema};
use formwright_registry::FieldTypeRegistry;
use formwright_types::{FieldId, ValueSnapshot};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeSet;

fn schema(json: Value) -> CanonicalSchema {
    normalize_json(&json.to_string(), &FieldTypeRegistry::with_builtins().snapshot()).unwrap()
}

fn snap(pairs: &[(&str, Value)]) -> ValueSnapshot {
    pairs.iter().map(|(k, v)| (FieldId::from(*k), v.clone())).collect()
}

fn ids(list: &[&str]) -> Vec<FieldId> {
    list.iter().map(|s| FieldId::from(*s)).collect()
}

fn guardian_form() -> CanonicalSchema {
    schema(json!({"fields": [
        {"id": "age", "type": "number"},
        {"id": "guardianName", "show_if": {"field": "age", "op": "lt", "value": 18}},
        {"id": "newsletter", "type": "checkbox"},
        {"id": "email", "enable_if": {"field": "newsletter", "op": "eq", "value": true}}
    ]}))
}

// ── Activity ─────────────────────────────────────────────────────

#[test]
fn ungated_fields_are_active() {
    let active = compute_active_set(&guardian_form(), &ValueSnapshot::default()).unwrap();
    assert_eq!(active[&FieldId::from("age")], Activity::ACTIVE);
    assert_eq!(active.len(), 4);
}

#[test]
fn show_if_tracks_threshold() {
    let evaluator = Evaluator::new(&guardian_form()).unwrap();

    let minor = evaluator.evaluate(&snap(&[("age", json!(15))]));
    assert!(minor[&FieldId::from("guardianName")].is_active());

    let adult = evaluator.evaluate(&snap(&[("age", json!(30))]));
    let guardian = adult[&FieldId::from("guardianName")];
    assert!(!guardian.visible);
    assert!(guardian.enabled);
    assert!(!guardian.is_active());
}

#[test]
fn absent_reference_hides_ordering_test() {
    let evaluator = Evaluator::new(&guardian_form()).unwrap();
    let active = evaluator.evaluate(&ValueSnapshot::default());
    assert!(!active[&FieldId::from("guardianName")].visible);
}

#[test]
fn disabled_field_is_visible_but_inactive() {
    let evaluator = Evaluator::new(&guardian_form()).unwrap();
    let active = evaluator.evaluate(&snap(&[("newsletter", json!(false))]));
    assert_eq!(
        active[&FieldId::from("email")],
        Activity {
            visible: true,
            enabled: false
        }
    );
}

#[test]
fn hidden_field_value_still_feeds_conditions() {
    let form = schema(json!({"fields": [
        {"id": "mode"},
        {"id": "detail", "show_if": {"field": "mode", "op": "eq", "value": "advanced"}},
        {"id": "extra", "show_if": {"field": "detail", "op": "present"}}
    ]}));
    let evaluator = Evaluator::new(&form).unwrap();
    let active = evaluator.evaluate(&snap(&[("mode", json!("basic")), ("detail", json!("kept"))]));
    assert!(!active[&FieldId::from("detail")].visible);
    assert!(active[&FieldId::from("extra")].visible);
}

#[test]
fn unknown_reference_reads_absent() {
    let form = schema(json!({"fields": [
        {"id": "a", "show_if": {"field": "ghost", "op": "absent"}}
    ]}));
    let evaluator = Evaluator::new(&form).unwrap();
    assert!(evaluator.evaluate(&ValueSnapshot::default())[&FieldId::from("a")].visible);
    assert_eq!(evaluator.graph().condition_inputs("a").count(), 0);
}

#[test]
fn unchecked_checkbox_reads_absent() {
    let form = schema(json!({"fields": [
        {"id": "agree", "type": "checkbox", "default": false},
        {"id": "details", "required": true, "show_if": {"field": "agree", "op": "present"}},
        {"id": "reason", "show_if": {"field": "agree", "op": "absent"}}
    ]}));
    let evaluator = Evaluator::new(&form).unwrap();

    let unchecked = evaluator.evaluate(&snap(&[("agree", json!(false))]));
    assert!(!unchecked[&FieldId::from("details")].visible);
    assert!(unchecked[&FieldId::from("reason")].visible);

    let checked = evaluator.evaluate(&snap(&[("agree", json!(true))]));
    assert!(checked[&FieldId::from("details")].visible);
    assert!(!checked[&FieldId::from("reason")].visible);
}

#[test]
fn null_literal_compares_against_absent() {
    let form = schema(json!({"fields": [
        {"id": "a"},
        {"id": "b", "show_if": {"field": "a", "op": "ne", "value": null}}
    ]}));
    let evaluator = Evaluator::new(&form).unwrap();
    assert!(!evaluator.evaluate(&ValueSnapshot::default())[&FieldId::from("b")].visible);
    assert!(evaluator.evaluate(&snap(&[("a", json!("x"))]))[&FieldId::from("b")].visible);
}

// ── Incremental ──────────────────────────────────────────────────

#[test]
fn affected_by_lists_condition_dependents_only() {
    let form = schema(json!({"fields": [
        {"id": "age", "type": "number"},
        {"id": "guardianName", "show_if": {"field": "age", "op": "lt", "value": 18}},
        {"id": "retirement", "show_if": {"field": "age", "op": "ge", "value": 65}},
        {"id": "confirmAge", "type": "number", "rules": [
            {"rule": "compare", "field": "age", "op": "eq"}
        ]}
    ]}));
    let evaluator = Evaluator::new(&form).unwrap();

    let affected = evaluator.affected_by(&ids(&["age"]));
    assert_eq!(affected, BTreeSet::from_iter(ids(&["guardianName", "retirement"])));
    assert_eq!(
        evaluator.graph().rule_dependents("age").cloned().collect::<Vec<_>>(),
        ids(&["confirmAge"])
    );
    assert!(evaluator.affected_by(&ids(&["guardianName"])).is_empty());
}

#[test]
fn evaluate_fields_returns_requested_subset() {
    let evaluator = Evaluator::new(&guardian_form()).unwrap();
    let subset = evaluator.evaluate_fields(&ids(&["guardianName"]), &snap(&[("age", json!(40))]));
    assert_eq!(subset.len(), 1);
    assert!(!subset[&FieldId::from("guardianName")].visible);
}

#[test]
fn order_puts_inputs_first() {
    let form = schema(json!({"fields": [
        {"id": "c", "show_if": {"field": "b", "op": "present"}},
        {"id": "b", "show_if": {"field": "a", "op": "present"}},
        {"id": "a"}
    ]}));
    let evaluator = Evaluator::new(&form).unwrap();
    assert_eq!(evaluator.graph().order(), ids(&["a", "b", "c"]).as_slice());
}

// ── Cycles ───────────────────────────────────────────────────────

#[test]
fn condition_cycle_is_rejected_with_path() {
    let form = schema(json!({"fields": [
        {"id": "a", "show_if": {"field": "b", "op": "present"}},
        {"id": "b", "enable_if": {"field": "c", "op": "present"}},
        {"id": "c", "show_if": {"field": "a", "op": "present"}}
    ]}));
    let err = Evaluator::new(&form).unwrap_err();
    assert_eq!(err, DependencyCycleError { path: ids(&["a", "b", "c", "a"]) });
    assert_eq!(err.to_string(), "dependency cycle: a -> b -> c -> a");
}

#[test]
fn self_reference_is_a_cycle() {
    let form = schema(json!({"fields": [
        {"id": "a", "show_if": {"field": "a", "op": "present"}}
    ]}));
    assert_eq!(
        compute_active_set(&form, &ValueSnapshot::default()).unwrap_err().path,
        ids(&["a", "a"])
    );
}

#[test]
fn mutual_rule_references_are_allowed() {
    let form = schema(json!({"fields": [
        {"id": "password", "rules": [{"rule": "compare", "field": "confirm", "op": "eq"}]},
        {"id": "confirm", "rules": [{"rule": "compare", "field": "password", "op": "eq"}]}
    ]}));
    assert!(Evaluator::new(&form).is_ok());
}

// ── Properties ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn threshold_visibility_matches_comparison(age in -10i64..120) {
        let evaluator = Evaluator::new(&guardian_form()).unwrap();
        let active = evaluator.evaluate(&snap(&[("age", json!(age))]));
        prop_assert_eq!(active[&FieldId::from("guardianName")].visible, age < 18);
    }

    #[test]
    fn evaluate_fields_agrees_with_full_evaluation(age in 0i64..100, newsletter in any::<bool>()) {
        let evaluator = Evaluator::new(&guardian_form()).unwrap();
        let values = snap(&[("age", json!(age)), ("newsletter", json!(newsletter))]);
        let full = evaluator.evaluate(&values);
        let wanted = ids(&["email", "guardianName"]);
        let partial = evaluator.evaluate_fields(&wanted, &values);
        for id in &wanted {
            prop_assert_eq!(partial[id], full[id]);
        }
    }
}
