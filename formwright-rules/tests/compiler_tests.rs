use async_trait::async_trait;
use formwright_model::{normalize_json, CanonicalSchema};
use formwright_registry::FieldTypeRegistry;
use formwright_rules::{
    compile_all, AsyncPredicate, CompileError, CompileOptions, PredicateRegistry, Validator,
};
use formwright_types::{FieldId, ValueSnapshot};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn schema(json: Value) -> CanonicalSchema {
    normalize_json(&json.to_string(), &FieldTypeRegistry::with_builtins().snapshot()).unwrap()
}

fn validators(json: Value, predicates: &PredicateRegistry) -> HashMap<FieldId, Validator> {
    compile_all(&schema(json), predicates, &CompileOptions::default()).unwrap()
}

fn single(json: Value) -> Validator {
    let mut all = validators(json, &PredicateRegistry::new());
    assert_eq!(all.len(), 1);
    all.drain().next().unwrap().1
}

fn snap(pairs: &[(&str, Value)]) -> ValueSnapshot {
    pairs.iter().map(|(k, v)| (FieldId::from(*k), v.clone())).collect()
}

fn check(validator: &Validator, value: Value) -> Result<(), String> {
    match validator.validate(&value, &ValueSnapshot::default()) {
        formwright_rules::Validation::Ready(result) => result,
        pending => panic!("expected a settled result, got {pending:?}"),
    }
}

struct Slow {
    delay: Duration,
    pass: bool,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl AsyncPredicate for Slow {
    async fn check(&self, _value: &Value, _values: &ValueSnapshot) -> Result<bool, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.pass)
    }
}

struct Exploding;

#[async_trait]
impl AsyncPredicate for Exploding {
    async fn check(&self, _value: &Value, _values: &ValueSnapshot) -> Result<bool, String> {
        panic!("lookup service crashed")
    }
}

// ── Presence ─────────────────────────────────────────────────────

#[test]
fn required_rejects_empty_values() {
    let v = single(json!({"fields": [{"id": "name", "required": true}]}));
    assert_eq!(check(&v, json!("")), Err("This field is required".to_string()));
    assert_eq!(check(&v, json!("   ")), Err("This field is required".to_string()));
    assert_eq!(check(&v, Value::Null), Err("This field is required".to_string()));
    assert_eq!(check(&v, json!("Ada")), Ok(()));
}

#[test]
fn required_checkbox_must_be_checked() {
    let v = single(json!({"fields": [{"id": "terms", "type": "checkbox", "required": true}]}));
    assert!(check(&v, json!(false)).is_err());
    assert_eq!(check(&v, json!(true)), Ok(()));
}

#[test]
fn required_if_follows_condition() {
    let v = single(json!({"fields": [{
        "id": "guardian",
        "rules": [{"rule": "required_if", "when": {"field": "age", "op": "lt", "value": 18}}]
    }]}));
    let minor = snap(&[("age", json!(15))]);
    let adult = snap(&[("age", json!(30))]);
    assert!(matches!(
        v.validate(&json!(""), &minor).ready(),
        Some(Err(m)) if m == "This field is required"
    ));
    assert!(matches!(v.validate(&json!(""), &adult).ready(), Some(Ok(()))));
    assert_eq!(v.references(), &BTreeSet::from([FieldId::from("age")]));
}

#[test]
fn required_if_present_uses_checkbox_emptiness() {
    let all = validators(
        json!({"fields": [
            {"id": "agree", "type": "checkbox"},
            {"id": "details", "rules": [
                {"rule": "required_if", "when": {"field": "agree", "op": "present"}}
            ]}
        ]}),
        &PredicateRegistry::new(),
    );
    let details = &all[&FieldId::from("details")];
    let unchecked = snap(&[("agree", json!(false))]);
    let checked = snap(&[("agree", json!(true))]);
    assert!(matches!(details.validate(&json!(""), &unchecked).ready(), Some(Ok(()))));
    assert!(matches!(details.validate(&json!(""), &checked).ready(), Some(Err(_))));
}

// ── Ordering ─────────────────────────────────────────────────────

#[test]
fn first_failure_wins() {
    let v = single(json!({"fields": [{
        "id": "email",
        "rules": [
            "required",
            {"rule": "pattern", "pattern": "^[^@]+@[^@]+$", "message": "Enter an email"}
        ]
    }]}));
    assert_eq!(check(&v, json!("")), Err("This field is required".to_string()));
    assert_eq!(check(&v, json!("nope")), Err("Enter an email".to_string()));
    assert_eq!(check(&v, json!("a@b")), Ok(()));
}

#[test]
fn later_rules_not_evaluated_after_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut predicates = PredicateRegistry::new();
    predicates.register("counted", move |_: &Value, _: &ValueSnapshot| -> Result<bool, String> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    });
    let all = validators(
        json!({"fields": [{"id": "code", "rules": [
            {"rule": "min", "value": 3},
            {"rule": "custom", "name": "counted"}
        ]}]}),
        &predicates,
    );
    let v = &all[&FieldId::from("code")];

    assert!(check(v, json!("ab")).is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(check(v, json!("abc")), Ok(()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn optional_field_skips_format_rules_when_empty() {
    let v = single(json!({"fields": [
        {"id": "zip", "rules": [{"rule": "pattern", "pattern": "^\\d{5}$"}]}
    ]}));
    assert_eq!(check(&v, json!("")), Ok(()));
    assert_eq!(check(&v, json!("1234")), Err("Invalid format".to_string()));
}

// ── Bounds ───────────────────────────────────────────────────────

#[test]
fn number_bounds_are_numeric() {
    let v = single(json!({"fields": [{"id": "age", "type": "number", "rules": [
        {"rule": "min", "value": 18},
        {"rule": "max", "value": 120}
    ]}]}));
    assert_eq!(check(&v, json!(17)), Err("Must be at least 18".to_string()));
    assert_eq!(check(&v, json!(121)), Err("Must be at most 120".to_string()));
    assert_eq!(check(&v, json!(18)), Ok(()));
}

#[test]
fn text_bounds_measure_characters() {
    let v = single(json!({"fields": [{"id": "handle", "rules": [
        {"rule": "min", "value": 3},
        {"rule": "max", "value": 5}
    ]}]}));
    assert_eq!(check(&v, json!("ab")), Err("Must be at least 3 characters".to_string()));
    assert_eq!(check(&v, json!("abcdef")), Err("Must be at most 5 characters".to_string()));
    assert_eq!(check(&v, json!("héllo")), Ok(()));
}

#[test]
fn multiselect_bounds_count_items() {
    let v = single(json!({"fields": [
        {"id": "tags", "type": "multiselect", "rules": [{"rule": "min", "value": 2}]}
    ]}));
    assert_eq!(check(&v, json!(["a"])), Err("Select at least 2 items".to_string()));
    assert_eq!(check(&v, json!(["a", "b"])), Ok(()));
}

// ── Membership & comparison ──────────────────────────────────────

#[test]
fn one_of_compares_numbers_by_value() {
    let v = single(json!({"fields": [
        {"id": "size", "type": "number", "rules": [{"rule": "one_of", "values": [1, 2, 3]}]}
    ]}));
    assert_eq!(check(&v, json!(2.0)), Ok(()));
    assert_eq!(check(&v, json!(4)), Err("Must be one of the allowed values".to_string()));
}

#[test]
fn compare_reads_other_field() {
    let all = validators(
        json!({"fields": [
            {"id": "password"},
            {"id": "confirm", "rules": [
                {"rule": "compare", "field": "password", "op": "eq", "message": "Passwords differ"}
            ]}
        ]}),
        &PredicateRegistry::new(),
    );
    let v = &all[&FieldId::from("confirm")];
    let values = snap(&[("password", json!("hunter2"))]);

    assert!(matches!(v.validate(&json!("hunter2"), &values).ready(), Some(Ok(()))));
    assert!(matches!(
        v.validate(&json!("hunter3"), &values).ready(),
        Some(Err(m)) if m == "Passwords differ"
    ));
    assert_eq!(v.references(), &BTreeSet::from([FieldId::from("password")]));
}

#[test]
fn compare_against_missing_field_fails_ordering() {
    let all = validators(
        json!({"fields": [
            {"id": "start", "type": "number"},
            {"id": "end", "type": "number", "rules": [
                {"rule": "compare", "field": "start", "op": "gt"}
            ]}
        ]}),
        &PredicateRegistry::new(),
    );
    let v = &all[&FieldId::from("end")];
    assert_eq!(
        check(v, json!(5)),
        Err("Must be greater than start".to_string())
    );
}

// ── Custom predicates ────────────────────────────────────────────

#[test]
fn sync_predicate_uses_rule_message() {
    let mut predicates = PredicateRegistry::new();
    predicates.register("even", |v: &Value, _: &ValueSnapshot| -> Result<bool, String> {
        Ok(v.as_i64().is_some_and(|n| n % 2 == 0))
    });
    let all = validators(
        json!({"fields": [{"id": "n", "type": "number", "rules": [
            {"rule": "custom", "name": "even", "message": "Must be even"}
        ]}]}),
        &predicates,
    );
    let v = &all[&FieldId::from("n")];
    assert_eq!(check(v, json!(3)), Err("Must be even".to_string()));
    assert_eq!(check(v, json!(4)), Ok(()));
}

#[test]
fn faulting_predicate_yields_fallback_message() {
    let mut predicates = PredicateRegistry::new();
    predicates.register("broken", |_: &Value, _: &ValueSnapshot| -> Result<bool, String> {
        Err("database unreachable".to_string())
    });
    predicates.register("panics", |_: &Value, _: &ValueSnapshot| -> Result<bool, String> {
        panic!("boom")
    });
    let all = validators(
        json!({"fields": [
            {"id": "a", "rules": [{"rule": "custom", "name": "broken", "message": "Taken"}]},
            {"id": "b", "rules": [{"rule": "custom", "name": "panics"}]}
        ]}),
        &predicates,
    );
    assert_eq!(check(&all[&FieldId::from("a")], json!("x")), Err("Invalid value".to_string()));
    assert_eq!(check(&all[&FieldId::from("b")], json!("x")), Err("Invalid value".to_string()));
}

#[test]
fn fallback_message_is_configurable() {
    let mut predicates = PredicateRegistry::new();
    predicates.register("broken", |_: &Value, _: &ValueSnapshot| -> Result<bool, String> {
        Err("down".to_string())
    });
    let options = CompileOptions {
        fallback_message: "Could not verify".to_string(),
    };
    let all = compile_all(
        &schema(json!({"fields": [{"id": "a", "rules": [{"rule": "custom", "name": "broken"}]}]})),
        &predicates,
        &options,
    )
    .unwrap();
    assert_eq!(check(&all[&FieldId::from("a")], json!("x")), Err("Could not verify".to_string()));
}

#[test]
fn unknown_predicate_is_compile_error() {
    let err = compile_all(
        &schema(json!({"fields": [
            {"id": "user", "rules": [{"rule": "custom", "name": "usernameFree"}]}
        ]})),
        &PredicateRegistry::new(),
        &CompileOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        CompileError::UnknownPredicate { ref field, ref name }
            if field == "user" && name == "usernameFree"
    ));
}

// ── Async predicates ─────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn async_predicate_suspends_then_settles() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut predicates = PredicateRegistry::new();
    predicates.register_async(
        "available",
        Slow {
            delay: Duration::from_millis(250),
            pass: false,
            calls: Arc::clone(&calls),
        },
    );
    let all = validators(
        json!({"fields": [{"id": "user", "rules": [
            "required",
            {"rule": "custom", "name": "available", "message": "Username taken"}
        ]}]}),
        &predicates,
    );
    let v = &all[&FieldId::from("user")];
    assert!(v.is_async());

    // A sync failure before the async rule settles immediately.
    assert_eq!(check(v, json!("")), Err("This field is required".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let outcome = v.validate(&json!("ada"), &ValueSnapshot::default());
    assert!(outcome.is_pending());
    assert_eq!(outcome.resolve().await, Err("Username taken".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn rules_after_async_predicate_still_run() {
    let mut predicates = PredicateRegistry::new();
    predicates.register_async(
        "available",
        Slow {
            delay: Duration::from_millis(10),
            pass: true,
            calls: Arc::new(AtomicUsize::new(0)),
        },
    );
    let all = validators(
        json!({"fields": [{"id": "user", "rules": [
            {"rule": "custom", "name": "available"},
            {"rule": "max", "value": 4}
        ]}]}),
        &predicates,
    );
    let v = &all[&FieldId::from("user")];
    assert_eq!(
        v.validate_async(&json!("abcdef"), &ValueSnapshot::default()).await,
        Err("Must be at most 4 characters".to_string())
    );
    assert_eq!(v.validate_async(&json!("abc"), &ValueSnapshot::default()).await, Ok(()));
}

#[tokio::test]
async fn panicking_async_predicate_yields_fallback() {
    let mut predicates = PredicateRegistry::new();
    predicates.register_async("lookup", Exploding);
    let all = validators(
        json!({"fields": [{"id": "user", "rules": [{"rule": "custom", "name": "lookup"}]}]}),
        &predicates,
    );
    let v = &all[&FieldId::from("user")];
    assert_eq!(
        v.validate_async(&json!("ada"), &ValueSnapshot::default()).await,
        Err("Invalid value".to_string())
    );
}

#[test]
fn empty_value_skips_async_predicate() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut predicates = PredicateRegistry::new();
    predicates.register_async(
        "available",
        Slow {
            delay: Duration::from_millis(10),
            pass: false,
            calls: Arc::clone(&calls),
        },
    );
    let all = validators(
        json!({"fields": [{"id": "user", "rules": [{"rule": "custom", "name": "available"}]}]}),
        &predicates,
    );
    assert_eq!(check(&all[&FieldId::from("user")], json!("")), Ok(()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
