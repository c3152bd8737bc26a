//! Compiled validators and their outcomes.

use crate::messages;
use crate::predicate::{AsyncPredicate, Predicate};
use formwright_model::{Condition, FieldPresence};
use formwright_registry::FieldHandler;
use formwright_types::{values_equal, Comparison, FieldId, ValueSnapshot};
use futures::future::BoxFuture;
use futures::FutureExt;
use regex_lite::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::warn;

/// A validation still waiting on an asynchronous predicate.
pub type PendingCheck = BoxFuture<'static, Result<(), String>>;

/// Outcome of running a [`Validator`].
pub enum Validation {
    /// Settled: `Ok` or the first failing rule's message.
    Ready(Result<(), String>),
    /// Suspended on an asynchronous predicate. Rules after it run inside the
    /// future, still in declaration order.
    Pending(PendingCheck),
}

impl Validation {
    /// Awaits the outcome regardless of which variant it is.
    pub async fn resolve(self) -> Result<(), String> {
        match self {
            Self::Ready(result) => result,
            Self::Pending(check) => check.await,
        }
    }

    /// Returns true if the outcome is not yet known.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// The settled result, if any.
    pub fn ready(&self) -> Option<&Result<(), String>> {
        match self {
            Self::Ready(result) => Some(result),
            Self::Pending(_) => None,
        }
    }
}

impl fmt::Debug for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// How `min`/`max` measure a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Measure {
    Numeric,
    Length,
    /// Numbers numerically, strings and lists by length.
    Auto,
}

/// One compiled rule.
pub(crate) enum Check {
    Required {
        message: String,
    },
    RequiredIf {
        when: Condition,
        presence: FieldPresence,
        message: String,
    },
    Pattern {
        regex: Regex,
        message: String,
    },
    Bound {
        limit: f64,
        lower: bool,
        measure: Measure,
        message: Option<String>,
    },
    OneOf {
        values: Vec<Value>,
        message: String,
    },
    Compare {
        other: FieldId,
        op: Comparison,
        message: String,
    },
    Predicate {
        name: String,
        predicate: Arc<dyn Predicate>,
        message: Option<String>,
    },
    AsyncPredicate {
        name: String,
        predicate: Arc<dyn AsyncPredicate>,
        message: Option<String>,
    },
}

/// The composed validator of one field.
///
/// Pure given `(value, snapshot)`. Rules run in declaration order and the
/// first failure wins; later rules are not evaluated. Rules other than the
/// presence rules pass on empty values. Cheap to clone.
#[derive(Clone)]
pub struct Validator {
    inner: Arc<Inner>,
}

struct Inner {
    field: FieldId,
    handler: Arc<dyn FieldHandler>,
    checks: Vec<Check>,
    references: BTreeSet<FieldId>,
    fallback: String,
}

impl Validator {
    pub(crate) fn new(
        field: FieldId,
        handler: Arc<dyn FieldHandler>,
        checks: Vec<Check>,
        references: BTreeSet<FieldId>,
        fallback: String,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                field,
                handler,
                checks,
                references,
                fallback,
            }),
        }
    }

    /// The field this validator belongs to.
    pub fn field(&self) -> &FieldId {
        &self.inner.field
    }

    /// Other fields read by cross-field rules.
    pub fn references(&self) -> &BTreeSet<FieldId> {
        &self.inner.references
    }

    /// Number of compiled rules.
    pub fn rule_count(&self) -> usize {
        self.inner.checks.len()
    }

    /// Returns true if any rule may suspend.
    pub fn is_async(&self) -> bool {
        self.inner
            .checks
            .iter()
            .any(|c| matches!(c, Check::AsyncPredicate { .. }))
    }

    /// Validates `value` against the rules, reading other fields from
    /// `snapshot`.
    ///
    /// Runs synchronously up to the first asynchronous predicate. If one is
    /// reached before any failure, the rest of the run is returned as
    /// [`Validation::Pending`].
    pub fn validate(&self, value: &Value, snapshot: &ValueSnapshot) -> Validation {
        for (index, check) in self.inner.checks.iter().enumerate() {
            match self.run_sync(check, value, snapshot) {
                Some(Ok(())) => {}
                Some(Err(message)) => return Validation::Ready(Err(message)),
                None => {
                    let this = self.clone();
                    let value = value.clone();
                    let snapshot = snapshot.clone();
                    return Validation::Pending(
                        async move { this.run_from(index, &value, &snapshot).await }.boxed(),
                    );
                }
            }
        }
        Validation::Ready(Ok(()))
    }

    /// Validates and awaits the outcome.
    pub async fn validate_async(
        &self,
        value: &Value,
        snapshot: &ValueSnapshot,
    ) -> Result<(), String> {
        self.validate(value, snapshot).resolve().await
    }

    async fn run_from(
        &self,
        start: usize,
        value: &Value,
        snapshot: &ValueSnapshot,
    ) -> Result<(), String> {
        for check in &self.inner.checks[start..] {
            match check {
                Check::AsyncPredicate {
                    name,
                    predicate,
                    message,
                } => {
                    if self.inner.handler.is_empty(value) {
                        continue;
                    }
                    let outcome = AssertUnwindSafe(predicate.check(value, snapshot))
                        .catch_unwind()
                        .await;
                    let outcome = match outcome {
                        Ok(result) => result,
                        Err(_) => Err("predicate panicked".to_string()),
                    };
                    self.predicate_result(name, outcome, message.as_deref())?;
                }
                other => {
                    if let Some(result) = self.run_sync(other, value, snapshot) {
                        result?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Runs one synchronous check. `None` means the check is asynchronous.
    fn run_sync(
        &self,
        check: &Check,
        value: &Value,
        snapshot: &ValueSnapshot,
    ) -> Option<Result<(), String>> {
        let empty = self.inner.handler.is_empty(value);
        let result = match check {
            Check::Required { message } => fail_if(empty, message),
            Check::RequiredIf {
                when,
                presence,
                message,
            } => fail_if(empty && when.evaluate_with(snapshot, presence), message),
            Check::AsyncPredicate { .. } => return if empty { Some(Ok(())) } else { None },
            _ if empty => Ok(()),
            Check::Pattern { regex, message } => {
                let matched = match value {
                    Value::String(s) => regex.is_match(s),
                    Value::Number(n) => regex.is_match(&n.to_string()),
                    Value::Bool(b) => regex.is_match(&b.to_string()),
                    _ => false,
                };
                fail_if(!matched, message)
            }
            Check::Bound {
                limit,
                lower,
                measure,
                message,
            } => check_bound(value, *limit, *lower, *measure, message.as_deref()),
            Check::OneOf { values, message } => {
                fail_if(!values.iter().any(|v| values_equal(value, v)), message)
            }
            Check::Compare { other, op, message } => {
                fail_if(!op.holds(value, snapshot.get(other.as_str())), message)
            }
            Check::Predicate {
                name,
                predicate,
                message,
            } => {
                let outcome =
                    std::panic::catch_unwind(AssertUnwindSafe(|| predicate.check(value, snapshot)))
                        .unwrap_or_else(|_| Err("predicate panicked".to_string()));
                self.predicate_result(name, outcome, message.as_deref())
            }
        };
        Some(result)
    }

    fn predicate_result(
        &self,
        name: &str,
        outcome: Result<bool, String>,
        message: Option<&str>,
    ) -> Result<(), String> {
        match outcome {
            Ok(true) => Ok(()),
            Ok(false) => Err(message.unwrap_or(&self.inner.fallback).to_string()),
            Err(fault) => {
                warn!(field = %self.inner.field, predicate = name, "Predicate fault: {}", fault);
                Err(self.inner.fallback.clone())
            }
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("field", &self.inner.field)
            .field("rules", &self.inner.checks.len())
            .field("references", &self.inner.references)
            .finish()
    }
}

fn fail_if(failed: bool, message: &str) -> Result<(), String> {
    if failed {
        Err(message.to_string())
    } else {
        Ok(())
    }
}

fn check_bound(
    value: &Value,
    limit: f64,
    lower: bool,
    measure: Measure,
    message: Option<&str>,
) -> Result<(), String> {
    // (amount, Some(counts_items)) for length bounds, (amount, None) for numeric ones.
    let measured = match value {
        Value::Number(n) if measure != Measure::Length => n.as_f64().map(|n| (n, None)),
        Value::String(s) if measure != Measure::Numeric => {
            Some((s.chars().count() as f64, Some(false)))
        }
        Value::Array(items) if measure != Measure::Numeric => {
            Some((items.len() as f64, Some(true)))
        }
        _ => None,
    };

    let default_message = |by_length: Option<bool>| match (lower, by_length) {
        (true, None) => messages::min_value(limit),
        (false, None) => messages::max_value(limit),
        (true, Some(items)) => messages::min_length(limit, items),
        (false, Some(items)) => messages::max_length(limit, items),
    };

    let Some((amount, by_length)) = measured else {
        return Err(message.map_or_else(|| default_message(None), str::to_string));
    };
    let within = if lower { amount >= limit } else { amount <= limit };
    if within {
        Ok(())
    } else {
        Err(message.map_or_else(|| default_message(by_length), str::to_string))
    }
}
