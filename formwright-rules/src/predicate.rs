//! Host-supplied predicates for `custom` rules.

use async_trait::async_trait;
use formwright_types::ValueSnapshot;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A synchronous host check.
///
/// `Ok(true)` passes, `Ok(false)` fails with the rule's message. `Err` (or a
/// panic) is a fault in the predicate itself: the rule fails with the
/// fallback message and the fault is logged, never propagated.
pub trait Predicate: Send + Sync {
    fn check(&self, value: &Value, values: &ValueSnapshot) -> Result<bool, String>;
}

impl<F> Predicate for F
where
    F: Fn(&Value, &ValueSnapshot) -> Result<bool, String> + Send + Sync,
{
    fn check(&self, value: &Value, values: &ValueSnapshot) -> Result<bool, String> {
        self(value, values)
    }
}

/// An asynchronous host check, e.g. "is this username still available?".
/// Same result contract as [`Predicate`].
#[async_trait]
pub trait AsyncPredicate: Send + Sync {
    async fn check(&self, value: &Value, values: &ValueSnapshot) -> Result<bool, String>;
}

/// A registered predicate of either flavour.
#[derive(Clone)]
pub enum PredicateHandle {
    Sync(Arc<dyn Predicate>),
    Async(Arc<dyn AsyncPredicate>),
}

impl PredicateHandle {
    /// Returns true for asynchronous predicates.
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

impl fmt::Debug for PredicateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("PredicateHandle::Sync"),
            Self::Async(_) => f.write_str("PredicateHandle::Async"),
        }
    }
}

/// Named host predicates available to `custom` rules.
#[derive(Debug, Clone, Default)]
pub struct PredicateRegistry {
    predicates: HashMap<String, PredicateHandle>,
}

impl PredicateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a synchronous predicate. Last registration wins.
    pub fn register(&mut self, name: impl Into<String>, predicate: impl Predicate + 'static) {
        let name = name.into();
        debug!(name = %name, "Predicate registered");
        self.predicates
            .insert(name, PredicateHandle::Sync(Arc::new(predicate)));
    }

    /// Registers an asynchronous predicate. Last registration wins.
    pub fn register_async(
        &mut self,
        name: impl Into<String>,
        predicate: impl AsyncPredicate + 'static,
    ) {
        let name = name.into();
        debug!(name = %name, "Async predicate registered");
        self.predicates
            .insert(name, PredicateHandle::Async(Arc::new(predicate)));
    }

    /// Looks up a predicate by name.
    pub fn get(&self, name: &str) -> Option<&PredicateHandle> {
        self.predicates.get(name)
    }

    /// Number of registered predicates.
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}
