//! Validation rule compiler for Formwright.
//!
//! [`compile`] turns one schema node's declarative rule list into a
//! [`Validator`]: a single composed check over `(value, snapshot)` that
//! surfaces the first failing rule's message and nothing else.
//!
//! Host predicates referenced by `custom` rules are looked up in a
//! [`PredicateRegistry`] at compile time. Synchronous predicates run inline;
//! asynchronous ones turn the outcome into [`Validation::Pending`], which the
//! caller awaits or hands to its own executor.

mod compiler;
mod error;
mod messages;
mod predicate;
mod validator;

pub use compiler::{compile, compile_all, CompileOptions};
pub use error::{CompileError, CompileResult};
pub use predicate::{AsyncPredicate, Predicate, PredicateHandle, PredicateRegistry};
pub use validator::{PendingCheck, Validation, Validator};
