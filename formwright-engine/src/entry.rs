//! Per-field runtime state.

use formwright_conditions::Activity;
use formwright_types::FieldId;
use serde_json::Value;

/// Validation state of one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ValidationState {
    /// Not validated since mount, reset, or deactivation.
    #[default]
    Unvalidated,
    Valid,
    Invalid(String),
    /// Waiting on an asynchronous predicate.
    Pending,
}

impl ValidationState {
    /// The error message, if invalid.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Invalid(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Everything the store tracks for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueEntry {
    pub value: Value,
    pub initial: Value,
    pub touched: bool,
    /// `value` differs from `initial`.
    pub dirty: bool,
    pub state: ValidationState,
    pub visible: bool,
    pub enabled: bool,
    /// Bumped by every validation run; async results must match it.
    pub generation: u64,
}

impl ValueEntry {
    pub(crate) fn new(initial: Value) -> Self {
        Self {
            value: initial.clone(),
            initial,
            touched: false,
            dirty: false,
            state: ValidationState::Unvalidated,
            visible: true,
            enabled: true,
            generation: 0,
        }
    }

    pub fn activity(&self) -> Activity {
        Activity {
            visible: self.visible,
            enabled: self.enabled,
        }
    }

    /// Visible and enabled.
    pub fn is_active(&self) -> bool {
        self.activity().is_active()
    }

    pub(crate) fn set_activity(&mut self, activity: Activity) {
        self.visible = activity.visible;
        self.enabled = activity.enabled;
    }
}

/// Sent to subscribers when a field's value, validation state or activity
/// changed.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub id: FieldId,
    pub value: Value,
    pub state: ValidationState,
    pub activity: Activity,
}
