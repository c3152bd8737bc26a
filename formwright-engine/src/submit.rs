//! Whole-form submission.

use crate::entry::ValidationState;
use crate::error::SubmitError;
use crate::store::FormStore;
use formwright_types::{FieldId, ValueMap};
use std::collections::BTreeMap;
use tracing::{info, warn};

impl FormStore {
    /// Validates every active field, waits for asynchronous rules up to the
    /// configured timeout, and calls `on_submit` with the active fields'
    /// values only if nothing failed.
    ///
    /// Errors are collected across the whole form. Inactive fields are
    /// neither validated nor included in the payload.
    pub async fn submit<F, R>(&mut self, on_submit: F) -> Result<R, SubmitError>
    where
        F: FnOnce(ValueMap) -> R,
    {
        self.submitted = true;
        self.data_version += 1;
        self.validate_form();

        let timeout = self.options.config.submit_timeout();
        if tokio::time::timeout(timeout, self.settle_pending()).await.is_err() {
            let pending = self.fields_in_state(ValidationState::is_pending);
            warn!(pending = pending.len(), "Submit timed out waiting for validation");
            return Err(SubmitError::Timeout { pending });
        }

        let pending = self.fields_in_state(ValidationState::is_pending);
        if !pending.is_empty() {
            warn!(pending = pending.len(), "Submit found unresolved validation");
            return Err(SubmitError::Timeout { pending });
        }

        let errors: BTreeMap<FieldId, String> = self
            .active_fields()
            .into_iter()
            .filter_map(|id| {
                let message = self.field_error(id.as_str())?.to_string();
                Some((id, message))
            })
            .collect();
        if !errors.is_empty() {
            info!(invalid = errors.len(), "Submit rejected");
            return Err(SubmitError::Invalid { errors });
        }

        let payload: ValueMap = self
            .active_fields()
            .into_iter()
            .filter_map(|id| {
                let value = self.get_field(id.as_str())?.clone();
                Some((id, value))
            })
            .collect();
        info!(fields = payload.len(), "Form submitted");
        Ok(on_submit(payload))
    }

    fn fields_in_state(&self, predicate: impl Fn(&ValidationState) -> bool) -> Vec<FieldId> {
        self.active_fields()
            .into_iter()
            .filter(|id| self.field_state(id.as_str()).is_some_and(&predicate))
            .collect()
    }
}
