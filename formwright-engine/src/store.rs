//! The central form-value store.

use crate::config::EngineConfig;
use crate::entry::{FieldChange, ValidationState, ValueEntry};
use crate::error::{FormResult, StoreError, StoreResult};
use crate::subscription::{Listener, SubscriptionId, Subscribers};
use formwright_conditions::Evaluator;
use formwright_model::{
    changed_rule_fields, normalize, normalize_json, CanonicalSchema, FieldPresence, OverrideError,
    OverridePatch, OverrideResult, RawSchema,
};
use formwright_registry::{FieldTypeRegistry, RegistrySnapshot};
use formwright_rules::{
    compile, compile_all, CompileOptions, PendingCheck, PredicateRegistry, Validation, Validator,
};
use formwright_types::{values_equal, FieldId, ValueMap, ValueSnapshot};
use futures::future::join_all;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything a form needs besides its schema.
#[derive(Debug, Clone, Default)]
pub struct FormOptions {
    pub config: EngineConfig,
    pub predicates: Arc<PredicateRegistry>,
    /// Field types to resolve against. `None` uses the process-wide registry.
    pub registry: Option<Arc<FieldTypeRegistry>>,
}

impl FormOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_predicates(mut self, predicates: PredicateRegistry) -> Self {
        self.predicates = Arc::new(predicates);
        self
    }

    pub fn with_registry(mut self, registry: Arc<FieldTypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// The field types as of now. Taken afresh for every mount and override
    /// so later registrations are seen.
    pub(crate) fn registry_snapshot(&self) -> RegistrySnapshot {
        match &self.registry {
            Some(registry) => registry.snapshot(),
            None => FieldTypeRegistry::global().snapshot(),
        }
    }

    pub(crate) fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            fallback_message: self.config.fallback_message.clone(),
        }
    }
}

/// An asynchronous validation run handed to the host by
/// [`FormStore::take_pending`]. Drive `check` to completion, then report it
/// with [`FormStore::resolve_validation`].
pub struct PendingValidation {
    pub id: FieldId,
    pub generation: u64,
    pub check: PendingCheck,
}

impl fmt::Debug for PendingValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingValidation")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// A pending run. `check` is `None` once the future was handed out or
/// abandoned; the generation still identifies the run.
struct PendingRun {
    generation: u64,
    check: Option<PendingCheck>,
}

/// How much of the form a recompute re-evaluates conditions for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Fields whose conditions read a changed field.
    Affected,
    All,
}

/// Runtime state of one mounted form.
///
/// All methods take `&mut self`; a store belongs to one logical form
/// instance and is not shared between tasks.
pub struct FormStore {
    pub(crate) schema: CanonicalSchema,
    validators: HashMap<FieldId, Validator>,
    evaluator: Evaluator,
    entries: HashMap<FieldId, ValueEntry>,
    /// Every entry's value, shared with the snapshots handed to rules and
    /// conditions and updated in place for edited entries only.
    values: ValueSnapshot,
    pending: HashMap<FieldId, PendingRun>,
    /// Pre-images of entries touched by the current operation.
    journal: BTreeMap<FieldId, ValueEntry>,
    subscribers: Subscribers,
    pub(crate) options: FormOptions,
    pub(crate) submitted: bool,
    pub(crate) data_version: u64,
}

impl FormStore {
    // ── Mount ────────────────────────────────────────────────────

    /// Normalizes `raw`, compiles every field's rules, builds the dependency
    /// graph and creates entries holding each field's default.
    pub fn mount(raw: &RawSchema, options: FormOptions) -> FormResult<Self> {
        let schema = normalize(raw, &options.registry_snapshot())?;
        Self::from_schema(schema, options)
    }

    /// [`mount`](Self::mount) from JSON text.
    pub fn mount_json(json: &str, options: FormOptions) -> FormResult<Self> {
        let schema = normalize_json(json, &options.registry_snapshot())?;
        Self::from_schema(schema, options)
    }

    /// Mounts and then applies `patch` before anyone can observe the form.
    ///
    /// Fields nobody has edited yet show the patched defaults, and the form
    /// starts out clean.
    pub fn mount_with_overrides(
        raw: &RawSchema,
        patch: &OverridePatch,
        options: FormOptions,
    ) -> FormResult<Self> {
        let mut store = Self::mount(raw, options)?;
        store.apply_overrides(patch)?;
        Ok(store)
    }

    /// Mounts an already-normalized schema.
    pub fn from_schema(schema: CanonicalSchema, options: FormOptions) -> FormResult<Self> {
        let validators = compile_all(&schema, &options.predicates, &options.compile_options())?;
        let evaluator = Evaluator::new(&schema)?;
        let entries: HashMap<FieldId, ValueEntry> = schema
            .nodes()
            .map(|node| (node.id.clone(), ValueEntry::new(node.default.clone())))
            .collect();
        let values = entries
            .iter()
            .map(|(id, entry)| (id.clone(), entry.value.clone()))
            .collect();

        let mut store = Self {
            schema,
            validators,
            evaluator,
            entries,
            values,
            pending: HashMap::new(),
            journal: BTreeMap::new(),
            subscribers: Subscribers::default(),
            options,
            submitted: false,
            data_version: 0,
        };

        let snapshot = store.snapshot();
        for (id, activity) in store.evaluator.evaluate(&snapshot) {
            if let Some(entry) = store.entries.get_mut(id.as_str()) {
                entry.set_activity(activity);
            }
        }

        info!(fields = store.schema.len(), "Form mounted");
        Ok(store)
    }

    // ── Reads ────────────────────────────────────────────────────

    pub fn schema(&self) -> &CanonicalSchema {
        &self.schema
    }

    pub fn config(&self) -> &EngineConfig {
        &self.options.config
    }

    /// Current value of a field, `None` for unknown ids.
    pub fn get_field(&self, id: &str) -> Option<&Value> {
        self.entries.get(id).map(|entry| &entry.value)
    }

    pub fn entry(&self, id: &str) -> Option<&ValueEntry> {
        self.entries.get(id)
    }

    /// Every field's value, active or not.
    pub fn get_form_values(&self) -> ValueMap {
        self.entries
            .iter()
            .map(|(id, entry)| (id.clone(), entry.value.clone()))
            .collect()
    }

    /// Values as seen by rules and conditions. Cheap: shares the store's
    /// value map until the next write.
    pub fn snapshot(&self) -> ValueSnapshot {
        self.values.clone()
    }

    pub fn field_state(&self, id: &str) -> Option<&ValidationState> {
        self.entries.get(id).map(|entry| &entry.state)
    }

    /// The field's error message, whether or not it should be shown yet.
    pub fn field_error(&self, id: &str) -> Option<&str> {
        self.entries.get(id).and_then(|entry| entry.state.error())
    }

    /// The error to display: only once the field was touched or the form
    /// submitted.
    pub fn visible_error(&self, id: &str) -> Option<&str> {
        let entry = self.entries.get(id)?;
        if entry.touched || self.submitted {
            entry.state.error()
        } else {
            None
        }
    }

    /// Visible and enabled fields, in schema order.
    pub fn active_fields(&self) -> Vec<FieldId> {
        self.schema
            .field_ids()
            .iter()
            .filter(|id| self.is_active(id.as_str()))
            .cloned()
            .collect()
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.entries.get(id).is_some_and(ValueEntry::is_active)
    }

    /// True if any field differs from its initial value.
    pub fn is_dirty(&self) -> bool {
        self.entries.values().any(|entry| entry.dirty)
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Bumped on every observable state change.
    pub fn data_version(&self) -> u64 {
        self.data_version
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Writes one value. See [`set_fields`](Self::set_fields).
    pub fn set_field(&mut self, id: &str, value: Value) -> StoreResult<()> {
        self.set_fields(ValueMap::from([(FieldId::from(id), value)]))
    }

    /// Writes several values at once, then recomputes activity and
    /// validation for what the writes can affect.
    ///
    /// Every id must exist and every value must be accepted by its field
    /// type; otherwise nothing is written.
    pub fn set_fields(&mut self, values: ValueMap) -> StoreResult<()> {
        self.check_values(&values)?;

        let touch = self.options.config.touch_on_set;
        let changed: BTreeSet<FieldId> = values.keys().cloned().collect();
        for (id, value) in values {
            if let Some(entry) = self.edit(&id) {
                entry.dirty = !values_equal(&value, &entry.initial);
                entry.value = value;
                entry.touched |= touch;
            }
        }

        let validate = self.options.config.validate_on_change;
        self.recompute(&changed, changed.clone(), Scope::Affected, validate);
        self.flush();
        Ok(())
    }

    /// Restores initial values and clears touched, dirty, errors and pending
    /// runs.
    ///
    /// With `Some(values)` only the named fields are reset, and the supplied
    /// values become their new initial values.
    pub fn reset_fields(&mut self, values: Option<ValueMap>) -> StoreResult<()> {
        let resets: Vec<(FieldId, Option<Value>)> = match values {
            Some(values) => {
                self.check_values(&values)?;
                values.into_iter().map(|(id, value)| (id, Some(value))).collect()
            }
            None => {
                self.submitted = false;
                self.schema.field_ids().iter().map(|id| (id.clone(), None)).collect()
            }
        };

        let mut changed = BTreeSet::new();
        for (id, value) in resets {
            self.pending.remove(id.as_str());
            if let Some(entry) = self.edit(&id) {
                if let Some(value) = value {
                    entry.initial = value;
                }
                entry.value = entry.initial.clone();
                entry.touched = false;
                entry.dirty = false;
                entry.state = ValidationState::Unvalidated;
                entry.generation += 1;
            }
            changed.insert(id);
        }

        self.recompute(&changed, BTreeSet::new(), Scope::Affected, false);
        self.flush();
        debug!(fields = changed.len(), "Fields reset");
        Ok(())
    }

    /// Marks a field as touched, typically on blur.
    pub fn touch_field(&mut self, id: &str) -> StoreResult<()> {
        let id = self.known(id)?;
        if let Some(entry) = self.edit(&id) {
            entry.touched = true;
        }
        self.flush();
        Ok(())
    }

    /// Runs a field's validator now, regardless of `validate_on_change`.
    /// Inactive fields are left unvalidated.
    pub fn validate_field(&mut self, id: &str) -> StoreResult<ValidationState> {
        let id = self.known(id)?;
        if self.is_active(id.as_str()) {
            let snapshot = self.snapshot();
            self.run_validation(&id, &snapshot);
        } else {
            self.clear_validation(&id);
        }
        self.flush();
        Ok(self
            .entries
            .get(id.as_str())
            .map(|entry| entry.state.clone())
            .unwrap_or_default())
    }

    /// Validates every active field and clears every inactive one.
    pub fn validate_form(&mut self) {
        let snapshot = self.snapshot();
        let ids: Vec<FieldId> = self.schema.field_ids().to_vec();
        for id in &ids {
            if self.is_active(id.as_str()) {
                self.run_validation(id, &snapshot);
            } else {
                self.clear_validation(id);
            }
        }
        self.flush();
    }

    // ── Subscriptions ────────────────────────────────────────────

    /// Registers a listener for value, validation-state and activity
    /// changes.
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&FieldChange) + Send + 'static,
    ) -> SubscriptionId {
        let listener: Listener = Box::new(listener);
        self.subscribers.add(listener)
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    // ── Asynchronous validation ──────────────────────────────────

    /// Fields with a validation run in flight, with the run's generation.
    pub fn pending_validations(&self) -> Vec<(FieldId, u64)> {
        let mut pending: Vec<(FieldId, u64)> = self
            .pending
            .iter()
            .map(|(id, run)| (id.clone(), run.generation))
            .collect();
        pending.sort();
        pending
    }

    /// Hands the in-flight futures to the host. The fields stay `Pending`
    /// until their results come back through
    /// [`resolve_validation`](Self::resolve_validation).
    pub fn take_pending(&mut self) -> Vec<PendingValidation> {
        let mut taken: Vec<PendingValidation> = self
            .pending
            .iter_mut()
            .filter_map(|(id, run)| {
                run.check.take().map(|check| PendingValidation {
                    id: id.clone(),
                    generation: run.generation,
                    check,
                })
            })
            .collect();
        taken.sort_by(|a, b| a.id.cmp(&b.id));
        taken
    }

    /// Applies an asynchronous result if `generation` is still the field's
    /// current one. Returns false (and drops the result) otherwise.
    pub fn resolve_validation(
        &mut self,
        id: &str,
        generation: u64,
        result: Result<(), String>,
    ) -> bool {
        let current = self.entries.get(id).is_some_and(|entry| {
            entry.generation == generation && entry.state.is_pending() && entry.is_active()
        });
        if !current {
            warn!(field = id, generation, "Discarding stale validation result");
            return false;
        }

        self.pending.remove(id);
        let id = FieldId::from(id);
        if let Some(entry) = self.edit(&id) {
            entry.state = match result {
                Ok(()) => ValidationState::Valid,
                Err(message) => ValidationState::Invalid(message),
            };
        }
        self.flush();
        true
    }

    /// Awaits every in-flight run the store still owns and applies the
    /// results. Returns how many were applied.
    pub async fn settle_pending(&mut self) -> usize {
        let runs: Vec<(FieldId, u64, PendingCheck)> = self
            .pending
            .iter_mut()
            .filter_map(|(id, run)| {
                let check = run.check.take()?;
                Some((id.clone(), run.generation, check))
            })
            .collect();
        if runs.is_empty() {
            return 0;
        }

        debug!(runs = runs.len(), "Awaiting pending validations");
        let results = join_all(
            runs.into_iter()
                .map(|(id, generation, check)| async move { (id, generation, check.await) }),
        )
        .await;

        let mut applied = 0;
        for (id, generation, result) in results {
            if self.resolve_validation(id.as_str(), generation, result) {
                applied += 1;
            }
        }
        applied
    }

    // ── Overrides ────────────────────────────────────────────────

    /// Applies a host override patch to the live form.
    ///
    /// Recompiles validators whose rules or type changed, rebuilds the
    /// dependency graph and writes the patch's values. Defaults in the
    /// patch become the fields' initial values, and the current values of
    /// fields that are neither dirty nor touched. On any error the store is
    /// left exactly as it was.
    pub fn apply_overrides(&mut self, patch: &OverridePatch) -> OverrideResult<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let registry = self.options.registry_snapshot();
        let next = formwright_model::apply_overrides(&self.schema, patch, &registry)?;
        let recompiled = self.recompile_set(&next);
        let presence = FieldPresence::of(&next);
        let compile_options = self.options.compile_options();
        let mut validators = self.validators.clone();
        for id in &recompiled {
            let Some(node) = next.node(id.as_str()) else {
                continue;
            };
            let validator = compile(
                node,
                node.handler(),
                &presence,
                &self.options.predicates,
                &compile_options,
            )
            .map_err(|e| OverrideError::Compile(e.to_string()))?;
            validators.insert(id.clone(), validator);
        }
        let evaluator =
            Evaluator::new(&next).map_err(|e| OverrideError::DependencyCycle(e.to_string()))?;

        self.schema = next;
        self.validators = validators;
        self.evaluator = evaluator;

        let mut changed = BTreeSet::new();
        for (id, node_patch) in &patch.fields {
            let Some(node) = self.schema.node(id.as_str()) else {
                continue;
            };
            let default = node.default.clone();
            let handler = Arc::clone(node.handler());
            let default_patched = node_patch.default.is_some();
            let Some(entry) = self.edit(id) else {
                continue;
            };
            let pristine = !entry.dirty && !entry.touched;
            if default_patched || !handler.accepts(&entry.initial) {
                entry.initial = default.clone();
            }
            if !handler.accepts(&entry.value) {
                entry.value = default;
                changed.insert(id.clone());
            } else if pristine && !values_equal(&entry.value, &entry.initial) {
                entry.value = entry.initial.clone();
                changed.insert(id.clone());
            }
            entry.dirty = !values_equal(&entry.value, &entry.initial);
        }

        for (id, value) in &patch.values {
            if let Some(entry) = self.edit(id) {
                entry.value = value.clone();
                entry.dirty = !values_equal(value, &entry.initial);
                changed.insert(id.clone());
            }
        }

        let revalidate: BTreeSet<FieldId> = changed
            .iter()
            .chain(recompiled.iter())
            .filter(|id| {
                self.entries
                    .get(id.as_str())
                    .is_some_and(|entry| entry.state != ValidationState::Unvalidated)
            })
            .cloned()
            .collect();
        let validate = self.options.config.validate_on_change;
        self.recompute(&changed, revalidate, Scope::All, validate);
        self.flush();

        info!(
            recompiled = recompiled.len(),
            values = patch.values.len(),
            "Overrides applied to form"
        );
        Ok(())
    }

    /// Fields whose validator must be rebuilt for `next`: their own rules or
    /// type changed, or a `required_if` reads a field whose type changed.
    fn recompile_set(&self, next: &CanonicalSchema) -> Vec<FieldId> {
        let mut recompiled = changed_rule_fields(&self.schema, next);
        let retyped: BTreeSet<&FieldId> = next
            .nodes()
            .filter(|node| {
                self.schema
                    .node(node.id.as_str())
                    .is_some_and(|old| old.kind != node.kind)
            })
            .map(|node| &node.id)
            .collect();
        if retyped.is_empty() {
            return recompiled;
        }
        for node in next.nodes() {
            let reads_retyped = node.rule_references().iter().any(|id| retyped.contains(id));
            if reads_retyped && !recompiled.contains(&node.id) {
                recompiled.push(node.id.clone());
            }
        }
        recompiled
    }

    // ── Internals ────────────────────────────────────────────────

    fn known(&self, id: &str) -> StoreResult<FieldId> {
        if self.entries.contains_key(id) {
            Ok(FieldId::from(id))
        } else {
            Err(StoreError::UnknownField(FieldId::from(id)))
        }
    }

    fn check_values(&self, values: &ValueMap) -> StoreResult<()> {
        for (id, value) in values {
            let node = self
                .schema
                .node(id.as_str())
                .ok_or_else(|| StoreError::UnknownField(id.clone()))?;
            if !node.handler().accepts(value) {
                return Err(StoreError::RejectedValue {
                    id: id.clone(),
                    kind: node.kind.clone(),
                });
            }
        }
        Ok(())
    }

    /// Mutable access to an entry, journaling its pre-image for
    /// [`flush`](Self::flush).
    fn edit(&mut self, id: &FieldId) -> Option<&mut ValueEntry> {
        let entry = self.entries.get_mut(id.as_str())?;
        self.journal.entry(id.clone()).or_insert_with(|| entry.clone());
        Some(entry)
    }

    /// Re-derives activity for the fields `changed` can affect, then
    /// validates (or, with `validate` off, invalidates) `revalidate`, the
    /// rule dependents of `changed` and every field that became active.
    fn recompute(
        &mut self,
        changed: &BTreeSet<FieldId>,
        mut revalidate: BTreeSet<FieldId>,
        scope: Scope,
        validate: bool,
    ) {
        self.sync_values();
        let snapshot = self.snapshot();
        let activity = match scope {
            Scope::All => self.evaluator.evaluate(&snapshot),
            Scope::Affected => {
                let affected = self.evaluator.affected_by(changed);
                self.evaluator.evaluate_fields(&affected, &snapshot)
            }
        };

        for (id, next) in activity {
            let Some(entry) = self.edit(&id) else {
                continue;
            };
            let was_active = entry.is_active();
            entry.set_activity(next);
            match (was_active, next.is_active()) {
                (false, true) => {
                    debug!(field = %id, "Field activated");
                    revalidate.insert(id);
                }
                (true, false) => {
                    debug!(field = %id, "Field deactivated");
                    self.clear_validation(&id);
                    revalidate.remove(&id);
                }
                _ => {}
            }
        }

        for id in changed {
            revalidate.extend(self.evaluator.graph().rule_dependents(id.as_str()).cloned());
        }

        let order: Vec<FieldId> = self
            .schema
            .field_ids()
            .iter()
            .filter(|id| revalidate.contains(*id))
            .cloned()
            .collect();
        for id in &order {
            if !self.is_active(id.as_str()) {
                continue;
            }
            if validate {
                self.run_validation(id, &snapshot);
            } else {
                self.clear_validation(id);
            }
        }
    }

    /// Starts a new validation run, superseding any run in flight.
    pub(crate) fn run_validation(&mut self, id: &FieldId, snapshot: &ValueSnapshot) {
        let Some(validator) = self.validators.get(id.as_str()).cloned() else {
            return;
        };
        self.pending.remove(id.as_str());
        let Some(entry) = self.edit(id) else {
            return;
        };
        entry.generation += 1;
        let generation = entry.generation;
        let (state, check) = match validator.validate(&entry.value, snapshot) {
            Validation::Ready(Ok(())) => (ValidationState::Valid, None),
            Validation::Ready(Err(message)) => (ValidationState::Invalid(message), None),
            Validation::Pending(check) => (ValidationState::Pending, Some(check)),
        };
        entry.state = state;

        if let Some(check) = check {
            self.pending.insert(
                id.clone(),
                PendingRun {
                    generation,
                    check: Some(check),
                },
            );
        }
        debug!(field = %id, generation, "Field validated");
    }

    /// Forgets a field's validation state and supersedes any run in flight.
    fn clear_validation(&mut self, id: &FieldId) {
        self.pending.remove(id.as_str());
        if let Some(entry) = self.edit(id) {
            entry.state = ValidationState::Unvalidated;
            entry.generation += 1;
        }
    }

    /// Copies the values of journaled entries into the shared value map.
    fn sync_values(&mut self) {
        for id in self.journal.keys() {
            let Some(entry) = self.entries.get(id.as_str()) else {
                continue;
            };
            if self.values.get(id.as_str()) != &entry.value {
                self.values.insert(id.clone(), entry.value.clone());
            }
        }
    }

    /// Ends an operation: notifies subscribers of entries whose value,
    /// state or activity changed and bumps the data version if anything did.
    pub(crate) fn flush(&mut self) {
        self.sync_values();
        let journal = std::mem::take(&mut self.journal);
        let mut modified = false;
        for (id, before) in journal {
            let Some(after) = self.entries.get(id.as_str()) else {
                continue;
            };
            if *after == before {
                continue;
            }
            modified = true;
            if after.value != before.value
                || after.state != before.state
                || after.activity() != before.activity()
            {
                let change = FieldChange {
                    id,
                    value: after.value.clone(),
                    state: after.state.clone(),
                    activity: after.activity(),
                };
                self.subscribers.notify(&change);
            }
        }
        if modified {
            self.data_version += 1;
        }
    }
}

impl fmt::Debug for FormStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormStore")
            .field("fields", &self.schema.len())
            .field("pending", &self.pending.len())
            .field("subscribers", &self.subscribers)
            .field("submitted", &self.submitted)
            .field("data_version", &self.data_version)
            .finish()
    }
}
