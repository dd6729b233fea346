//! FormController: owns the value tree, metadata, arrays and watchers of
//! one mounted form and routes every primitive operation through them.
//!
//! Event-style operations (`input`, `blur`, `set_value`, `begin_trigger`,
//! `begin_submit`) apply their synchronous effects immediately and hand back
//! the asynchronous part as owned [`ValidationJob`]s. Callers either await
//! them in place (`validate`, `trigger`, `submit` do exactly that) or run them
//! elsewhere and feed the outcomes back through [`FormController::apply_outcome`].

use super::error::{FormError, ValidationError};
use super::field_array::{FieldArrayController, FieldArrayEntry, FieldArrayOptions, StableId};
use super::path::{FieldPath, Segment};
use super::store::FieldPathStore;
use super::subscription::{Subscription, SubscriptionHub, WatchEvent, WatchFilter};
use super::tracker::{FieldMeta, FormAggregateState, FormPhase, InteractionTracker};
use super::validation::{Rules, Stage, ValidationEngine, ValidationJob, ValidationOutcome};
use super::value::{kind_of, FieldKind, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// When field validation runs outside of submit/trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    OnChange,
    OnBlur,
    #[default]
    OnSubmit,
    /// First blur, then every change
    OnTouched,
    All,
}

impl ValidationMode {
    fn validates_on_change(&self, touched: bool) -> bool {
        match self {
            Self::OnChange | Self::All => true,
            Self::OnTouched => touched,
            Self::OnBlur | Self::OnSubmit => false,
        }
    }

    fn validates_on_blur(&self) -> bool {
        matches!(self, Self::OnBlur | Self::OnTouched | Self::All)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::OnChange => "onChange",
            Self::OnBlur => "onBlur",
            Self::OnSubmit => "onSubmit",
            Self::OnTouched => "onTouched",
            Self::All => "all",
        }
    }
}

/// Form-wide settings
#[derive(Debug, Clone)]
pub struct FormOptions {
    pub default_values: Value,
    pub mode: ValidationMode,
    /// Mode used once the form has been submitted at least once
    pub revalidate_mode: ValidationMode,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            default_values: Value::empty_object(),
            mode: ValidationMode::OnSubmit,
            revalidate_mode: ValidationMode::OnChange,
        }
    }
}

/// Registration options of one field
#[derive(Debug, Clone)]
pub struct FieldOptions {
    pub kind: FieldKind,
    pub default: Option<Value>,
    pub rules: Rules,
    pub disabled: bool,
}

impl FieldOptions {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            default: None,
            rules: Rules::new(),
            disabled: false,
        }
    }

    pub fn text() -> Self {
        Self::new(FieldKind::Text)
    }

    pub fn number() -> Self {
        Self::new(FieldKind::Number)
    }

    pub fn date() -> Self {
        Self::new(FieldKind::Date)
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn rules(mut self, rules: Rules) -> Self {
        self.rules = rules;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// Handle returned by registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    path: FieldPath,
    kind: FieldKind,
}

impl FieldBinding {
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }
}

/// Side effects requested from `set_value`; none by default
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetValueOptions {
    pub should_validate: bool,
    pub should_dirty: bool,
    pub should_touch: bool,
}

impl SetValueOptions {
    pub fn all() -> Self {
        Self {
            should_validate: true,
            should_dirty: true,
            should_touch: true,
        }
    }
}

/// Read-only view handed to the rendering layer
#[derive(Debug, Clone, PartialEq)]
pub struct FormSnapshot {
    pub values: Value,
    pub errors: BTreeMap<FieldPath, ValidationError>,
    pub touched: BTreeSet<FieldPath>,
    pub dirty: BTreeSet<FieldPath>,
    pub validating: BTreeSet<FieldPath>,
    pub state: FormAggregateState,
    pub phase: FormPhase,
    pub diagnostics: Vec<String>,
}

/// How a submit attempt ended
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitResult {
    Valid(Value),
    Invalid(BTreeMap<FieldPath, ValidationError>),
}

impl SubmitResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, SubmitResult::Valid(_))
    }
}

/// Asynchronous half of a submit attempt
#[must_use = "a pending submit must be run and finished"]
#[derive(Debug)]
pub struct PendingSubmit {
    jobs: Vec<ValidationJob>,
}

impl PendingSubmit {
    /// Run each field's asynchronous validators; fields are checked one after another
    pub async fn run(self) -> Vec<ValidationOutcome> {
        let mut outcomes = Vec::with_capacity(self.jobs.len());
        for job in self.jobs {
            outcomes.push(job.run().await);
        }
        outcomes
    }
}

#[derive(Debug)]
pub struct FormController {
    store: FieldPathStore,
    engine: ValidationEngine,
    tracker: InteractionTracker,
    arrays: FieldArrayController,
    hub: SubscriptionHub,
    kinds: BTreeMap<FieldPath, FieldKind>,
    disabled: BTreeSet<FieldPath>,
    mode: ValidationMode,
    revalidate_mode: ValidationMode,
    diagnostics: Vec<String>,
}

impl FormController {
    pub fn new(options: FormOptions) -> Self {
        Self {
            store: FieldPathStore::new(options.default_values),
            engine: ValidationEngine::default(),
            tracker: InteractionTracker::default(),
            arrays: FieldArrayController::default(),
            hub: SubscriptionHub::default(),
            kinds: BTreeMap::new(),
            disabled: BTreeSet::new(),
            mode: options.mode,
            revalidate_mode: options.revalidate_mode,
            diagnostics: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register a leaf field.
    ///
    /// Re-registering replaces the rules and keeps value and meta.
    pub fn register(
        &mut self,
        path: &FieldPath,
        options: FieldOptions,
    ) -> Result<FieldBinding, FormError> {
        self.register_field(path, options, true)
    }

    fn register_field(
        &mut self,
        path: &FieldPath,
        options: FieldOptions,
        capture_default: bool,
    ) -> Result<FieldBinding, FormError> {
        if path.is_root() {
            return Err(FormError::InvalidPath(String::new()));
        }
        let kind = options.kind;
        let default = options
            .default
            .clone()
            .or_else(|| self.store.default_of(path).cloned())
            .unwrap_or_default();
        check_kind(path, kind, &default)?;
        if let Some(current) = self.store.get(path) {
            check_kind(path, kind, current)?;
        }

        if capture_default {
            self.store.capture_default(path, default);
        } else if !self.store.has(path) {
            self.store.set(path, default);
        }

        let is_new = !self.tracker.is_registered(path);
        self.engine.set_rules(path, options.rules);
        self.kinds.insert(path.clone(), kind);
        if options.disabled {
            self.disabled.insert(path.clone());
        }
        self.tracker.ensure(path);
        if is_new {
            let dirty = self.store.is_dirty(path);
            self.tracker.mark_dirty(path, dirty);
            tracing::debug!("Registered `{path}` as {}", kind.label());
        }

        Ok(FieldBinding {
            path: path.clone(),
            kind,
        })
    }

    /// Register a field array; existing default entries get their fields registered
    pub fn register_array(
        &mut self,
        path: &FieldPath,
        options: FieldArrayOptions,
    ) -> Result<(), FormError> {
        let len = match self.store.get(path) {
            None | Some(Value::Null) => {
                self.store.capture_default(path, Value::List(Vec::new()));
                0
            }
            Some(Value::List(items)) => items.len(),
            Some(other) => {
                return Err(FormError::TypeMismatch {
                    path: path.clone(),
                    expected: "list",
                    found: kind_of(other),
                })
            }
        };

        self.arrays.register(path, len, options);
        self.tracker.ensure(path);
        for index in 0..len {
            self.register_entry_fields(path, index, true)?;
        }
        tracing::debug!("Registered field array `{path}` with {len} entries");
        Ok(())
    }

    fn register_entry_fields(
        &mut self,
        array: &FieldPath,
        index: usize,
        capture_default: bool,
    ) -> Result<(), FormError> {
        let entry = array.index(index);
        let fields = self.arrays.options(array)?.entry_fields.clone();
        for (relative, options) in fields {
            self.register_field(&entry.join(&relative), options, capture_default)?;
        }
        Ok(())
    }

    /// Toggle a field's disabled state.
    ///
    /// Disabled fields are not validated and are left out of submitted values.
    pub fn set_disabled(&mut self, path: &FieldPath, disabled: bool) -> Result<(), FormError> {
        self.require_field(path)?;
        if disabled {
            if self.disabled.insert(path.clone()) {
                self.engine.supersede(path);
                self.tracker.set_validating(path, false);
                self.tracker.set_error(path, None);
            }
        } else {
            self.disabled.remove(path);
        }
        Ok(())
    }

    pub fn is_disabled(&self, path: &FieldPath) -> bool {
        self.disabled.contains(path)
    }

    pub fn binding(&self, path: &FieldPath) -> Option<FieldBinding> {
        self.kinds.get(path).map(|kind| FieldBinding {
            path: path.clone(),
            kind: *kind,
        })
    }

    pub fn is_registered(&self, path: &FieldPath) -> bool {
        self.kinds.contains_key(path)
    }

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    /// Raw input from a widget: parse, store, track dirty, notify, and
    /// validate if the current mode asks for it
    pub fn input(
        &mut self,
        path: &FieldPath,
        raw: &str,
    ) -> Result<Option<ValidationJob>, FormError> {
        let kind = self.require_field(path)?;
        self.change(path, kind.parse_raw(raw))
    }

    /// Typed value change coming from the rendering layer
    pub fn change(
        &mut self,
        path: &FieldPath,
        value: Value,
    ) -> Result<Option<ValidationJob>, FormError> {
        self.ensure_idle()?;
        let kind = self.require_field(path)?;
        check_kind(path, kind, &value)?;

        self.write(path, value);
        self.refresh_dirty(path);
        self.hub
            .notify(std::slice::from_ref(path), self.store.get_all());

        let touched = self.tracker.meta(path).is_some_and(|m| m.touched);
        if self.active_mode().validates_on_change(touched) {
            Ok(self.start_validation(path))
        } else {
            Ok(None)
        }
    }

    /// The field lost focus
    pub fn blur(&mut self, path: &FieldPath) -> Result<Option<ValidationJob>, FormError> {
        self.require_field(path)?;
        self.tracker.mark_touched(path);
        if self.active_mode().validates_on_blur() && !self.tracker.is_submitting() {
            Ok(self.start_validation(path))
        } else {
            Ok(None)
        }
    }

    /// Programmatic assignment; side effects only when requested
    pub fn set_value(
        &mut self,
        path: &FieldPath,
        value: Value,
        options: SetValueOptions,
    ) -> Result<Vec<ValidationJob>, FormError> {
        self.ensure_idle()?;
        if self.arrays.paths().any(|array| path.is_prefix_of(array)) {
            return Err(FormError::StructuralWrite(path.clone()));
        }
        let fields = self.fields_under(path);
        if fields.is_empty() {
            return Err(FormError::UnknownField(path.clone()));
        }
        for field in &fields {
            let Some(relative) = field.strip_prefix(path) else {
                continue;
            };
            // Every registered leaf must survive the write
            let Some(new_value) = value.get(&relative) else {
                return Err(FormError::StructuralWrite(path.clone()));
            };
            check_kind(field, self.kinds[field], new_value)?;
        }

        self.write(path, value);
        if options.should_dirty {
            self.refresh_dirty(path);
        }
        if options.should_touch {
            for field in &fields {
                self.tracker.mark_touched(field);
            }
        }
        self.hub
            .notify(std::slice::from_ref(path), self.store.get_all());

        if options.should_validate {
            Ok(fields
                .iter()
                .filter_map(|field| self.start_validation(field))
                .collect())
        } else {
            Ok(Vec::new())
        }
    }

    /// Store a value and invalidate pending validations beneath it
    fn write(&mut self, path: &FieldPath, value: Value) {
        self.store.set(path, value);
        for field in self.fields_under(path) {
            self.engine.supersede(&field);
            self.tracker.set_validating(&field, false);
        }
    }

    /// Recompute dirty for every tracked path overlapping `path`
    fn refresh_dirty(&mut self, path: &FieldPath) {
        let affected: Vec<FieldPath> = self
            .tracker
            .metas()
            .map(|(p, _)| p)
            .filter(|p| p.overlaps(path))
            .cloned()
            .collect();
        for p in affected {
            let dirty = self.store.is_dirty(&p);
            self.tracker.mark_dirty(&p, dirty);
        }
        self.tracker.note_edit();
    }

    /// The whole value tree
    pub fn get_values(&self) -> &Value {
        self.store.get_all()
    }

    /// One path's value, `Null` when unknown
    pub fn get_value(&self, path: &FieldPath) -> Value {
        self.store.get_or_null(path)
    }

    /// Values of several paths, in the order asked
    pub fn get_many(&self, paths: &[FieldPath]) -> Vec<Value> {
        paths.iter().map(|path| self.get_value(path)).collect()
    }

    /// Values handed to `on_valid`: the tree minus disabled fields
    fn submission_values(&self) -> Value {
        let mut values = self.store.get_all().clone();
        for path in &self.disabled {
            match path.segments().last() {
                Some(Segment::Key(_)) => {
                    values.remove(path);
                }
                _ => values.set(path, Value::Null),
            }
        }
        values
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    fn active_mode(&self) -> ValidationMode {
        if self.tracker.submit_count() > 0 {
            self.revalidate_mode
        } else {
            self.mode
        }
    }

    /// Run stages 1-3 for `path` and return the asynchronous remainder
    fn start_validation(&mut self, path: &FieldPath) -> Option<ValidationJob> {
        if self.disabled.contains(path) {
            self.engine.supersede(path);
            self.tracker.set_validating(path, false);
            self.tracker.set_error(path, None);
            return None;
        }

        let value = self.store.get_or_null(path);
        match self.engine.begin(path, &value, self.store.get_all()) {
            Stage::Settled(error) => {
                self.tracker.set_validating(path, false);
                self.tracker.set_error(path, error);
                None
            }
            Stage::Pending(job) => {
                // Previous error stays visible until the job resolves
                self.tracker.set_validating(path, true);
                Some(job)
            }
        }
    }

    /// Apply a finished job; stale outcomes are dropped and `false` returned
    pub fn apply_outcome(&mut self, outcome: ValidationOutcome) -> bool {
        if !self.engine.is_current(&outcome) {
            tracing::debug!(
                "Discarding superseded validation of `{}` (generation {})",
                outcome.path,
                outcome.generation
            );
            return false;
        }
        self.tracker.set_validating(&outcome.path, false);
        if let Some(ValidationError::ValidatorFailed { rule, reason }) = &outcome.error {
            self.diagnostics.push(format!(
                "Validator `{rule}` failed on `{}`: {reason}",
                outcome.path
            ));
        }
        self.tracker.set_error(&outcome.path, outcome.error);
        true
    }

    /// Validate one field to completion
    pub async fn validate(
        &mut self,
        path: &FieldPath,
    ) -> Result<Option<ValidationError>, FormError> {
        self.ensure_idle()?;
        self.require_field(path)?;
        if let Some(job) = self.start_validation(path) {
            let outcome = job.run().await;
            self.apply_outcome(outcome);
        }
        Ok(self.error(path).cloned())
    }

    /// Validate every registered field to completion
    pub async fn validate_all(
        &mut self,
    ) -> Result<BTreeMap<FieldPath, Option<ValidationError>>, FormError> {
        self.ensure_idle()?;
        let jobs = self.start_all(&FieldPath::root());
        for job in jobs {
            let outcome = job.run().await;
            self.apply_outcome(outcome);
        }
        Ok(self
            .kinds
            .keys()
            .map(|path| (path.clone(), self.error(path).cloned()))
            .collect())
    }

    fn start_all(&mut self, under: &FieldPath) -> Vec<ValidationJob> {
        self.fields_under(under)
            .iter()
            .filter_map(|path| self.start_validation(path))
            .collect()
    }

    /// Start re-validation of one field, a subtree, or (with `None`) the whole form
    pub fn begin_trigger(
        &mut self,
        path: Option<&FieldPath>,
    ) -> Result<Vec<ValidationJob>, FormError> {
        self.ensure_idle()?;
        let root = FieldPath::root();
        let under = path.unwrap_or(&root);
        if self.fields_under(under).is_empty() {
            return Err(FormError::UnknownField(under.clone()));
        }
        tracing::debug!("Trigger validation under `{under}`");
        Ok(self.start_all(under))
    }

    /// Re-validate outside of submission; true when every checked field is valid
    pub async fn trigger(&mut self, path: Option<&FieldPath>) -> Result<bool, FormError> {
        let jobs = self.begin_trigger(path)?;
        for job in jobs {
            let outcome = job.run().await;
            self.apply_outcome(outcome);
        }
        let root = FieldPath::root();
        let under = path.unwrap_or(&root);
        Ok(self
            .fields_under(under)
            .iter()
            .all(|field| self.error(field).is_none()))
    }

    /// Set a manual error on a field
    pub fn set_error(&mut self, path: &FieldPath, message: impl Into<String>) -> Result<(), FormError> {
        self.require_field(path)?;
        self.tracker.set_error(
            path,
            Some(ValidationError::Custom {
                rule: "manual".to_string(),
                message: message.into(),
            }),
        );
        Ok(())
    }

    /// Clear errors of one subtree, or of the whole form
    pub fn clear_errors(&mut self, path: Option<&FieldPath>) {
        let root = FieldPath::root();
        for field in self.fields_under(path.unwrap_or(&root)) {
            self.tracker.set_error(&field, None);
        }
        if path.is_none() {
            self.diagnostics.clear();
        }
    }

    // ------------------------------------------------------------------
    // Submission and reset
    // ------------------------------------------------------------------

    /// Enter the submitting state and start validating every field
    pub fn begin_submit(&mut self) -> PendingSubmit {
        self.tracker.begin_submit();
        self.diagnostics.clear();
        PendingSubmit {
            jobs: self.start_all(&FieldPath::root()),
        }
    }

    /// Apply the outcomes of a submit attempt and call exactly one handler
    pub fn finish_submit<V, I>(
        &mut self,
        outcomes: Vec<ValidationOutcome>,
        on_valid: V,
        on_invalid: I,
    ) -> SubmitResult
    where
        V: FnOnce(&Value),
        I: FnOnce(&BTreeMap<FieldPath, ValidationError>),
    {
        for outcome in outcomes {
            self.apply_outcome(outcome);
        }

        let errors = self.errors();
        if errors.is_empty() {
            let values = self.submission_values();
            self.tracker.finish_submit(true);
            tracing::info!("Submit #{} succeeded", self.tracker.submit_count());
            on_valid(&values);
            SubmitResult::Valid(values)
        } else {
            self.tracker.finish_submit(false);
            tracing::info!(
                "Submit #{} failed with {} errors",
                self.tracker.submit_count(),
                errors.len()
            );
            on_invalid(&errors);
            SubmitResult::Invalid(errors)
        }
    }

    /// Validate everything and hand the result to one of the handlers
    pub async fn submit<V, I>(&mut self, on_valid: V, on_invalid: I) -> SubmitResult
    where
        V: FnOnce(&Value),
        I: FnOnce(&BTreeMap<FieldPath, ValidationError>),
    {
        let pending = self.begin_submit();
        let outcomes = pending.run().await;
        self.finish_submit(outcomes, on_valid, on_invalid)
    }

    /// Restore captured defaults and pristine metadata; `submit_count` is kept
    pub fn reset(&mut self) -> Result<(), FormError> {
        self.ensure_idle()?;
        self.store.reset();
        self.rebuild_after_reset()
    }

    /// Reset to new defaults, which become the captured defaults
    pub fn reset_to(&mut self, defaults: Value) -> Result<(), FormError> {
        self.ensure_idle()?;
        for (path, kind) in &self.kinds {
            if self.arrays.paths().any(|array| array.is_prefix_of(path)) {
                continue;
            }
            if let Some(value) = defaults.get(path) {
                check_kind(path, *kind, value)?;
            }
        }
        self.store.reset_to(defaults);
        self.rebuild_after_reset()
    }

    fn rebuild_after_reset(&mut self) -> Result<(), FormError> {
        let arrays: Vec<FieldPath> = self.arrays.paths().cloned().collect();
        for array in &arrays {
            self.kinds.retain(|p, _| p.entry_index_under(array).is_none());
            self.disabled.retain(|p| p.entry_index_under(array).is_none());
            for index in 0..self.arrays.ids(array)?.len() {
                let entry = array.index(index);
                self.tracker.discard_subtree(&entry);
                self.engine.discard_subtree(&entry);
            }
        }

        for path in self.kinds.keys().cloned().collect::<Vec<_>>() {
            self.store.capture_default(&path, Value::Null);
            self.engine.supersede(&path);
        }
        self.tracker.reset();

        for array in &arrays {
            let len = match self.store.get(array) {
                Some(Value::List(items)) => items.len(),
                _ => {
                    self.store.capture_default(array, Value::List(Vec::new()));
                    0
                }
            };
            self.arrays.reset(array, len);
            for index in 0..len {
                self.register_entry_fields(array, index, true)?;
            }
        }

        self.diagnostics.clear();
        self.hub.notify(&[FieldPath::root()], self.store.get_all());
        tracing::debug!("Form reset");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Field arrays
    // ------------------------------------------------------------------

    /// Add an entry at the end of `array`
    pub fn append(&mut self, array: &FieldPath, value: Value) -> Result<StableId, FormError> {
        self.ensure_idle()?;
        let options = self.arrays.options(array)?;
        for (relative, field) in &options.entry_fields {
            if let Some(v) = value.get(relative) {
                check_kind(&array.join(relative), field.kind, v)?;
            }
        }

        let index = self.arrays.ids(array)?.len();
        let id = self.arrays.push(array)?;
        let entry = array.index(index);
        self.store.set(&entry, value);
        self.register_entry_fields(array, index, false)?;
        self.refresh_dirty(array);
        self.hub
            .notify(std::slice::from_ref(&entry), self.store.get_all());
        tracing::debug!("Appended entry {id} to `{array}` at {index}");
        Ok(id)
    }

    /// Remove the entry with `id`; later entries shift down, ids stay put
    pub fn remove(&mut self, array: &FieldPath, id: StableId) -> Result<(), FormError> {
        self.ensure_idle()?;
        let index = self.arrays.take(array, id)?;
        self.remove_entry(array, index);
        tracing::debug!("Removed entry {id} from `{array}` at {index}");
        Ok(())
    }

    /// Remove the entry at `index`, returning its id
    pub fn remove_at(&mut self, array: &FieldPath, index: usize) -> Result<StableId, FormError> {
        self.ensure_idle()?;
        let id = self.arrays.take_at(array, index)?;
        self.remove_entry(array, index);
        tracing::debug!("Removed entry {id} from `{array}` at {index}");
        Ok(id)
    }

    fn remove_entry(&mut self, array: &FieldPath, index: usize) {
        let entry = array.index(index);
        self.store.remove(&entry);
        self.tracker.discard_subtree(&entry);
        self.engine.discard_subtree(&entry);
        self.kinds.retain(|p, _| !entry.is_prefix_of(p));
        self.disabled.retain(|p| !entry.is_prefix_of(p));

        let depth = array.len();
        let shift = |p: &FieldPath| match p.entry_index_under(array) {
            Some(i) if i > index => Some(p.with_index_at(depth, i - 1)),
            _ => None,
        };
        self.tracker.rekey(shift);
        self.engine.rekey(shift);
        self.kinds = std::mem::take(&mut self.kinds)
            .into_iter()
            .map(|(p, kind)| (shift(&p).unwrap_or(p), kind))
            .collect();
        self.disabled = std::mem::take(&mut self.disabled)
            .into_iter()
            .map(|p| shift(&p).unwrap_or(p))
            .collect();
        for field in self.fields_under(array) {
            self.tracker.set_validating(&field, false);
        }

        self.refresh_dirty(array);
        self.hub
            .notify(std::slice::from_ref(array), self.store.get_all());
    }

    /// Entries of `array` in order, each with its stable id
    pub fn entries(&self, array: &FieldPath) -> Result<Vec<FieldArrayEntry>, FormError> {
        let ids = self.arrays.ids(array)?;
        let items = self
            .store
            .get_all()
            .get(array)
            .and_then(Value::as_list)
            .cloned()
            .unwrap_or_default();
        Ok(ids
            .iter()
            .zip(items)
            .enumerate()
            .map(|(index, (id, value))| FieldArrayEntry {
                id: *id,
                index,
                value,
            })
            .collect())
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Watch value changes of the whole form or one subtree
    pub fn subscribe<F>(&mut self, filter: WatchFilter, callback: F) -> Subscription
    where
        F: FnMut(&WatchEvent<'_>) + Send + 'static,
    {
        self.hub.subscribe(filter, callback)
    }

    pub fn meta(&self, path: &FieldPath) -> Option<&FieldMeta> {
        self.tracker.meta(path)
    }

    pub fn error(&self, path: &FieldPath) -> Option<&ValidationError> {
        self.tracker.meta(path).and_then(|meta| meta.error.as_ref())
    }

    /// Current errors of every path that has one
    pub fn errors(&self) -> BTreeMap<FieldPath, ValidationError> {
        self.tracker
            .metas()
            .filter_map(|(path, meta)| meta.error.clone().map(|error| (path.clone(), error)))
            .collect()
    }

    pub fn state(&self) -> FormAggregateState {
        self.tracker.snapshot()
    }

    pub fn phase(&self) -> FormPhase {
        self.tracker.phase()
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Form-level messages, e.g. validators that failed to run
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    pub fn snapshot(&self) -> FormSnapshot {
        let mut touched = BTreeSet::new();
        let mut dirty = BTreeSet::new();
        let mut validating = BTreeSet::new();
        for (path, meta) in self.tracker.metas() {
            if meta.touched {
                touched.insert(path.clone());
            }
            if meta.dirty {
                dirty.insert(path.clone());
            }
            if meta.validating {
                validating.insert(path.clone());
            }
        }
        FormSnapshot {
            values: self.store.get_all().clone(),
            errors: self.errors(),
            touched,
            dirty,
            validating,
            state: self.tracker.snapshot(),
            phase: self.tracker.phase(),
            diagnostics: self.diagnostics.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// A running submit owns every field's validation until it finishes
    fn ensure_idle(&self) -> Result<(), FormError> {
        if self.tracker.is_submitting() {
            Err(FormError::SubmitInProgress)
        } else {
            Ok(())
        }
    }

    fn require_field(&self, path: &FieldPath) -> Result<FieldKind, FormError> {
        self.kinds
            .get(path)
            .copied()
            .ok_or_else(|| FormError::UnknownField(path.clone()))
    }

    fn fields_under(&self, path: &FieldPath) -> Vec<FieldPath> {
        self.kinds
            .keys()
            .filter(|p| path.is_prefix_of(p))
            .cloned()
            .collect()
    }
}

fn check_kind(path: &FieldPath, kind: FieldKind, value: &Value) -> Result<(), FormError> {
    if kind.accepts(value) {
        Ok(())
    } else {
        Err(FormError::TypeMismatch {
            path: path.clone(),
            expected: kind.label(),
            found: kind_of(value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::validation::AsyncRule;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use regex::Regex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Rejects one address as already taken and counts its calls
    struct Directory {
        taken: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AsyncRule for Directory {
        async fn check(&self, value: Value, _form: Value) -> anyhow::Result<Result<(), String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if value.as_str() == Some(self.taken) {
                Ok(Err("Email already exists".to_string()))
            } else {
                Ok(Ok(()))
            }
        }
    }

    struct Offline;

    #[async_trait]
    impl AsyncRule for Offline {
        async fn check(&self, _value: Value, _form: Value) -> anyhow::Result<Result<(), String>> {
            Err(anyhow!("directory unreachable"))
        }
    }

    fn path(p: &str) -> FieldPath {
        FieldPath::of(p)
    }

    fn defaults() -> Value {
        Value::object([
            ("username", Value::text("")),
            ("email", Value::text("")),
            ("channel", Value::text("")),
            (
                "social",
                Value::object([("twitter", Value::text("")), ("facebook", Value::text(""))]),
            ),
            (
                "phNumbers",
                Value::List(vec![Value::object([("number", Value::text(""))])]),
            ),
        ])
    }

    fn form_with(mode: ValidationMode) -> (FormController, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut form = FormController::new(FormOptions {
            default_values: defaults(),
            mode,
            ..FormOptions::default()
        });
        form.register(
            &path("username"),
            FieldOptions::text().rules(Rules::new().required("Username is required")),
        )
        .unwrap();
        form.register(
            &path("email"),
            FieldOptions::text().rules(
                Rules::new()
                    .required("Email is required")
                    .pattern(Regex::new(r"^\S+@\S+\.\S+$").unwrap(), "Invalid email format")
                    .validate_async(
                        "emailAvailable",
                        Directory {
                            taken: "taken@example.com",
                            calls: calls.clone(),
                        },
                    ),
            ),
        )
        .unwrap();
        form.register(&path("channel"), FieldOptions::text()).unwrap();
        form.register(&path("social.twitter"), FieldOptions::text())
            .unwrap();
        form.register(&path("age"), FieldOptions::number().default_value(0.0))
            .unwrap();
        form.register_array(
            &path("phNumbers"),
            FieldArrayOptions::new().field(path("number"), FieldOptions::text()),
        )
        .unwrap();
        (form, calls)
    }

    fn form() -> FormController {
        form_with(ValidationMode::OnSubmit).0
    }

    fn fill_valid(form: &mut FormController) {
        let _ = form.input(&path("username"), "bob").unwrap();
        let _ = form.input(&path("email"), "bob@example.com").unwrap();
    }

    #[test]
    fn test_registration_captures_defaults() {
        let form = form();
        assert_eq!(form.get_value(&path("username")), Value::text(""));
        assert_eq!(form.get_value(&path("age")), Value::Number(0.0));
        let meta = form.meta(&path("age")).unwrap();
        assert!(!meta.dirty && !meta.touched);
        assert_eq!(form.phase(), FormPhase::Clean);
        assert_eq!(form.entries(&path("phNumbers")).unwrap().len(), 1);
        assert!(form.is_registered(&path("phNumbers.0.number")));
    }

    #[test]
    fn test_register_rejects_wrong_kind() {
        let mut form = form();
        let err = form
            .register(&path("username"), FieldOptions::number())
            .unwrap_err();
        assert_eq!(
            err,
            FormError::TypeMismatch {
                path: path("username"),
                expected: "number",
                found: "text",
            }
        );
        assert!(matches!(
            form.register(&FieldPath::root(), FieldOptions::text()),
            Err(FormError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_dirty_follows_value_not_history() {
        let mut form = form();
        let username = path("username");
        let _ = form.input(&username, "bob").unwrap();
        assert!(form.meta(&username).unwrap().dirty);
        assert_eq!(form.phase(), FormPhase::Dirty);

        let _ = form.input(&username, "").unwrap();
        assert!(!form.meta(&username).unwrap().dirty);
        assert!(!form.state().is_dirty);
        assert_eq!(form.phase(), FormPhase::Clean);
    }

    #[test]
    fn test_input_parses_by_kind() {
        let mut form = form();
        let _ = form.input(&path("age"), "42").unwrap();
        assert_eq!(form.get_value(&path("age")), Value::Number(42.0));
        let _ = form.input(&path("age"), "forty").unwrap();
        assert_eq!(form.get_value(&path("age")), Value::Null);
        assert!(matches!(
            form.input(&path("nope"), "x"),
            Err(FormError::UnknownField(_))
        ));
    }

    #[test]
    fn test_touched_survives_later_edits() {
        let mut form = form();
        let username = path("username");
        let _ = form.blur(&username).unwrap();
        let _ = form.input(&username, "bob").unwrap();
        let _ = form.input(&username, "").unwrap();
        assert!(form.meta(&username).unwrap().touched);
    }

    #[test]
    fn test_on_submit_mode_defers_validation_until_first_submit() {
        let mut form = form();
        let username = path("username");
        let _ = form.input(&username, "").unwrap();
        let _ = form.blur(&username).unwrap();
        assert_eq!(form.error(&username), None);
    }

    #[tokio::test]
    async fn test_revalidates_on_change_after_submit() {
        let mut form = form();
        let username = path("username");
        let result = form.submit(|_| {}, |_| {}).await;
        assert!(!result.is_valid());
        assert_eq!(
            form.error(&username).map(ToString::to_string),
            Some("Username is required".to_string())
        );

        let job = form.input(&username, "bob").unwrap();
        assert!(job.is_none());
        assert_eq!(form.error(&username), None);
    }

    #[test]
    fn test_on_change_mode_validates_each_input() {
        let (mut form, _) = form_with(ValidationMode::OnChange);
        let email = path("email");
        let job = form.input(&email, "not-an-email").unwrap();
        assert!(job.is_none());
        assert_eq!(
            form.error(&email).map(ValidationError::rule),
            Some("pattern")
        );
    }

    #[test]
    fn test_on_blur_mode_validates_on_blur_only() {
        let (mut form, _) = form_with(ValidationMode::OnBlur);
        let username = path("username");
        let _ = form.input(&username, "").unwrap();
        assert_eq!(form.error(&username), None);
        let _ = form.blur(&username).unwrap();
        assert_eq!(form.error(&username).map(ValidationError::rule), Some("required"));
    }

    #[test]
    fn test_on_touched_mode_validates_changes_after_blur() {
        let (mut form, _) = form_with(ValidationMode::OnTouched);
        let username = path("username");
        let _ = form.input(&username, "bob").unwrap();
        let _ = form.input(&username, "").unwrap();
        assert_eq!(form.error(&username), None);
        let _ = form.blur(&username).unwrap();
        assert!(form.error(&username).is_some());
        let _ = form.input(&username, "bob").unwrap();
        assert_eq!(form.error(&username), None);
    }

    #[tokio::test]
    async fn test_required_short_circuits_async_rules() {
        let (mut form, calls) = form_with(ValidationMode::OnSubmit);
        let error = form.validate(&path("email")).await.unwrap();
        assert_eq!(error.map(|e| e.rule().to_string()), Some("required".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let _ = form.input(&path("email"), "bad").unwrap();
        form.validate(&path("email")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_async_rule_runs_after_sync_stages_pass() {
        let (mut form, calls) = form_with(ValidationMode::OnSubmit);
        let email = path("email");
        let _ = form.input(&email, "taken@example.com").unwrap();
        let error = form.validate(&email).await.unwrap();
        assert_eq!(
            error,
            Some(ValidationError::Custom {
                rule: "emailAvailable".to_string(),
                message: "Email already exists".to_string(),
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!form.meta(&email).unwrap().validating);
    }

    #[tokio::test]
    async fn test_superseded_outcome_is_discarded() {
        let (mut form, _) = form_with(ValidationMode::OnChange);
        let email = path("email");

        let first = form.input(&email, "taken@example.com").unwrap().unwrap();
        assert!(form.meta(&email).unwrap().validating);
        let second = form.input(&email, "free@example.com").unwrap().unwrap();

        // The later job resolves first, the earlier one afterwards
        let latest = second.run().await;
        let stale = first.run().await;
        assert!(form.apply_outcome(latest));
        assert!(!form.apply_outcome(stale));

        assert_eq!(form.error(&email), None);
        assert!(!form.meta(&email).unwrap().validating);
    }

    #[tokio::test]
    async fn test_write_during_flight_discards_outcome() {
        let (mut form, _) = form_with(ValidationMode::OnChange);
        let email = path("email");
        let job = form.input(&email, "taken@example.com").unwrap().unwrap();
        form.set_value(&email, Value::text("x"), SetValueOptions::default())
            .unwrap();
        assert!(!form.apply_outcome(job.run().await));
        assert_eq!(form.error(&email), None);
    }

    #[tokio::test]
    async fn test_validator_failure_is_reported_not_treated_as_invalid_input() {
        let mut form = FormController::new(FormOptions::default());
        let email = path("email");
        form.register(
            &email,
            FieldOptions::text().rules(Rules::new().validate_async("emailAvailable", Offline)),
        )
        .unwrap();
        let _ = form.input(&email, "bob@example.com").unwrap();
        let error = form.validate(&email).await.unwrap().unwrap();
        assert!(!error.is_user_correctable());
        assert_eq!(form.diagnostics().len(), 1);
        assert!(form.diagnostics()[0].contains("directory unreachable"));
    }

    #[tokio::test]
    async fn test_submit_invokes_exactly_one_handler() {
        let mut form = form();
        let valid_calls = Arc::new(AtomicUsize::new(0));
        let invalid_calls = Arc::new(AtomicUsize::new(0));

        let (v, i) = (valid_calls.clone(), invalid_calls.clone());
        form.submit(
            move |_| {
                v.fetch_add(1, Ordering::SeqCst);
            },
            move |errors| {
                assert!(errors.contains_key(&path("username")));
                i.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;
        assert_eq!(valid_calls.load(Ordering::SeqCst), 0);
        assert_eq!(invalid_calls.load(Ordering::SeqCst), 1);
        assert_eq!(form.phase(), FormPhase::SubmitFailed);

        fill_valid(&mut form);
        let submitted = Arc::new(Mutex::new(None));
        let sink = submitted.clone();
        let result = form
            .submit(
                move |values| *sink.lock().unwrap() = Some(values.clone()),
                |_| panic!("form should be valid"),
            )
            .await;
        assert!(result.is_valid());
        let values = submitted.lock().unwrap().clone().unwrap();
        assert_eq!(values.get(&path("username")), Some(&Value::text("bob")));

        let state = form.state();
        assert_eq!(state.submit_count, 2);
        assert!(state.is_submitted && state.is_submit_successful && !state.is_submitting);
        assert_eq!(form.phase(), FormPhase::SubmitSuccessful);
    }

    #[tokio::test]
    async fn test_submit_count_moves_once_per_attempt() {
        let mut form = form();
        let pending = form.begin_submit();
        assert!(form.state().is_submitting);
        assert_eq!(form.phase(), FormPhase::Submitting);
        assert_eq!(form.state().submit_count, 0);
        let outcomes = pending.run().await;
        form.finish_submit(outcomes, |_| {}, |_| {});
        assert_eq!(form.state().submit_count, 1);
        assert!(!form.state().is_submitting);
    }

    #[tokio::test]
    async fn test_edit_after_success_returns_to_dirty() {
        let mut form = form();
        fill_valid(&mut form);
        form.submit(|_| {}, |_| {}).await;
        let _ = form.input(&path("channel"), "rust").unwrap();
        assert_eq!(form.phase(), FormPhase::Dirty);
    }

    #[tokio::test]
    async fn test_disabled_field_skipped_and_omitted() {
        let mut form = form();
        fill_valid(&mut form);
        form.register(
            &path("social.twitter"),
            FieldOptions::text().rules(Rules::new().required("Twitter is required")),
        )
        .unwrap();
        form.set_disabled(&path("social.twitter"), true).unwrap();

        let result = form.submit(|_| {}, |_| {}).await;
        let SubmitResult::Valid(values) = result else {
            panic!("expected a valid submit");
        };
        assert_eq!(values.get(&path("social.twitter")), None);
        assert_eq!(values.get(&path("social.facebook")), Some(&Value::text("")));
    }

    #[tokio::test]
    async fn test_set_value_is_plain_assignment_by_default() {
        let (mut form, _) = form_with(ValidationMode::OnChange);
        let username = path("username");
        let jobs = form
            .set_value(&username, Value::text(""), SetValueOptions::default())
            .unwrap();
        assert!(jobs.is_empty());
        form.set_value(&username, Value::text("x"), SetValueOptions::default())
            .unwrap();
        let meta = form.meta(&username).unwrap();
        assert!(!meta.dirty && !meta.touched && meta.error.is_none());
    }

    #[test]
    fn test_set_value_with_all_flags() {
        let mut form = form();
        let username = path("username");
        form.set_value(&username, Value::text("Code with me"), SetValueOptions::all())
            .unwrap();
        let meta = form.meta(&username).unwrap();
        assert!(meta.dirty && meta.touched);
        assert_eq!(meta.error, None);

        form.set_value(&username, Value::text(""), SetValueOptions::all())
            .unwrap();
        assert_eq!(form.error(&username).map(ValidationError::rule), Some("required"));
    }

    #[test]
    fn test_set_value_on_object_subtree() {
        let mut form = form();
        form.set_value(
            &path("social"),
            Value::object([("twitter", Value::text("@bob")), ("facebook", Value::text(""))]),
            SetValueOptions {
                should_dirty: true,
                ..SetValueOptions::default()
            },
        )
        .unwrap();
        assert_eq!(form.get_value(&path("social.twitter")), Value::text("@bob"));
        assert!(form.meta(&path("social.twitter")).unwrap().dirty);
    }

    #[test]
    fn test_set_value_rejects_structural_and_mistyped_writes() {
        let mut form = form();
        assert!(matches!(
            form.set_value(&path("phNumbers"), Value::List(vec![]), SetValueOptions::default()),
            Err(FormError::StructuralWrite(_))
        ));
        assert!(matches!(
            form.set_value(&path("age"), Value::text("old"), SetValueOptions::default()),
            Err(FormError::TypeMismatch { .. })
        ));
        assert!(matches!(
            form.set_value(&path("ghost"), Value::Null, SetValueOptions::default()),
            Err(FormError::UnknownField(_))
        ));
    }

    #[test]
    fn test_set_value_refuses_to_drop_registered_leaves() {
        let mut form = form();
        let writes = [
            Value::text("oops"),
            Value::object([("facebook", Value::text("bob"))]),
            Value::Null,
        ];
        for value in writes {
            assert_eq!(
                form.set_value(&path("social"), value, SetValueOptions::default())
                    .unwrap_err(),
                FormError::StructuralWrite(path("social"))
            );
        }
        assert_eq!(form.get_value(&path("social.twitter")), Value::text(""));
        assert_eq!(form.phase(), FormPhase::Clean);
    }

    #[tokio::test]
    async fn test_running_submit_owns_validation() {
        let (mut form, _calls) = form_with(ValidationMode::OnBlur);
        fill_valid(&mut form);
        let _ = form.input(&path("email"), "taken@example.com").unwrap();

        let pending = form.begin_submit();
        assert_eq!(form.begin_trigger(None).unwrap_err(), FormError::SubmitInProgress);
        assert_eq!(
            form.set_value(&path("username"), Value::text("x"), SetValueOptions::all())
                .unwrap_err(),
            FormError::SubmitInProgress
        );
        assert_eq!(
            form.input(&path("email"), "other@example.com").unwrap_err(),
            FormError::SubmitInProgress
        );
        assert!(form
            .append(&path("phNumbers"), Value::object([("number", Value::text(""))]))
            .is_err());
        assert_eq!(form.reset().unwrap_err(), FormError::SubmitInProgress);
        // Blur still records the touch but starts nothing
        assert!(form.blur(&path("email")).unwrap().is_none());
        assert!(form.meta(&path("email")).unwrap().touched);

        let outcomes = pending.run().await;
        let result = form.finish_submit(outcomes, |_| {}, |_| {});
        assert!(!result.is_valid());
        assert_eq!(
            form.error(&path("email")).map(ToString::to_string).as_deref(),
            Some("Email already exists")
        );
        assert!(!form.meta(&path("email")).unwrap().validating);
        assert_eq!(form.phase(), FormPhase::SubmitFailed);

        // Idle again once the submit is closed
        assert!(form.begin_trigger(None).is_ok());
    }

    #[test]
    fn test_get_many_in_request_order() {
        let mut form = form();
        fill_valid(&mut form);
        assert_eq!(
            form.get_many(&[path("email"), path("username"), path("missing")]),
            vec![Value::text("bob@example.com"), Value::text("bob"), Value::Null]
        );
    }

    #[test]
    fn test_remove_shifts_later_entries() {
        let mut form = form();
        let array = path("phNumbers");
        form.append(&array, Value::object([("number", Value::text("222"))]))
            .unwrap();
        form.append(&array, Value::object([("number", Value::text("333"))]))
            .unwrap();
        let _ = form.blur(&path("phNumbers.2.number")).unwrap();
        let ids: Vec<_> = form.entries(&array).unwrap().iter().map(|e| e.id).collect();

        form.remove(&array, ids[1]).unwrap();

        let entries = form.entries(&array).unwrap();
        assert_eq!(entries.iter().map(|e| e.id).collect::<Vec<_>>(), vec![ids[0], ids[2]]);
        assert_eq!(form.get_value(&path("phNumbers.1.number")), Value::text("333"));
        assert!(form.meta(&path("phNumbers.1.number")).unwrap().touched);
        assert!(!form.is_registered(&path("phNumbers.2.number")));
        assert!(form.meta(&path("phNumbers.2.number")).is_none());
    }

    #[test]
    fn test_removing_every_entry_leaves_empty_list() {
        let mut form = form();
        let array = path("phNumbers");
        let id = form.remove_at(&array, 0).unwrap();
        assert_eq!(form.get_value(&array), Value::List(vec![]));
        assert!(form.meta(&array).unwrap().dirty);
        assert!(matches!(
            form.remove(&array, id),
            Err(FormError::UnknownEntry { .. })
        ));
    }

    #[test]
    fn test_append_registers_entry_fields_and_notifies_once() {
        let mut form = form();
        let array = path("phNumbers");
        let events = Arc::new(AtomicUsize::new(0));
        let counter = events.clone();
        let _sub = form.subscribe(WatchFilter::Path(array.clone()), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        form.append(&array, Value::object([("number", Value::text(""))]))
            .unwrap();
        assert_eq!(events.load(Ordering::SeqCst), 1);
        assert!(form.is_registered(&path("phNumbers.1.number")));
        assert!(form.meta(&array).unwrap().dirty);

        assert!(matches!(
            form.append(&array, Value::object([("number", Value::Number(1.0))])),
            Err(FormError::TypeMismatch { .. })
        ));
        assert_eq!(form.entries(&array).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stale_job_of_shifted_entry_is_discarded() {
        let mut form = form();
        let array = path("phNumbers");
        form.append(&array, Value::object([("number", Value::text(""))]))
            .unwrap();
        form.register(
            &path("phNumbers.1.number"),
            FieldOptions::text().rules(Rules::new().validate_async(
                "lookup",
                Directory {
                    taken: "",
                    calls: Arc::new(AtomicUsize::new(0)),
                },
            )),
        )
        .unwrap();
        let job = form
            .begin_trigger(Some(&path("phNumbers.1.number")))
            .unwrap()
            .pop()
            .unwrap();
        form.remove_at(&array, 0).unwrap();
        assert!(!form.apply_outcome(job.run().await));
        assert_eq!(form.error(&path("phNumbers.0.number")), None);
    }

    #[test]
    fn test_watcher_scoping_and_unsubscribe() {
        let mut form = form();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = form.subscribe(WatchFilter::Path(path("social")), move |event| {
            sink.lock().unwrap().push(event.value.clone());
        });

        let _ = form.input(&path("username"), "bob").unwrap();
        let _ = form.input(&path("social.twitter"), "@bob").unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);

        sub.unsubscribe();
        let _ = form.input(&path("social.twitter"), "@alice").unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_trigger_subtree_and_whole_form() {
        let mut form = form();
        assert!(form.trigger(Some(&path("channel"))).await.unwrap());
        assert!(!form.trigger(None).await.unwrap());
        fill_valid(&mut form);
        assert!(form.trigger(None).await.unwrap());
        assert!(matches!(
            form.trigger(Some(&path("ghost"))).await,
            Err(FormError::UnknownField(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_submit_reports_every_invalid_field() {
        let mut form = FormController::new(FormOptions::default());
        form.register(
            &path("username"),
            FieldOptions::text().rules(Rules::new().required("Username is required")),
        )
        .unwrap();
        form.register(
            &path("age"),
            FieldOptions::number().rules(Rules::new().required("Age is required")),
        )
        .unwrap();
        assert_eq!(form.get_value(&path("age")), Value::Null);

        let valid_calls = Arc::new(AtomicUsize::new(0));
        let seen = valid_calls.clone();
        let result = form
            .submit(
                move |_| {
                    seen.fetch_add(1, Ordering::SeqCst);
                },
                |_| {},
            )
            .await;

        let SubmitResult::Invalid(errors) = result else {
            panic!("submit of an empty form must fail");
        };
        assert_eq!(
            errors.keys().cloned().collect::<Vec<_>>(),
            vec![path("age"), path("username")]
        );
        assert_eq!(valid_calls.load(Ordering::SeqCst), 0);
        let state = form.state();
        assert_eq!(state.submit_count, 1);
        assert!(state.is_submitted);
        assert!(!state.is_submit_successful);
        assert!(!state.is_submitting);
    }

    #[tokio::test]
    async fn test_reset_after_successful_submit_clears_every_meta() {
        let mut form = form();
        fill_valid(&mut form);
        let _ = form.blur(&path("username")).unwrap();
        let _ = form.blur(&path("email")).unwrap();
        let _ = form.input(&path("social.twitter"), "@bob").unwrap();
        assert!(form.submit(|_| {}, |_| {}).await.is_valid());
        assert_eq!(form.phase(), FormPhase::SubmitSuccessful);

        form.reset().unwrap();

        for field in form.kinds.keys() {
            assert_eq!(
                form.meta(field).cloned().unwrap_or_default(),
                FieldMeta::default(),
                "meta of `{field}` after reset"
            );
        }
        let snapshot = form.snapshot();
        assert!(snapshot.touched.is_empty());
        assert!(snapshot.dirty.is_empty());
        assert!(snapshot.errors.is_empty());
        assert_eq!(snapshot.phase, FormPhase::Clean);
        assert_eq!(snapshot.state.submit_count, 1);
    }

    #[tokio::test]
    async fn test_reset_restores_defaults_and_keeps_count() {
        let mut form = form();
        form.submit(|_| {}, |_| {}).await;
        fill_valid(&mut form);
        let array = path("phNumbers");
        form.append(&array, Value::object([("number", Value::text("1"))]))
            .unwrap();
        let old_ids: Vec<_> = form.entries(&array).unwrap().iter().map(|e| e.id).collect();

        form.reset().unwrap();

        assert_eq!(form.get_values(), &{
            let mut expected = defaults();
            expected.set(&path("social.facebook"), Value::text(""));
            expected.set(&path("age"), Value::Number(0.0));
            expected
        });
        let state = form.state();
        assert_eq!(state.submit_count, 1);
        assert!(!state.is_submitted && !state.is_dirty && state.is_valid);
        assert_eq!(form.phase(), FormPhase::Clean);
        let entries = form.entries(&array).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!old_ids.contains(&entries[0].id));
        assert!(!form.is_registered(&path("phNumbers.1.number")));
    }

    #[test]
    fn test_reset_to_new_defaults() {
        let mut form = form();
        form.reset_to(Value::object([
            ("username", Value::text("alice")),
            (
                "phNumbers",
                Value::List(vec![
                    Value::object([("number", Value::text("1"))]),
                    Value::object([("number", Value::text("2"))]),
                ]),
            ),
        ]))
        .unwrap();
        assert_eq!(form.get_value(&path("username")), Value::text("alice"));
        assert_eq!(form.get_value(&path("email")), Value::Null);
        assert!(!form.state().is_dirty);
        assert!(form.is_registered(&path("phNumbers.1.number")));

        assert!(matches!(
            form.reset_to(Value::object([("age", Value::text("old"))])),
            Err(FormError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_manual_errors() {
        let mut form = form();
        form.set_error(&path("channel"), "Channel is taken").unwrap();
        assert!(!form.state().is_valid);
        form.clear_errors(None);
        assert!(form.state().is_valid);
    }

    #[test]
    fn test_snapshot_reflects_meta() {
        let mut form = form();
        let _ = form.input(&path("username"), "bob").unwrap();
        let _ = form.blur(&path("email")).unwrap();
        let snapshot = form.snapshot();
        assert!(snapshot.dirty.contains(&path("username")));
        assert!(snapshot.touched.contains(&path("email")));
        assert!(snapshot.errors.is_empty());
        assert_eq!(snapshot.phase, FormPhase::Dirty);
    }
}
