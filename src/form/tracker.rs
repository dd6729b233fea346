//! InteractionTracker: per-field metadata and form-wide submission flags

use super::error::ValidationError;
use super::path::FieldPath;
use std::collections::BTreeMap;

/// Interaction and validation state of one registered path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMeta {
    pub touched: bool,
    pub dirty: bool,
    pub error: Option<ValidationError>,
    pub validating: bool,
}

/// Where the form is in its submit lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormPhase {
    #[default]
    Clean,
    Dirty,
    Submitting,
    SubmitSuccessful,
    SubmitFailed,
}

impl FormPhase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Clean => "Clean",
            Self::Dirty => "Dirty",
            Self::Submitting => "Submitting",
            Self::SubmitSuccessful => "Submitted",
            Self::SubmitFailed => "Submit failed",
        }
    }
}

/// Derived, form-wide flags handed to the rendering layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormAggregateState {
    pub is_dirty: bool,
    pub is_valid: bool,
    pub is_validating: bool,
    pub is_submitting: bool,
    pub is_submitted: bool,
    pub is_submit_successful: bool,
    pub submit_count: u32,
}

/// Tracks touched/dirty/error per path plus submission counters
#[derive(Debug, Default)]
pub struct InteractionTracker {
    metas: BTreeMap<FieldPath, FieldMeta>,
    is_submitting: bool,
    is_submitted: bool,
    is_submit_successful: bool,
    submit_count: u32,
    phase: FormPhase,
}

impl InteractionTracker {
    /// Create the meta record for `path` if it does not exist yet
    pub fn ensure(&mut self, path: &FieldPath) {
        self.metas.entry(path.clone()).or_default();
    }

    pub fn meta(&self, path: &FieldPath) -> Option<&FieldMeta> {
        self.metas.get(path)
    }

    pub fn meta_mut(&mut self, path: &FieldPath) -> Option<&mut FieldMeta> {
        self.metas.get_mut(path)
    }

    pub fn metas(&self) -> impl Iterator<Item = (&FieldPath, &FieldMeta)> {
        self.metas.iter()
    }

    pub fn is_registered(&self, path: &FieldPath) -> bool {
        self.metas.contains_key(path)
    }

    /// Touched is monotonic until `reset`
    pub fn mark_touched(&mut self, path: &FieldPath) {
        if let Some(meta) = self.metas.get_mut(path) {
            meta.touched = true;
        }
    }

    pub fn mark_dirty(&mut self, path: &FieldPath, is_dirty: bool) {
        if let Some(meta) = self.metas.get_mut(path) {
            meta.dirty = is_dirty;
        }
        self.refresh_phase();
    }

    pub fn set_error(&mut self, path: &FieldPath, error: Option<ValidationError>) {
        if let Some(meta) = self.metas.get_mut(path) {
            meta.error = error;
        }
    }

    pub fn set_validating(&mut self, path: &FieldPath, validating: bool) {
        if let Some(meta) = self.metas.get_mut(path) {
            meta.validating = validating;
        }
    }

    /// Drop the metas of `path` and everything beneath it
    pub fn discard_subtree(&mut self, path: &FieldPath) {
        self.metas.retain(|p, _| !path.is_prefix_of(p));
    }

    /// Re-key metas, e.g. after list entries shift down.
    ///
    /// `rename` returns the new path for a meta, or `None` to keep it.
    pub fn rekey(&mut self, rename: impl Fn(&FieldPath) -> Option<FieldPath>) {
        let metas = std::mem::take(&mut self.metas);
        self.metas = metas
            .into_iter()
            .map(|(path, meta)| (rename(&path).unwrap_or(path), meta))
            .collect();
    }

    pub fn begin_submit(&mut self) {
        self.is_submitting = true;
        self.phase = FormPhase::Submitting;
    }

    /// Close a submit attempt; the counter moves exactly once per attempt
    pub fn finish_submit(&mut self, success: bool) {
        self.is_submitting = false;
        self.is_submitted = true;
        self.is_submit_successful = success;
        self.submit_count += 1;
        self.phase = if success {
            FormPhase::SubmitSuccessful
        } else {
            FormPhase::SubmitFailed
        };
    }

    /// Re-derive the phase after an edit.
    ///
    /// Submitting is left alone; any finished state falls back to
    /// Dirty/Clean once the user edits again.
    fn refresh_phase(&mut self) {
        if self.phase == FormPhase::Submitting {
            return;
        }
        self.phase = if self.is_dirty() {
            FormPhase::Dirty
        } else {
            FormPhase::Clean
        };
    }

    /// Note an edit so a finished submit state moves back to Dirty/Clean
    pub fn note_edit(&mut self) {
        self.refresh_phase();
    }

    pub fn is_dirty(&self) -> bool {
        self.metas.values().any(|m| m.dirty)
    }

    pub fn is_valid(&self) -> bool {
        self.metas.values().all(|m| m.error.is_none())
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    pub fn submit_count(&self) -> u32 {
        self.submit_count
    }

    pub fn snapshot(&self) -> FormAggregateState {
        FormAggregateState {
            is_dirty: self.is_dirty(),
            is_valid: self.is_valid(),
            is_validating: self.metas.values().any(|m| m.validating),
            is_submitting: self.is_submitting,
            is_submitted: self.is_submitted,
            is_submit_successful: self.is_submit_successful,
            submit_count: self.submit_count,
        }
    }

    /// Clear every meta and the submitted flags; `submit_count` survives
    pub fn reset(&mut self) {
        for meta in self.metas.values_mut() {
            *meta = FieldMeta::default();
        }
        self.is_submitting = false;
        self.is_submitted = false;
        self.is_submit_successful = false;
        self.phase = FormPhase::Clean;
    }
}
