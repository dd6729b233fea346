//! A mounted demo form: controller, focus and raw edit buffers

use crate::form::{
    FieldKind, FieldPath, FormController, FormError, StableId, Subscription, ValidationJob, Value,
    WatchFilter,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// One labelled input
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRow {
    pub path: FieldPath,
    pub label: String,
    pub kind: FieldKind,
    pub masked: bool,
}

impl FieldRow {
    pub fn new(path: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            path: FieldPath::of(path),
            label: label.to_string(),
            kind,
            masked: false,
        }
    }

    pub fn text(path: &str, label: &str) -> Self {
        Self::new(path, label, FieldKind::Text)
    }

    /// Render the value as bullets
    pub fn masked(mut self) -> Self {
        self.masked = true;
        self
    }
}

/// Repeated rows backed by a field array
#[derive(Debug, Clone)]
pub struct ArraySection {
    pub path: FieldPath,
    pub label: &'static str,
    /// Field inside each entry that gets a row
    pub entry_field: FieldPath,
    /// Value appended by "add"
    pub template: Value,
    /// Entries below this index cannot be removed
    pub keep: usize,
}

/// Position of a row inside a field array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRef {
    pub id: StableId,
    pub index: usize,
    pub removable: bool,
}

/// A row as laid out on screen
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub field: FieldRow,
    pub entry: Option<EntryRef>,
}

/// Edit applied to the focused input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    Insert(char),
    Backspace,
    Clear,
}

pub struct DemoForm {
    title: &'static str,
    controller: FormController,
    head: Vec<FieldRow>,
    array: Option<ArraySection>,
    tail: Vec<FieldRow>,
    /// `(dependent, source)`: dependent is disabled while source is empty
    gates: Vec<(FieldPath, FieldPath)>,
    focus: usize,
    /// Raw text typed into each input, kept so half-typed numbers survive
    buffers: BTreeMap<FieldPath, String>,
    last_change: Arc<Mutex<Option<String>>>,
    _watch: Subscription,
}

impl DemoForm {
    pub fn new(title: &'static str, mut controller: FormController) -> Self {
        let last_change = Arc::new(Mutex::new(None));
        let sink = last_change.clone();
        let watch = controller.subscribe(WatchFilter::All, move |event| {
            let changed = event
                .changed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            tracing::debug!(
                "Values after change to {changed}: {}",
                serde_json::to_string(event.value).unwrap_or_default()
            );
            if let Ok(mut slot) = sink.lock() {
                *slot = Some(changed);
            }
        });

        Self {
            title,
            controller,
            head: Vec::new(),
            array: None,
            tail: Vec::new(),
            gates: Vec::new(),
            focus: 0,
            buffers: BTreeMap::new(),
            last_change,
            _watch: watch,
        }
    }

    /// Append rows after whatever is already laid out
    pub fn with_rows(mut self, rows: impl IntoIterator<Item = FieldRow>) -> Self {
        if self.array.is_some() {
            self.tail.extend(rows);
        } else {
            self.head.extend(rows);
        }
        self
    }

    pub fn with_array(mut self, section: ArraySection) -> Self {
        self.array = Some(section);
        self
    }

    /// Keep `dependent` disabled while `source` is empty
    pub fn with_gate(mut self, dependent: &str, source: &str) -> Result<Self, FormError> {
        self.gates
            .push((FieldPath::of(dependent), FieldPath::of(source)));
        self.refresh_gates()?;
        Ok(self)
    }

    pub fn title(&self) -> &'static str {
        self.title
    }

    pub fn controller(&self) -> &FormController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut FormController {
        &mut self.controller
    }

    pub fn array(&self) -> Option<&ArraySection> {
        self.array.as_ref()
    }

    /// Every row in display order
    pub fn rows(&self) -> Vec<Row> {
        let plain = |field: &FieldRow| Row {
            field: field.clone(),
            entry: None,
        };
        let mut rows: Vec<Row> = self.head.iter().map(plain).collect();
        if let Some(section) = &self.array {
            let entries = self.controller.entries(&section.path).unwrap_or_default();
            rows.extend(entries.into_iter().map(|entry| Row {
                field: FieldRow::text(
                    &section.path.index(entry.index).join(&section.entry_field).to_string(),
                    &format!("{} {}", section.label, entry.index + 1),
                ),
                entry: Some(EntryRef {
                    id: entry.id,
                    index: entry.index,
                    removable: entry.index >= section.keep,
                }),
            }));
        }
        rows.extend(self.tail.iter().map(plain));
        rows
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn focused(&self) -> Option<Row> {
        self.rows().into_iter().nth(self.focus)
    }

    /// Move focus to the next enabled row, returning the path that lost focus
    pub fn move_focus(&mut self, forward: bool) -> Option<FieldPath> {
        let rows = self.rows();
        if rows.is_empty() {
            return None;
        }
        let left = rows.get(self.focus).map(|row| row.field.path.clone());
        let len = rows.len();
        let mut next = self.focus.min(len - 1);
        for _ in 0..len {
            next = if forward {
                (next + 1) % len
            } else {
                (next + len - 1) % len
            };
            if !self.controller.is_disabled(&rows[next].field.path) {
                break;
            }
        }
        self.focus = next;
        left
    }

    /// Text shown in an input
    pub fn display_value(&self, row: &FieldRow) -> String {
        let raw = self.raw_value(&row.path);
        if row.masked {
            "•".repeat(raw.chars().count())
        } else {
            raw
        }
    }

    fn raw_value(&self, path: &FieldPath) -> String {
        self.buffers
            .get(path)
            .cloned()
            .unwrap_or_else(|| self.controller.get_value(path).to_display_string())
    }

    /// Apply an edit to the focused input and feed it to the controller
    pub fn edit(&mut self, edit: Edit) -> Result<Option<ValidationJob>, FormError> {
        let Some(row) = self.focused() else {
            return Ok(None);
        };
        let path = row.field.path;
        if self.controller.is_disabled(&path) {
            return Ok(None);
        }

        let mut raw = self.raw_value(&path);
        match edit {
            Edit::Insert(c) => raw.push(c),
            Edit::Backspace => {
                raw.pop();
            }
            Edit::Clear => raw.clear(),
        }
        let job = self.controller.input(&path, &raw)?;
        self.buffers.insert(path, raw);
        self.refresh_gates()?;
        Ok(job)
    }

    pub fn blur_focused(&mut self) -> Result<Option<ValidationJob>, FormError> {
        match self.focused() {
            Some(row) => self.controller.blur(&row.field.path),
            None => Ok(None),
        }
    }

    /// Re-derive disabled fields from their gates
    pub fn refresh_gates(&mut self) -> Result<(), FormError> {
        for (dependent, source) in &self.gates {
            let disabled = self.controller.get_value(source).is_empty();
            self.controller.set_disabled(dependent, disabled)?;
        }
        Ok(())
    }

    /// Drop raw buffers so inputs show the stored values again
    pub fn forget_buffers(&mut self) {
        self.buffers.clear();
    }

    /// Add an entry to the array section
    pub fn append_entry(&mut self) -> Result<Option<StableId>, FormError> {
        let Some(section) = self.array.clone() else {
            return Ok(None);
        };
        self.controller
            .append(&section.path, section.template)
            .map(Some)
    }

    /// Remove the focused array entry, if it may be removed
    pub fn remove_focused_entry(&mut self) -> Result<Option<StableId>, FormError> {
        let (Some(section), Some(row)) = (self.array.clone(), self.focused()) else {
            return Ok(None);
        };
        let Some(entry) = row.entry.filter(|entry| entry.removable) else {
            return Ok(None);
        };
        self.controller.remove(&section.path, entry.id)?;
        self.forget_buffers();
        self.focus = self.focus.min(self.rows().len().saturating_sub(1));
        Ok(Some(entry.id))
    }

    /// Paths written by the most recent change
    pub fn last_change(&self) -> Option<String> {
        self.last_change.lock().ok().and_then(|slot| slot.clone())
    }

    /// Submitting needs at least one change and no submit in flight
    pub fn can_submit(&self) -> bool {
        let state = self.controller.state();
        state.is_dirty && !state.is_submitting
    }
}

impl std::fmt::Debug for DemoForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemoForm")
            .field("title", &self.title)
            .field("focus", &self.focus)
            .finish_non_exhaustive()
    }
}
