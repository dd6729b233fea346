//! FieldArrayController: stable identities for dynamically sized lists

use super::controller::FieldOptions;
use super::error::FormError;
use super::path::FieldPath;
use super::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Identity of a list entry, independent of its position
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StableId(Uuid);

impl StableId {
    fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough to tell entries apart on screen
        write!(f, "{}", &self.0.simple().to_string()[..8])
    }
}

/// One entry of a field array as seen by the rendering layer
#[derive(Debug, Clone, PartialEq)]
pub struct FieldArrayEntry {
    pub id: StableId,
    pub index: usize,
    pub value: Value,
}

/// Fields registered for every entry of an array, relative to the entry
#[derive(Debug, Clone, Default)]
pub struct FieldArrayOptions {
    pub entry_fields: Vec<(FieldPath, FieldOptions)>,
}

impl FieldArrayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, relative: FieldPath, options: FieldOptions) -> Self {
        self.entry_fields.push((relative, options));
        self
    }
}

#[derive(Debug)]
struct ArrayState {
    ids: Vec<StableId>,
    options: FieldArrayOptions,
}

/// Keeps the ordered stable ids of every registered array.
///
/// The value subtree itself lives in the store; this only tracks identity
/// so that positions can shift without observers losing track of entries.
#[derive(Debug, Default)]
pub struct FieldArrayController {
    arrays: BTreeMap<FieldPath, ArrayState>,
}

impl FieldArrayController {
    /// Register `path` as an array with `len` existing entries
    pub fn register(&mut self, path: &FieldPath, len: usize, options: FieldArrayOptions) {
        let ids = (0..len).map(|_| StableId::fresh()).collect();
        self.arrays.insert(path.clone(), ArrayState { ids, options });
    }

    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.arrays.keys()
    }

    pub fn ids(&self, path: &FieldPath) -> Result<&[StableId], FormError> {
        self.state(path).map(|state| state.ids.as_slice())
    }

    pub fn options(&self, path: &FieldPath) -> Result<&FieldArrayOptions, FormError> {
        self.state(path).map(|state| &state.options)
    }

    pub fn index_of(&self, path: &FieldPath, id: StableId) -> Result<usize, FormError> {
        self.state(path)?
            .ids
            .iter()
            .position(|existing| *existing == id)
            .ok_or_else(|| FormError::UnknownEntry {
                array: path.clone(),
                id,
            })
    }

    /// Allocate an id for a new last entry
    pub fn push(&mut self, path: &FieldPath) -> Result<StableId, FormError> {
        let state = self.state_mut(path)?;
        let id = StableId::fresh();
        state.ids.push(id);
        Ok(id)
    }

    /// Drop the entry with `id`, returning the index it occupied
    pub fn take(&mut self, path: &FieldPath, id: StableId) -> Result<usize, FormError> {
        let index = self.index_of(path, id)?;
        self.state_mut(path)?.ids.remove(index);
        Ok(index)
    }

    /// Drop the entry at `index`, returning its id
    pub fn take_at(&mut self, path: &FieldPath, index: usize) -> Result<StableId, FormError> {
        let state = self.state_mut(path)?;
        if index >= state.ids.len() {
            return Err(FormError::IndexOutOfRange {
                array: path.clone(),
                index,
            });
        }
        Ok(state.ids.remove(index))
    }

    /// Issue fresh ids for `len` entries, as after a reset
    pub fn reset(&mut self, path: &FieldPath, len: usize) {
        if let Some(state) = self.arrays.get_mut(path) {
            state.ids = (0..len).map(|_| StableId::fresh()).collect();
        }
    }

    fn state(&self, path: &FieldPath) -> Result<&ArrayState, FormError> {
        self.arrays
            .get(path)
            .ok_or_else(|| FormError::NotAnArray(path.clone()))
    }

    fn state_mut(&mut self, path: &FieldPath) -> Result<&mut ArrayState, FormError> {
        self.arrays
            .get_mut(path)
            .ok_or_else(|| FormError::NotAnArray(path.clone()))
    }
}
