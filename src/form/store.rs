//! FieldPathStore: current values and captured defaults

use super::path::FieldPath;
use super::value::Value;

/// Holds the live value tree next to the defaults captured at registration
#[derive(Debug, Clone)]
pub struct FieldPathStore {
    values: Value,
    defaults: Value,
}

impl Default for FieldPathStore {
    fn default() -> Self {
        Self::new(Value::empty_object())
    }
}

impl FieldPathStore {
    /// Create a store whose values start out as `defaults`
    pub fn new(defaults: Value) -> Self {
        let defaults = if matches!(defaults, Value::Object(_)) {
            defaults
        } else {
            Value::empty_object()
        };
        Self {
            values: defaults.clone(),
            defaults,
        }
    }

    /// Current value, falling back to the captured default
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        self.values
            .get(path)
            .or_else(|| self.defaults.get(path))
    }

    /// Current value or `Null` when nothing is known about the path
    pub fn get_or_null(&self, path: &FieldPath) -> Value {
        self.get(path).cloned().unwrap_or_default()
    }

    pub fn has(&self, path: &FieldPath) -> bool {
        self.values.get(path).is_some()
    }

    /// Write a value, creating intermediate nodes as needed
    pub fn set(&mut self, path: &FieldPath, value: Value) {
        self.values.set(path, value);
    }

    /// Snapshot of the whole tree
    pub fn get_all(&self) -> &Value {
        &self.values
    }

    pub fn default_of(&self, path: &FieldPath) -> Option<&Value> {
        self.defaults.get(path)
    }

    /// Record `value` as the default for `path` unless one is already known,
    /// seeding the live tree when the path has no value yet
    pub fn capture_default(&mut self, path: &FieldPath, value: Value) {
        if self.defaults.get(path).is_none() {
            self.defaults.set(path, value.clone());
        }
        if self.values.get(path).is_none() {
            self.values.set(path, value);
        }
    }

    /// Dirty means the current value differs from the captured default.
    ///
    /// A path with no captured default is dirty as soon as it holds anything
    /// other than `Null`.
    pub fn is_dirty(&self, path: &FieldPath) -> bool {
        let current = self.values.get(path).unwrap_or(&Value::Null);
        let default = self.defaults.get(path).unwrap_or(&Value::Null);
        current != default
    }

    /// Delete a subtree; list siblings after it shift down
    pub fn remove(&mut self, path: &FieldPath) -> Option<Value> {
        self.values.remove(path)
    }

    /// Restore the live tree to the captured defaults
    pub fn reset(&mut self) {
        self.values = self.defaults.clone();
    }

    /// Replace the captured defaults and the live tree
    pub fn reset_to(&mut self, defaults: Value) {
        *self = Self::new(defaults);
    }
}
