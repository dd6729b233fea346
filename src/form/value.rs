//! Form value tree and field kinds

use super::path::{FieldPath, Segment};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Date format accepted from raw input and used for display
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A node of the form value tree.
///
/// Leaves are text, numbers, booleans and dates; internal nodes are objects
/// and ordered lists. `Null` stands for "not set".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Date(NaiveDate),
    Text(String),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn empty_object() -> Self {
        Value::Object(BTreeMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the value counts as missing for a `required` rule.
    ///
    /// Zero is a legitimate number and never empty; an unchecked box is.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            Value::Bool(b) => !b,
            Value::List(items) => items.is_empty(),
            Value::Number(_) | Value::Date(_) | Value::Object(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// String representation used by pattern rules and input buffers
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Text(s) => s.clone(),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
            Value::List(_) | Value::Object(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }

    /// Read the node at `path`
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        let mut node = self;
        for segment in path.segments() {
            node = match (node, segment) {
                (Value::Object(map), Segment::Key(key)) => map.get(key)?,
                (Value::List(items), Segment::Index(index)) => items.get(*index)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Write `value` at `path`, creating intermediate objects and lists.
    ///
    /// A key segment turns a non-object node into an object; an index
    /// segment turns a non-list node into a list padded with `Null`.
    pub fn set(&mut self, path: &FieldPath, value: Value) {
        let mut node = self;
        for segment in path.segments() {
            node = match segment {
                Segment::Key(key) => {
                    if !matches!(node, Value::Object(_)) {
                        *node = Value::empty_object();
                    }
                    let Value::Object(map) = node else {
                        return;
                    };
                    map.entry(key.clone()).or_default()
                }
                Segment::Index(index) => {
                    if !matches!(node, Value::List(_)) {
                        *node = Value::List(Vec::new());
                    }
                    let Value::List(items) = node else {
                        return;
                    };
                    if items.len() <= *index {
                        items.resize(*index + 1, Value::Null);
                    }
                    &mut items[*index]
                }
            };
        }
        *node = value;
    }

    /// Remove the node at `path`; list elements after it shift down by one
    pub fn remove(&mut self, path: &FieldPath) -> Option<Value> {
        let parent_path = path.parent()?;
        let last = path.segments().last()?;
        let parent = self.get_mut(&parent_path)?;
        match (parent, last) {
            (Value::Object(map), Segment::Key(key)) => map.remove(key),
            (Value::List(items), Segment::Index(index)) if *index < items.len() => {
                Some(items.remove(*index))
            }
            _ => None,
        }
    }

    fn get_mut(&mut self, path: &FieldPath) -> Option<&mut Value> {
        let mut node = self;
        for segment in path.segments() {
            node = match (node, segment) {
                (Value::Object(map), Segment::Key(key)) => map.get_mut(key)?,
                (Value::List(items), Segment::Index(index)) => items.get_mut(*index)?,
                _ => return None,
            };
        }
        Some(node)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

/// Leaf type a registered field accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Bool,
    Date,
}

impl FieldKind {
    /// Whether `value` may be stored in a field of this kind
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (FieldKind::Text, Value::Text(_))
                | (FieldKind::Number, Value::Number(_))
                | (FieldKind::Bool, Value::Bool(_))
                | (FieldKind::Date, Value::Date(_))
        )
    }

    /// Convert raw widget input into a typed value.
    ///
    /// Unparseable numbers and dates become `Null` so that a `required`
    /// rule reports them.
    pub fn parse_raw(&self, raw: &str) -> Value {
        match self {
            FieldKind::Text => Value::Text(raw.to_string()),
            FieldKind::Number => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "on" | "1" | "yes" => Value::Bool(true),
                "false" | "off" | "0" | "no" => Value::Bool(false),
                _ => Value::Null,
            },
            FieldKind::Date => NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                .map(Value::Date)
                .unwrap_or(Value::Null),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Bool => "bool",
            FieldKind::Date => "date",
        }
    }
}

/// Kind name of a value, for error messages
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::Date(_) => "date",
        Value::Text(_) => "text",
        Value::List(_) => "list",
        Value::Object(_) => "object",
    }
}
