//! Field paths addressing locations inside the form value tree

use super::error::FormError;
use std::fmt;
use std::str::FromStr;

/// One step of a field path
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => f.write_str(key),
            Segment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Ordered sequence of segments, e.g. `social.twitter` or `phNumbers.0.number`
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// The empty path addresses the whole tree
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted path, panicking on malformed input.
    ///
    /// Intended for literals known at compile time; use `str::parse` for
    /// anything user-provided.
    pub fn of(path: &str) -> Self {
        match path.parse() {
            Ok(path) => path,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Extend with a property name
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.into()));
        Self { segments }
    }

    /// Extend with a list index
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }

    /// Concatenate a relative path onto this one
    pub fn join(&self, relative: &FieldPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(relative.segments.iter().cloned());
        Self { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    /// This path and every ancestor up to (and including) the root
    pub fn ancestors(&self) -> Vec<FieldPath> {
        (0..=self.segments.len())
            .rev()
            .map(|n| Self {
                segments: self.segments[..n].to_vec(),
            })
            .collect()
    }

    /// True when `self` equals `other` or lies above it in the tree
    pub fn is_prefix_of(&self, other: &FieldPath) -> bool {
        other.segments.len() >= self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// True when one path contains the other
    pub fn overlaps(&self, other: &FieldPath) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }

    /// Index of the entry of `array` this path lives under, if any
    pub fn entry_index_under(&self, array: &FieldPath) -> Option<usize> {
        if !array.is_prefix_of(self) || self.segments.len() == array.segments.len() {
            return None;
        }
        match self.segments[array.segments.len()] {
            Segment::Index(index) => Some(index),
            Segment::Key(_) => None,
        }
    }

    /// The part of this path below `prefix`
    pub fn strip_prefix(&self, prefix: &FieldPath) -> Option<FieldPath> {
        if !prefix.is_prefix_of(self) {
            return None;
        }
        Some(Self {
            segments: self.segments[prefix.segments.len()..].to_vec(),
        })
    }

    /// Copy of this path with the segment at `depth` replaced by `index`
    pub fn with_index_at(&self, depth: usize, index: usize) -> Self {
        let mut segments = self.segments.clone();
        if depth < segments.len() {
            segments[depth] = Segment::Index(index);
        }
        Self { segments }
    }
}

impl FromStr for FieldPath {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let segments = s
            .split('.')
            .map(|part| {
                if part.is_empty() {
                    Err(FormError::InvalidPath(s.to_string()))
                } else if part.bytes().all(|b| b.is_ascii_digit()) {
                    part.parse::<usize>()
                        .map(Segment::Index)
                        .map_err(|_| FormError::InvalidPath(s.to_string()))
                } else {
                    Ok(Segment::Key(part.to_string()))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}
