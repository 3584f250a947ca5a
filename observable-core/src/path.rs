//! Paths into structured values.
//!
//! A path is a dot separated list of segments (`"a.b.0"`). The empty path
//! addresses the whole value. Paths are related by whole-segment prefixes:
//! `"a"` is a prefix of `"a.b"` but not of `"ab"`.

use serde_json::{Map, Value};
use smallvec::SmallVec;

use crate::error::{ObservableError, Result};

/// Separator between path segments.
pub const SEPARATOR: char = '.';

/// How a bound path relates to a changed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ancestry {
    /// The bound path is the changed path or lies below it.
    Child,
    /// The bound path lies strictly above the changed path.
    Ancestor,
    /// The paths address disjoint parts of the value.
    Unrelated,
}

/// Whether `prefix` addresses `path` itself or one of its ancestors.
pub fn is_prefix(prefix: &str, path: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
        None => false,
    }
}

/// Classify `bound` against `changed`.
///
/// `Child` wins when both are prefixes of each other, i.e. the paths are equal.
pub fn classify(bound: &str, changed: &str) -> Ancestry {
    if is_prefix(changed, bound) {
        Ancestry::Child
    } else if is_prefix(bound, changed) {
        Ancestry::Ancestor
    } else {
        Ancestry::Unrelated
    }
}

/// Join two paths, dropping empty sides.
pub fn join(base: &str, sub: &str) -> String {
    match (base.is_empty(), sub.is_empty()) {
        (true, _) => sub.to_owned(),
        (_, true) => base.to_owned(),
        _ => format!("{base}{SEPARATOR}{sub}"),
    }
}

/// The part of `changed` below `bound`.
///
/// Returns `changed` unchanged when `bound` is not one of its prefixes.
pub fn relative<'a>(bound: &str, changed: &'a str) -> &'a str {
    if bound.is_empty() {
        return changed;
    }
    changed
        .strip_prefix(bound)
        .and_then(|rest| rest.strip_prefix(SEPARATOR))
        .unwrap_or(changed)
}

fn segments(path: &str) -> SmallVec<[&str; 8]> {
    if path.is_empty() {
        SmallVec::new()
    } else {
        path.split(SEPARATOR).collect()
    }
}

/// Structured values that can be read and written by path.
///
/// Fields have the same type as the whole value, so a view of a sub-path can
/// itself be addressed by path.
pub trait PathValue: Clone + Default + PartialEq + Send + Sync + 'static {
    /// Null-safe lookup. A missing segment anywhere yields `None`.
    fn path_get(&self, path: &str) -> Option<Self>;

    /// Write `value` at `path` in place. Returns whether the stored value
    /// changed.
    fn path_set(&mut self, path: &str, value: Self) -> Result<bool>;
}

impl PathValue for Value {
    fn path_get(&self, path: &str) -> Option<Self> {
        let mut current = self;
        for segment in segments(path) {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }

    fn path_set(&mut self, path: &str, value: Self) -> Result<bool> {
        let segments = segments(path);
        let Some((last, parents)) = segments.split_last() else {
            let changed = *self != value;
            *self = value;
            return Ok(changed);
        };

        let mut current = self;
        for segment in parents {
            current = descend(current, path, segment)?;
        }

        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        match current {
            Value::Object(map) => match map.get_mut(*last) {
                Some(slot) if *slot == value => Ok(false),
                Some(slot) => {
                    *slot = value;
                    Ok(true)
                }
                None => {
                    map.insert((*last).to_owned(), value);
                    Ok(true)
                }
            },
            Value::Array(items) => {
                let index = parse_index(path, last, items.len())?;
                if index == items.len() {
                    items.push(value);
                    return Ok(true);
                }
                if items[index] == value {
                    return Ok(false);
                }
                items[index] = value;
                Ok(true)
            }
            _ => Err(not_a_container(path, last)),
        }
    }
}

/// Step into `segment`, creating an empty object for missing keys and nulls.
fn descend<'v>(current: &'v mut Value, path: &str, segment: &str) -> Result<&'v mut Value> {
    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => Ok(map
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()))),
        Value::Array(items) => {
            let index = parse_index(path, segment, items.len())?;
            if index == items.len() {
                items.push(Value::Object(Map::new()));
            }
            Ok(&mut items[index])
        }
        _ => Err(not_a_container(path, segment)),
    }
}

fn parse_index(path: &str, segment: &str, len: usize) -> Result<usize> {
    match segment.parse::<usize>() {
        Ok(index) if index <= len => Ok(index),
        _ => Err(ObservableError::InvalidIndex {
            path: path.to_owned(),
            segment: segment.to_owned(),
        }),
    }
}

fn not_a_container(path: &str, segment: &str) -> ObservableError {
    ObservableError::NotAContainer {
        path: path.to_owned(),
        segment: segment.to_owned(),
    }
}
