//! Path-addressable access to `serde_json::Value` object graphs
//!
//! Flattening reads leaf values with concrete paths such as `$.Profile[0].Name`,
//! unflattening writes them back into a destination graph, creating missing
//! objects and arrays along the way.
//!
//! ## Lenient indexing
//!
//! Reading index `[0]` of a value that is not an array yields the value itself.
//! A group that holds a single object instead of a one-element array can then be
//! addressed with the same resolved paths.

pub mod path;

pub use path::{JsonPath, Segment};

use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// Get/set/delete values by path and iterate the matches of a path pattern.
///
/// Read paths may contain `[*]`; write paths are expected to be concrete, although
/// a wildcard on `set_at`/`delete_at` applies to every existing match.
pub trait ValueAccessor {
    /// All values matching `path`
    fn get_at(&self, path: &str) -> Result<Vec<&Value>>;

    /// Insert or replace the value at `path`, returning the number of modified locations
    fn set_at(&mut self, path: &str, value: Value) -> Result<usize>;

    /// Remove the value(s) at `path`, returning the number removed
    fn delete_at(&mut self, path: &str) -> Result<usize>;

    /// Visit each match of `pattern` with its concrete path; the visitor returns `true` to stop
    fn for_each_at(&self, pattern: &str, visit: &mut dyn FnMut(&JsonPath, &Value) -> bool) -> Result<()>;

    /// The first value matching `path`, if any
    fn first_at(&self, path: &str) -> Result<Option<&Value>> {
        Ok(self.get_at(path)?.into_iter().next())
    }
}

impl ValueAccessor for Value {
    fn get_at(&self, path: &str) -> Result<Vec<&Value>> {
        let parsed = JsonPath::parse(path)?;
        let mut found = Vec::new();
        collect(self, parsed.segments(), &mut found);
        Ok(found)
    }

    fn set_at(&mut self, path: &str, value: Value) -> Result<usize> {
        let parsed = JsonPath::parse(path)?;
        write_value(self, parsed.segments(), &value, path)
    }

    fn delete_at(&mut self, path: &str) -> Result<usize> {
        let parsed = JsonPath::parse(path)?;
        match parsed.segments().split_last() {
            // Deleting the root resets it
            None => {
                let removed = usize::from(!self.is_null());
                *self = Value::Null;
                Ok(removed)
            }
            Some((last, parents)) => Ok(remove_value(self, parents, last)),
        }
    }

    fn for_each_at(&self, pattern: &str, visit: &mut dyn FnMut(&JsonPath, &Value) -> bool) -> Result<()> {
        let parsed = JsonPath::parse(pattern)?;
        walk(self, parsed.segments(), &mut JsonPath::root(), visit);
        Ok(())
    }
}

fn collect<'a>(value: &'a Value, segments: &[Segment], found: &mut Vec<&'a Value>) {
    let Some((segment, rest)) = segments.split_first() else {
        found.push(value);
        return;
    };

    match (segment, value) {
        (Segment::Key(key), Value::Object(map)) => {
            if let Some(child) = map.get(key) {
                collect(child, rest, found);
            }
        }
        (Segment::Index(index), Value::Array(items)) => {
            if let Some(child) = items.get(*index) {
                collect(child, rest, found);
            }
        }
        (Segment::Index(0), other) if !other.is_null() => collect(other, rest, found),
        (Segment::Wildcard, Value::Array(items)) => {
            for child in items {
                collect(child, rest, found);
            }
        }
        (Segment::Wildcard, Value::Object(map)) => {
            for child in map.values() {
                collect(child, rest, found);
            }
        }
        _ => {}
    }
}

/// Returns `true` once the visitor asked to stop
fn walk(
    value: &Value,
    segments: &[Segment],
    current: &mut JsonPath,
    visit: &mut dyn FnMut(&JsonPath, &Value) -> bool,
) -> bool {
    let Some((segment, rest)) = segments.split_first() else {
        return visit(current, value);
    };

    match (segment, value) {
        (Segment::Key(key), Value::Object(map)) => match map.get(key) {
            Some(child) => walk(child, rest, &mut current.child(segment.clone()), visit),
            None => false,
        },
        (Segment::Index(index), Value::Array(items)) => match items.get(*index) {
            Some(child) => walk(child, rest, &mut current.child(segment.clone()), visit),
            None => false,
        },
        (Segment::Index(0), other) if !other.is_null() => {
            walk(other, rest, &mut current.child(Segment::Index(0)), visit)
        }
        (Segment::Wildcard, Value::Array(items)) => {
            for (index, child) in items.iter().enumerate() {
                if walk(child, rest, &mut current.child(Segment::Index(index)), visit) {
                    return true;
                }
            }
            false
        }
        (Segment::Wildcard, Value::Object(map)) => {
            for (key, child) in map {
                if walk(child, rest, &mut current.child(Segment::Key(key.clone())), visit) {
                    return true;
                }
            }
            false
        }
        _ => false,
    }
}

fn write_value(target: &mut Value, segments: &[Segment], value: &Value, path: &str) -> Result<usize> {
    let Some((segment, rest)) = segments.split_first() else {
        *target = value.clone();
        return Ok(1);
    };

    match segment {
        Segment::Key(key) => {
            if target.is_null() {
                *target = Value::Object(Map::new());
            }
            let Value::Object(map) = target else {
                return Err(Error::ArgumentInvalid(format!(
                    "cannot set key '{}' on a non-object value in '{}'",
                    key, path
                )));
            };
            let child = map.entry(key.clone()).or_insert(Value::Null);
            write_value(child, rest, value, path)
        }
        Segment::Index(index) => {
            if target.is_null() {
                *target = Value::Array(Vec::new());
            }
            let Value::Array(items) = target else {
                return Err(Error::ArgumentInvalid(format!(
                    "cannot set index {} on a non-array value in '{}'",
                    index, path
                )));
            };
            if items.len() <= *index {
                items.resize(index + 1, Value::Null);
            }
            write_value(&mut items[*index], rest, value, path)
        }
        Segment::Wildcard => {
            let mut modified = 0;
            match target {
                Value::Array(items) => {
                    for child in items.iter_mut() {
                        modified += write_value(child, rest, value, path)?;
                    }
                }
                Value::Object(map) => {
                    for child in map.values_mut() {
                        modified += write_value(child, rest, value, path)?;
                    }
                }
                _ => {}
            }
            Ok(modified)
        }
    }
}

fn remove_value(target: &mut Value, parents: &[Segment], last: &Segment) -> usize {
    if let Some((segment, rest)) = parents.split_first() {
        return match (segment, target) {
            (Segment::Key(key), Value::Object(map)) => match map.get_mut(key) {
                Some(child) => remove_value(child, rest, last),
                None => 0,
            },
            (Segment::Index(index), Value::Array(items)) => match items.get_mut(*index) {
                Some(child) => remove_value(child, rest, last),
                None => 0,
            },
            (Segment::Wildcard, Value::Array(items)) => {
                items.iter_mut().map(|child| remove_value(child, rest, last)).sum()
            }
            (Segment::Wildcard, Value::Object(map)) => {
                map.values_mut().map(|child| remove_value(child, rest, last)).sum()
            }
            _ => 0,
        };
    }

    match (last, target) {
        (Segment::Key(key), Value::Object(map)) => usize::from(map.remove(key).is_some()),
        (Segment::Index(index), Value::Array(items)) if *index < items.len() => {
            items.remove(*index);
            1
        }
        (Segment::Wildcard, Value::Array(items)) => std::mem::take(items).len(),
        (Segment::Wildcard, Value::Object(map)) => std::mem::take(map).len(),
        _ => 0,
    }
}
