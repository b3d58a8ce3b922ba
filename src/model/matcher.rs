//! Property predicates for selecting fields and groups
//!
//! A [`PropertiesMatch`] maps a property key to a [`Matcher`]. It answers two
//! questions about a node's properties:
//!
//! - `first_match`: does any entry match? (used to skip or keep columns)
//! - `matching_props`: which properties matched? (merged into every descendant
//!   during extraction, so one flag on a group reaches all of its fields)

use crate::model::Properties;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub type FirstMatchFn = Arc<dyn Fn(Option<&Value>, &Properties) -> bool + Send + Sync>;
pub type MatchingPropsFn = Arc<dyn Fn(Option<&Value>, &Properties) -> Properties + Send + Sync>;

/// How one property is matched
#[derive(Clone)]
pub enum Matcher {
    /// Deep equality; `Null` also matches an absent property
    Equals(Value),
    /// Custom predicate over the property value and the whole property map
    First(FirstMatchFn),
    /// Custom predicate returning the matching property subset; empty means no match
    Props(MatchingPropsFn),
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Equals(value) => f.debug_tuple("Equals").field(value).finish(),
            Matcher::First(_) => f.write_str("First(<fn>)"),
            Matcher::Props(_) => f.write_str("Props(<fn>)"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PropertiesMatch {
    entries: BTreeMap<String, Matcher>,
}

impl PropertiesMatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Equality matchers for every entry of `literals`
    pub fn from_literals(literals: &Properties) -> Self {
        let entries = literals
            .iter()
            .map(|(key, value)| (key.clone(), Matcher::Equals(value.clone())))
            .collect();
        PropertiesMatch { entries }
    }

    pub fn with(mut self, key: impl Into<String>, matcher: Matcher) -> Self {
        self.entries.insert(key.into(), matcher);
        self
    }

    pub fn with_equals(self, key: impl Into<String>, value: Value) -> Self {
        self.with(key, Matcher::Equals(value))
    }

    pub fn with_first<F>(self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(Option<&Value>, &Properties) -> bool + Send + Sync + 'static,
    {
        self.with(key, Matcher::First(Arc::new(f)))
    }

    pub fn with_props<F>(self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(Option<&Value>, &Properties) -> Properties + Send + Sync + 'static,
    {
        self.with(key, Matcher::Props(Arc::new(f)))
    }

    /// An empty match set is ignored by callers
    pub fn is_valid(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn first_match(&self, properties: &Properties) -> bool {
        self.entries.iter().any(|(key, matcher)| {
            let value = properties.get(key);
            match matcher {
                Matcher::Equals(expected) => value.unwrap_or(&Value::Null) == expected,
                Matcher::First(f) => f(value, properties),
                Matcher::Props(f) => !f(value, properties).is_empty(),
            }
        })
    }

    pub fn matching_props(&self, properties: &Properties) -> Properties {
        let mut matched = Properties::new();
        for (key, matcher) in &self.entries {
            let value = properties.get(key);
            match matcher {
                Matcher::Equals(expected) => {
                    if value.unwrap_or(&Value::Null) == expected {
                        matched.insert(key.clone(), value.cloned().unwrap_or(Value::Null));
                    }
                }
                Matcher::First(f) => {
                    if let Some(found) = value.filter(|_| f(value, properties)) {
                        matched.insert(key.clone(), found.clone());
                    }
                }
                Matcher::Props(f) => matched.extend(f(value, properties)),
            }
        }
        matched
    }
}
