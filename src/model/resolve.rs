//! Translate schema paths into value paths
//!
//! Metadata models address fields with schema paths like
//! `$.GroupFields[*].Profile.GroupFields[*].Name`. The values themselves live at
//! `$.Profile[0].Name` (or `$[3].Profile[0].Name` when the root is an array).

use crate::error::{Error, Result};
use crate::model::keys::ARRAY_PATH_PLACEHOLDER;
use once_cell::sync::Lazy;
use regex::Regex;

static ARRAY_PATH_PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\*]").unwrap());

static GROUP_FIELDS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.?GroupFields").unwrap());

/// Path resolver with the three switches of the conversion:
///
/// * `remove_group_fields` (default `true`): strip the `GroupFields` markers.
/// * `source_is_array` (default `false`): the value root is itself the array of
///   records, so the first `[*]` stays and indexes the root.
/// * `replace_placeholders` (default `true`): substitute `[*]` with concrete indexes,
///   defaulting every placeholder to `0` when no indexes are given.
#[derive(Debug, Clone, Copy)]
pub struct JsonPathToValue {
    remove_group_fields: bool,
    source_is_array: bool,
    replace_placeholders: bool,
}

impl Default for JsonPathToValue {
    fn default() -> Self {
        JsonPathToValue {
            remove_group_fields: true,
            source_is_array: false,
            replace_placeholders: true,
        }
    }
}

impl JsonPathToValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remove_group_fields(mut self, value: bool) -> Self {
        self.remove_group_fields = value;
        self
    }

    pub fn with_source_is_array(mut self, value: bool) -> Self {
        self.source_is_array = value;
        self
    }

    pub fn with_replace_placeholders(mut self, value: bool) -> Self {
        self.replace_placeholders = value;
        self
    }

    /// Resolve `path`, replacing `[*]` placeholders left to right with `indexes`.
    ///
    /// Replacement happens when enabled or when indexes are supplied. Any placeholder
    /// left over afterwards is an error.
    pub fn resolve(&self, path: &str, indexes: &[usize]) -> Result<String> {
        let placeholders = ARRAY_PATH_PLACEHOLDER_REGEX.find_iter(path).count();
        let mut resolved = path.to_string();

        if self.remove_group_fields {
            let first_entry = if self.source_is_array {
                ".GroupFields"
            } else {
                ".GroupFields[*]"
            };
            resolved = resolved.replacen(first_entry, "", 1);
            resolved = GROUP_FIELDS_REGEX.replace_all(&resolved, "").into_owned();
        }

        if self.replace_placeholders || !indexes.is_empty() {
            let defaults;
            let indexes = if indexes.is_empty() {
                defaults = vec![0; placeholders];
                &defaults[..]
            } else {
                indexes
            };

            for index in indexes {
                resolved = resolved.replacen(ARRAY_PATH_PLACEHOLDER, &format!("[{}]", index), 1);
            }

            if resolved.contains(ARRAY_PATH_PLACEHOLDER) {
                return Err(Error::PathPlaceholderRemaining {
                    path: resolved,
                    supplied: indexes.len(),
                });
            }
        }

        Ok(resolved)
    }
}
