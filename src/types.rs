use crate::model::{Properties, PropertiesMatch};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One table cell. Flattened cells are always arrays; absent values are `[]`.
pub type Cell = Value;

pub type FlattenedRow = Vec<Cell>;

pub type FlattenedTable = Vec<FlattenedRow>;

/// Configuration for flattening and unflattening
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Separator between primary-key values in an unflatten signature
    pub join_symbol: char,

    /// Apply `FieldColumnPosition` directives after extraction
    pub reposition: bool,

    /// Columns whose properties match any of these are left out of the written table
    pub skip: Properties,

    /// When non-empty, only columns matching one of these are written
    pub add: Properties,

    /// Properties of a group matching these are inherited by every column below it
    pub nested_skip: Properties,

    /// Same as `nested_skip`, for the add matcher
    pub nested_add: Properties,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            join_symbol: '|',
            reposition: true,
            skip: Properties::new(),
            add: Properties::new(),
            nested_skip: Properties::new(),
            nested_add: Properties::new(),
        }
    }
}

impl TableConfig {
    pub fn skip_match(&self) -> PropertiesMatch {
        PropertiesMatch::from_literals(&self.skip)
    }

    pub fn add_match(&self) -> PropertiesMatch {
        PropertiesMatch::from_literals(&self.add)
    }

    pub fn nested_skip_match(&self) -> PropertiesMatch {
        PropertiesMatch::from_literals(&self.nested_skip)
    }

    pub fn nested_add_match(&self) -> PropertiesMatch {
        PropertiesMatch::from_literals(&self.nested_add)
    }
}
