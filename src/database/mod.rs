//! Metadata models that describe relational tables
//!
//! Fields carry `DatabaseTableCollectionUid`, `DatabaseJoinDepth`,
//! `DatabaseTableCollectionName` and `DatabaseFieldColumnName`. [`DatabaseColumns`]
//! selects the fields stored in one table, and [`FieldValue`] reads and writes a
//! record's values by column name.

use crate::error::{Error, Result};
use crate::model::{self, keys, JsonPathToValue, MetadataNode, Properties, PropertiesExt, PropertiesMatch, Visit};
use crate::object::ValueAccessor;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A field stored in a table column
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseField {
    pub path: String,
    pub properties: Arc<Properties>,
}

/// Fields of one table keyed by column name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnFieldsByName {
    pub read_order: Vec<String>,
    pub fields: HashMap<String, DatabaseField>,
}

impl ColumnFieldsByName {
    pub fn get(&self, column: &str) -> Option<&DatabaseField> {
        self.fields.get(column)
    }

    /// Fields in read order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DatabaseField)> {
        self.read_order
            .iter()
            .filter_map(|name| self.fields.get(name).map(|field| (name.as_str(), field)))
    }
}

/// Selects the fields of one table, by table uid or by join depth and table name
#[derive(Debug, Clone, Default)]
pub struct DatabaseColumns {
    table_uid: Option<String>,
    join_depth: Option<usize>,
    table_name: Option<String>,
    skip: PropertiesMatch,
    add: PropertiesMatch,
}

impl DatabaseColumns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table_uid(mut self, uid: impl Into<String>) -> Self {
        self.table_uid = Some(uid.into());
        self
    }

    pub fn with_join_depth(mut self, depth: usize) -> Self {
        self.join_depth = Some(depth);
        self
    }

    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Nodes matching `skip` are not selected; their children still are
    pub fn with_skip(mut self, skip: PropertiesMatch) -> Self {
        self.skip = skip;
        self
    }

    /// When valid, only nodes matching `add` are selected
    pub fn with_add(mut self, add: PropertiesMatch) -> Self {
        self.add = add;
        self
    }

    pub fn get(&self, model: &MetadataNode) -> Result<ColumnFieldsByName> {
        if self.table_uid.is_none() && (self.join_depth.is_none() || self.table_name.is_none()) {
            return Err(Error::ArgumentInvalid(
                "a table uid, or a join depth with a table name, is required".into(),
            ));
        }
        let root = model
            .as_group()
            .ok_or_else(|| Error::invalid_group(model.path(), "metadata model root is not a group"))?;

        let mut selected = ColumnFieldsByName::default();
        let mut failure = None;

        model::for_each(root, |_, node| {
            let properties = node.properties();
            if (self.skip.is_valid() && self.skip.first_match(properties))
                || (self.add.is_valid() && !self.add.first_match(properties))
            {
                return Visit::Continue;
            }
            if !self.in_table(properties) {
                return Visit::SkipChildren;
            }
            if node.is_group() {
                return Visit::Continue;
            }

            let Some(column) = properties
                .text(keys::DATABASE_FIELD_COLUMN_NAME)
                .filter(|name| !name.is_empty())
            else {
                failure = Some(Error::MissingColumnName(node.path().to_string()));
                return Visit::Stop;
            };
            if selected.fields.contains_key(column) {
                failure = Some(Error::DuplicateColumnIdentity(column.to_string()));
                return Visit::Stop;
            }

            selected.read_order.push(column.to_string());
            selected.fields.insert(
                column.to_string(),
                DatabaseField {
                    path: node.path().to_string(),
                    properties: Arc::clone(properties),
                },
            );
            Visit::Continue
        });

        if let Some(err) = failure {
            return Err(err);
        }
        tracing::debug!(columns = selected.read_order.len(), "database columns selected");
        Ok(selected)
    }

    fn in_table(&self, properties: &Properties) -> bool {
        if let Some(uid) = &self.table_uid {
            return properties.text(keys::DATABASE_TABLE_COLLECTION_UID) == Some(uid.as_str());
        }
        match (self.join_depth, &self.table_name) {
            (Some(depth), Some(name)) => {
                properties.count(keys::DATABASE_JOIN_DEPTH) == Some(depth)
                    && properties.text(keys::DATABASE_TABLE_COLLECTION_NAME) == Some(name.as_str())
            }
            _ => false,
        }
    }
}

/// Get, set and delete a record's values by column name
pub struct FieldValue<'a> {
    source: &'a mut Value,
    columns: &'a ColumnFieldsByName,
    resolver: JsonPathToValue,
}

impl<'a> FieldValue<'a> {
    /// An array `source` is a list of records; the first index then selects the record.
    pub fn new(source: &'a mut Value, columns: &'a ColumnFieldsByName) -> Self {
        let resolver = JsonPathToValue::new().with_source_is_array(source.is_array());
        FieldValue {
            source,
            columns,
            resolver,
        }
    }

    pub fn get(&self, column: &str, suffix: &str, indexes: &[usize]) -> Result<Vec<&Value>> {
        let path = self.path_to_value(column, suffix, indexes)?;
        self.source.get_at(&path)
    }

    /// Non-array values are stored as a one-element array
    pub fn set(&mut self, column: &str, value: Value, suffix: &str, indexes: &[usize]) -> Result<usize> {
        let path = self.path_to_value(column, suffix, indexes)?;
        let value = if value.is_array() { value } else { Value::Array(vec![value]) };
        self.source.set_at(&path, value)
    }

    pub fn delete(&mut self, column: &str, suffix: &str, indexes: &[usize]) -> Result<usize> {
        let path = self.path_to_value(column, suffix, indexes)?;
        self.source.delete_at(&path)
    }

    fn path_to_value(&self, column: &str, suffix: &str, indexes: &[usize]) -> Result<String> {
        if column.is_empty() {
            return Err(Error::ArgumentInvalid("column name is empty".into()));
        }
        let field = self
            .columns
            .get(column)
            .ok_or_else(|| Error::ColumnNotFound(column.to_string()))?;

        let path = match suffix {
            "" => field.path.clone(),
            _ if suffix.starts_with('[') => format!("{}{}", field.path, suffix),
            _ => format!("{}.{}", field.path, suffix),
        };
        self.resolver.resolve(&path, indexes)
    }
}
