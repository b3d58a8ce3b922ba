//! Metadata models: the declarative tree describing fields and groups
//!
//! A metadata model arrives as JSON. Each node carries a schema path
//! (`FieldGroupJsonPathKey`) and free-form properties; a group additionally carries
//! `GroupReadOrderOfFields` and `GroupFields`, a one-element array holding the map of
//! child suffix to child node:
//!
//! ```json
//! {
//!   "FieldGroupJsonPathKey": "$",
//!   "FieldGroupName": "User",
//!   "GroupFields": [{
//!     "ID": {"FieldGroupJsonPathKey": "$.GroupFields[*].ID", "FieldGroupIsPrimaryKey": true}
//!   }],
//!   "GroupReadOrderOfFields": ["ID"]
//! }
//! ```
//!
//! [`MetadataNode::from_value`] parses this shape into a [`MetadataNode`] tree once;
//! everything downstream matches on the tagged union instead of re-inspecting JSON.

pub mod iter;
pub mod keys;
pub mod matcher;
pub mod resolve;

pub use iter::{filter, for_each, map, Visit};
pub use matcher::{Matcher, PropertiesMatch};
pub use resolve::JsonPathToValue;

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Free-form properties of a field or group
pub type Properties = Map<String, Value>;

/// Typed reads over a property map
pub trait PropertiesExt {
    /// `true` only for a boolean `true`
    fn flag(&self, key: &str) -> bool;
    fn text(&self, key: &str) -> Option<&str>;
    /// Non-negative whole number, accepting both integer and float encodings
    fn count(&self, key: &str) -> Option<usize>;
}

impl PropertiesExt for Properties {
    fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn count(&self, key: &str) -> Option<usize> {
        as_count(self.get(key)?)
    }
}

pub(crate) fn as_count(value: &Value) -> Option<usize> {
    if let Some(n) = value.as_u64() {
        return usize::try_from(n).ok();
    }
    match value.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => usize::try_from(f as u64).ok(),
        _ => None,
    }
}

/// Upper bound on the columns a single pivot may expand to
pub const MAX_PIVOT_COLUMNS: usize = 1024;

/// Number of pivot columns declared in `properties`, if the pivot is active
pub fn pivot_columns(properties: &Properties) -> Option<usize> {
    if !properties.flag(keys::FIELD_GROUP_VIEW_VALUES_IN_SEPARATE_COLUMNS) {
        return None;
    }
    properties
        .count(keys::FIELD_GROUP_VIEW_MAX_NO_OF_VALUES_IN_SEPARATE_COLUMNS)
        .filter(|max| (1..=MAX_PIVOT_COLUMNS).contains(max))
}

/// An active pivot must declare a whole number of columns no larger than [`MAX_PIVOT_COLUMNS`]
fn check_pivot(properties: &Properties, path: &str) -> Result<()> {
    if !properties.flag(keys::FIELD_GROUP_VIEW_VALUES_IN_SEPARATE_COLUMNS) {
        return Ok(());
    }
    let Some(max) = properties.get(keys::FIELD_GROUP_VIEW_MAX_NO_OF_VALUES_IN_SEPARATE_COLUMNS) else {
        return Ok(());
    };
    match as_count(max) {
        Some(count) if count <= MAX_PIVOT_COLUMNS => Ok(()),
        _ => Err(Error::invalid_group(
            path,
            format!(
                "{} must be a whole number up to {}, found {}",
                keys::FIELD_GROUP_VIEW_MAX_NO_OF_VALUES_IN_SEPARATE_COLUMNS,
                MAX_PIVOT_COLUMNS,
                max
            ),
        )),
    }
}

/// Display name: `FieldGroupName`, else the last segment of the schema path, else `#unnamed`
pub fn display_name(properties: &Properties) -> String {
    if let Some(name) = properties.text(keys::FIELD_GROUP_NAME).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    properties
        .text(keys::FIELD_GROUP_JSON_PATH_KEY)
        .and_then(|path| path.rsplit('.').next())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("#unnamed")
        .to_string()
}

/// A leaf column in the metadata tree
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    pub path: String,
    pub properties: Arc<Properties>,
}

/// A container of named children visited in `read_order`
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    pub path: String,
    pub properties: Arc<Properties>,
    pub read_order: Vec<String>,
    pub fields: HashMap<String, MetadataNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetadataNode {
    Field(FieldNode),
    Group(GroupNode),
}

impl GroupNode {
    /// Children in read order, paired with their suffix
    pub fn children(&self) -> impl Iterator<Item = (&str, &MetadataNode)> {
        self.read_order
            .iter()
            .filter_map(|suffix| self.fields.get(suffix).map(|node| (suffix.as_str(), node)))
    }

    /// A flat group has no nested groups among its children
    pub fn is_flat(&self) -> bool {
        !self.fields.values().any(MetadataNode::is_group)
    }

    pub fn extract_as_single_field(&self) -> bool {
        self.properties.flag(keys::GROUP_EXTRACT_AS_SINGLE_FIELD)
    }

    /// Pivot width when this group is flat and declares an active pivot.
    ///
    /// A pivot on a group with nested groups is ignored; such groups explode into rows.
    pub fn flat_pivot_columns(&self) -> Option<usize> {
        let max = pivot_columns(&self.properties)?;
        if self.is_flat() {
            Some(max)
        } else {
            tracing::debug!(group = %self.path, "pivot ignored on group with nested groups");
            None
        }
    }
}

impl MetadataNode {
    /// Parse a metadata model. A root without a schema path is rooted at `$`.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::ArgumentInvalid("metadata model must be an object".into()))?;
        let path = object
            .get(keys::FIELD_GROUP_JSON_PATH_KEY)
            .and_then(Value::as_str)
            .unwrap_or(keys::JSON_PATH_ROOT)
            .to_string();
        Self::parse_node(object, path)
    }

    fn parse_node(object: &Map<String, Value>, path: String) -> Result<Self> {
        let mut properties: Properties = object
            .iter()
            .filter(|(k, _)| k.as_str() != keys::GROUP_FIELDS && k.as_str() != keys::GROUP_READ_ORDER_OF_FIELDS)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        properties.insert(keys::FIELD_GROUP_JSON_PATH_KEY.to_string(), Value::String(path.clone()));
        check_pivot(&properties, &path)?;

        if !Self::has_group_shape(object) {
            return Ok(MetadataNode::Field(FieldNode {
                path,
                properties: Arc::new(properties),
            }));
        }

        let children = object
            .get(keys::GROUP_FIELDS)
            .and_then(Value::as_array)
            .and_then(|fields| fields.first())
            .and_then(Value::as_object)
            .ok_or_else(|| Error::invalid_group(&path, "GroupFields[0] is not an object"))?;
        let order = object
            .get(keys::GROUP_READ_ORDER_OF_FIELDS)
            .and_then(Value::as_array)
            .ok_or_else(|| Error::invalid_group(&path, "GroupReadOrderOfFields is not an array"))?;

        let mut read_order = Vec::with_capacity(order.len());
        let mut fields = HashMap::with_capacity(order.len());
        let mut seen = HashSet::new();
        for entry in order {
            let suffix = entry
                .as_str()
                .ok_or_else(|| Error::invalid_group(&path, format!("read order entry {} is not a string", entry)))?;
            if !seen.insert(suffix) {
                return Err(Error::invalid_group(&path, format!("suffix '{}' listed twice", suffix)));
            }
            let child = children
                .get(suffix)
                .and_then(Value::as_object)
                .ok_or_else(|| Error::invalid_group(&path, format!("field '{}' missing or not an object", suffix)))?;
            let child_path = child
                .get(keys::FIELD_GROUP_JSON_PATH_KEY)
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    Error::invalid_group(&path, format!("field '{}' has no {}", suffix, keys::FIELD_GROUP_JSON_PATH_KEY))
                })?
                .to_string();

            fields.insert(suffix.to_string(), Self::parse_node(child, child_path)?);
            read_order.push(suffix.to_string());
        }

        Ok(MetadataNode::Group(GroupNode {
            path,
            properties: Arc::new(properties),
            read_order,
            fields,
        }))
    }

    /// A node is a group iff it has a non-empty read order and a non-empty child map
    fn has_group_shape(object: &Map<String, Value>) -> bool {
        let has_order = object
            .get(keys::GROUP_READ_ORDER_OF_FIELDS)
            .and_then(Value::as_array)
            .is_some_and(|order| !order.is_empty());
        let has_fields = object
            .get(keys::GROUP_FIELDS)
            .and_then(Value::as_array)
            .and_then(|fields| fields.first())
            .and_then(Value::as_object)
            .is_some_and(|map| !map.is_empty());
        has_order && has_fields
    }

    /// Serialize back into the metadata-model JSON shape
    pub fn to_value(&self) -> Value {
        match self {
            MetadataNode::Field(field) => Value::Object((*field.properties).clone()),
            MetadataNode::Group(group) => {
                let mut object = (*group.properties).clone();
                let children: Map<String, Value> = group
                    .children()
                    .map(|(suffix, node)| (suffix.to_string(), node.to_value()))
                    .collect();
                object.insert(keys::GROUP_FIELDS.to_string(), Value::Array(vec![Value::Object(children)]));
                object.insert(
                    keys::GROUP_READ_ORDER_OF_FIELDS.to_string(),
                    Value::Array(group.read_order.iter().cloned().map(Value::String).collect()),
                );
                Value::Object(object)
            }
        }
    }

    pub fn path(&self) -> &str {
        match self {
            MetadataNode::Field(field) => &field.path,
            MetadataNode::Group(group) => &group.path,
        }
    }

    pub fn properties(&self) -> &Arc<Properties> {
        match self {
            MetadataNode::Field(field) => &field.properties,
            MetadataNode::Group(group) => &group.properties,
        }
    }

    /// Copy-on-write access to the node's properties
    pub fn properties_mut(&mut self) -> &mut Properties {
        match self {
            MetadataNode::Field(field) => Arc::make_mut(&mut field.properties),
            MetadataNode::Group(group) => Arc::make_mut(&mut group.properties),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, MetadataNode::Group(_))
    }

    pub fn is_field(&self) -> bool {
        matches!(self, MetadataNode::Field(_))
    }

    pub fn as_group(&self) -> Option<&GroupNode> {
        match self {
            MetadataNode::Group(group) => Some(group),
            MetadataNode::Field(_) => None,
        }
    }

    pub fn name(&self) -> String {
        display_name(self.properties())
    }

    pub fn is_primary_key(&self) -> bool {
        self.properties().flag(keys::FIELD_GROUP_IS_PRIMARY_KEY)
    }
}
