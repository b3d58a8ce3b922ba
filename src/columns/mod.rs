//! Metadata fields as table columns
//!
//! [`Extraction`] walks a metadata model once and produces [`ColumnFields`]: every
//! physical column in extraction order, with pivots expanded. Two derived orders sit
//! on top of it:
//!
//! - `repositioned_read_order`: a permutation of the original indexes, rearranged by
//!   [`ColumnFields::reposition`]
//! - `unskipped_read_order`: the repositioned order minus the columns marked by
//!   [`ColumnFields::skip`]; this is the order in which tables are written
//!
//! ## Example
//!
//! ```rust
//! use metaflat::columns::Extraction;
//! use metaflat::model::{MetadataNode, PropertiesMatch};
//! use serde_json::json;
//!
//! # fn main() -> metaflat::Result<()> {
//! let model = MetadataNode::from_value(&json!({
//!     "FieldGroupJsonPathKey": "$",
//!     "GroupFields": [{
//!         "ID": {"FieldGroupJsonPathKey": "$.GroupFields[*].ID"},
//!         "Secret": {"FieldGroupJsonPathKey": "$.GroupFields[*].Secret", "FieldGroupViewDisable": true}
//!     }],
//!     "GroupReadOrderOfFields": ["ID", "Secret"]
//! }))?;
//!
//! let mut columns = Extraction::new(&model).extract()?;
//! columns.reposition()?;
//! columns.skip(
//!     &PropertiesMatch::new().with_equals("FieldGroupViewDisable", json!(true)),
//!     &PropertiesMatch::new(),
//! );
//! assert_eq!(columns.headers(), vec!["ID"]);
//! # Ok(())
//! # }
//! ```

pub mod extraction;
pub mod group_indexes;

pub use extraction::Extraction;
pub use group_indexes::GroupColumnIndexes;

use crate::error::{Error, Result};
use crate::model::{display_name, keys, Properties, PropertiesExt, PropertiesMatch};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Pivot context of a physical column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Pivot {
    /// Column `index` of a pivoted field
    Field { index: usize },
    /// Child `suffix` of entry `index` of a pivoted flat group at `parent`
    Group { parent: String, suffix: String, index: usize },
}

/// Identifies one physical column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ColumnPosition {
    /// Schema path of the field (for group pivots, of the child field)
    pub path: String,
    pub pivot: Option<Pivot>,
}

impl ColumnPosition {
    pub fn field(path: impl Into<String>) -> Self {
        ColumnPosition {
            path: path.into(),
            pivot: None,
        }
    }

    pub fn field_pivot(path: impl Into<String>, index: usize) -> Self {
        ColumnPosition {
            path: path.into(),
            pivot: Some(Pivot::Field { index }),
        }
    }

    pub fn group_pivot(
        path: impl Into<String>,
        parent: impl Into<String>,
        suffix: impl Into<String>,
        index: usize,
    ) -> Self {
        ColumnPosition {
            path: path.into(),
            pivot: Some(Pivot::Group {
                parent: parent.into(),
                suffix: suffix.into(),
                index,
            }),
        }
    }

    /// Canonical identity; two positions are the same column iff their identities are equal.
    ///
    /// The identity doubles as a schema path with the pivot index made concrete, e.g.
    /// `$.GroupFields[*].Skills[2]` or `$.GroupFields[*].Address.GroupFields[1].City`.
    pub fn identity(&self) -> String {
        match &self.pivot {
            None => self.path.clone(),
            Some(Pivot::Field { index }) => format!("{}[{}]", self.path, index),
            Some(Pivot::Group { parent, suffix, index }) => {
                format!("{}.{}[{}].{}", parent, keys::GROUP_FIELDS, index, suffix)
            }
        }
    }

    pub fn pivot_index(&self) -> Option<usize> {
        match &self.pivot {
            None => None,
            Some(Pivot::Field { index }) | Some(Pivot::Group { index, .. }) => Some(*index),
        }
    }
}

impl fmt::Display for ColumnPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity())
    }
}

/// Where to move a column: directly before or after `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionDirective {
    pub target: ColumnPosition,
    pub before: bool,
}

impl PositionDirective {
    /// Read a `FieldColumnPosition` property. Absent or malformed directives are `None`.
    pub fn from_properties(properties: &Properties) -> Option<Self> {
        let directive = properties.get(keys::FIELD_COLUMN_POSITION)?.as_object()?;
        let path = directive.text(keys::FIELD_GROUP_JSON_PATH_KEY)?;
        let target = match directive.count(keys::FIELD_VIEW_VALUES_IN_SEPARATE_COLUMNS_HEADER_INDEX) {
            Some(index) => ColumnPosition::field_pivot(path, index),
            None => ColumnPosition::field(path),
        };
        Some(PositionDirective {
            target,
            before: directive.flag(keys::FIELD_GROUP_POSITION_BEFORE),
        })
    }
}

/// A queued move of the column at `source_index` (original read order)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositionDirective {
    pub source_index: usize,
    pub target: ColumnPosition,
    pub before: bool,
}

/// One physical column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnField {
    pub position: ColumnPosition,
    pub identity: String,
    /// Field properties with inherited and pivot properties merged in
    pub properties: Arc<Properties>,
    pub index_in_original: usize,
    pub index_in_repositioned: usize,
    /// `None` while the column is skipped
    pub index_in_unskipped: Option<usize>,
    pub skip: bool,
}

impl ColumnField {
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn name(&self) -> String {
        display_name(&self.properties)
    }

    pub fn is_primary_key(&self) -> bool {
        self.properties.flag(keys::FIELD_GROUP_IS_PRIMARY_KEY)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ColumnFields {
    /// Indexed by position in the original read order
    columns: Vec<ColumnField>,
    by_identity: HashMap<String, usize>,
    repositioned_read_order: Vec<usize>,
    unskipped_read_order: Vec<usize>,
    reposition_directives: Vec<RepositionDirective>,
}

impl ColumnFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column at the end of every read order, returning its original index
    pub(crate) fn push(&mut self, position: ColumnPosition, properties: Arc<Properties>) -> Result<usize> {
        let identity = position.identity();
        if self.by_identity.contains_key(&identity) {
            return Err(Error::DuplicateColumnIdentity(identity));
        }

        let index = self.columns.len();
        let unskipped = self.unskipped_read_order.len();
        self.by_identity.insert(identity.clone(), index);
        self.columns.push(ColumnField {
            position,
            identity,
            properties,
            index_in_original: index,
            index_in_repositioned: self.repositioned_read_order.len(),
            index_in_unskipped: Some(unskipped),
            skip: false,
        });
        self.repositioned_read_order.push(index);
        self.unskipped_read_order.push(index);
        Ok(index)
    }

    pub(crate) fn queue_reposition(&mut self, directive: RepositionDirective) {
        self.reposition_directives.push(directive);
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns in original read order
    pub fn columns(&self) -> &[ColumnField] {
        &self.columns
    }

    pub fn original_read_order(&self) -> impl Iterator<Item = &ColumnPosition> {
        self.columns.iter().map(|column| &column.position)
    }

    pub fn repositioned_read_order(&self) -> &[usize] {
        &self.repositioned_read_order
    }

    pub fn unskipped_read_order(&self) -> &[usize] {
        &self.unskipped_read_order
    }

    pub fn reposition_directives(&self) -> &[RepositionDirective] {
        &self.reposition_directives
    }

    pub fn get(&self, identity: &str) -> Option<&ColumnField> {
        self.by_identity.get(identity).map(|&index| &self.columns[index])
    }

    pub fn by_original_index(&self, index: usize) -> Option<&ColumnField> {
        self.columns.get(index)
    }

    pub fn by_repositioned_index(&self, index: usize) -> Option<&ColumnField> {
        self.repositioned_read_order
            .get(index)
            .and_then(|&original| self.columns.get(original))
    }

    pub fn by_unskipped_index(&self, index: usize) -> Option<&ColumnField> {
        self.unskipped_read_order
            .get(index)
            .and_then(|&original| self.columns.get(original))
    }

    /// Display names of the written columns
    pub fn headers(&self) -> Vec<String> {
        self.unskipped_read_order
            .iter()
            .map(|&index| self.columns[index].name())
            .collect()
    }

    /// Positions of the written columns
    pub fn unskipped_positions(&self) -> Vec<&ColumnPosition> {
        self.unskipped_read_order
            .iter()
            .map(|&index| &self.columns[index].position)
            .collect()
    }

    /// Apply the queued directives in order, each against the order left by the previous one.
    ///
    /// The moved column is taken out first and then placed directly before or after
    /// the target's current slot. The unskipped order is rebuilt from the result.
    pub fn reposition(&mut self) -> Result<()> {
        let order = &mut self.repositioned_read_order;
        for directive in &self.reposition_directives {
            let target_identity = directive.target.identity();
            let target = *self
                .by_identity
                .get(&target_identity)
                .ok_or_else(|| Error::ColumnNotFound(target_identity.clone()))?;
            if target == directive.source_index {
                continue;
            }

            let from = order
                .iter()
                .position(|&index| index == directive.source_index)
                .ok_or_else(|| Error::ColumnNotFound(format!("column #{}", directive.source_index)))?;
            let moved = order.remove(from);
            let slot = order
                .iter()
                .position(|&index| index == target)
                .ok_or_else(|| Error::ColumnNotFound(target_identity.clone()))?;
            order.insert(if directive.before { slot } else { slot + 1 }, moved);

            tracing::trace!(
                column = %self.columns[moved].identity,
                target = %target_identity,
                before = directive.before,
                "column repositioned"
            );
        }

        for (slot, &index) in self.repositioned_read_order.iter().enumerate() {
            self.columns[index].index_in_repositioned = slot;
        }
        self.rebuild_unskipped();
        tracing::debug!(directives = self.reposition_directives.len(), "reposition applied");
        Ok(())
    }

    /// Mark columns to leave out of the written table and rebuild the unskipped order.
    ///
    /// A column is skipped when `skip` is valid and matches it, or when `add` is valid
    /// and does not match it. Invalid (empty) matchers are ignored.
    pub fn skip(&mut self, skip: &PropertiesMatch, add: &PropertiesMatch) {
        for column in &mut self.columns {
            column.skip = (skip.is_valid() && skip.first_match(&column.properties))
                || (add.is_valid() && !add.first_match(&column.properties));
        }
        self.rebuild_unskipped();
        tracing::debug!(
            columns = self.columns.len(),
            written = self.unskipped_read_order.len(),
            "skip applied"
        );
    }

    fn rebuild_unskipped(&mut self) {
        self.unskipped_read_order.clear();
        for &index in &self.repositioned_read_order {
            let column = &mut self.columns[index];
            if column.skip {
                column.index_in_unskipped = None;
            } else {
                column.index_in_unskipped = Some(self.unskipped_read_order.len());
                self.unskipped_read_order.push(index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MetadataNode;
    use crate::testdata::{self, parse, with_pivot, with_property};
    use serde_json::json;

    const PRODUCT_ID: &str = "$.GroupFields[*].ID";

    fn extract(model: &MetadataNode) -> ColumnFields {
        let mut columns = Extraction::new(model).extract().unwrap();
        columns.reposition().unwrap();
        columns
    }

    fn assert_permutation(columns: &ColumnFields) {
        let mut sorted = columns.repositioned_read_order().to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..columns.len()).collect::<Vec<_>>());
    }

    fn pivoted_product() -> MetadataNode {
        let mut model = parse(testdata::product_model());
        with_pivot(&mut model, "Name", 3);
        model
    }

    #[test]
    fn test_identity_forms() {
        assert_eq!(ColumnPosition::field("$.GroupFields[*].ID").identity(), "$.GroupFields[*].ID");
        assert_eq!(
            ColumnPosition::field_pivot("$.GroupFields[*].Skills", 2).identity(),
            "$.GroupFields[*].Skills[2]"
        );
        assert_eq!(
            ColumnPosition::group_pivot(
                "$.GroupFields[*].Address.GroupFields[*].City",
                "$.GroupFields[*].Address",
                "City",
                1
            )
            .identity(),
            "$.GroupFields[*].Address.GroupFields[1].City"
        );
    }

    #[test]
    fn test_directive_from_properties() {
        let props = json!({
            "FieldColumnPosition": {
                "FieldGroupJsonPathKey": "$.GroupFields[*].Skills",
                "FieldViewValuesInSeparateColumnsHeaderIndex": 1,
                "FieldGroupPositionBefore": true
            }
        });
        let directive = PositionDirective::from_properties(props.as_object().unwrap()).unwrap();
        assert_eq!(directive.target.identity(), "$.GroupFields[*].Skills[1]");
        assert!(directive.before);

        assert!(PositionDirective::from_properties(&Properties::new()).is_none());
    }

    #[test]
    fn test_default_order_is_identity() {
        let user = extract(&parse(testdata::user_model()));
        assert_eq!(user.repositioned_read_order(), &[0, 1, 2]);

        let employee = extract(&parse(testdata::employee_model()));
        assert_eq!(employee.repositioned_read_order(), &[0, 1, 2, 3, 4, 5, 6]);

        assert_eq!(extract(&pivoted_product()).repositioned_read_order(), &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_pivoted_address_keeps_order() {
        let mut model = parse(testdata::user_profile_model());
        with_pivot(&mut model, "Address", 3);
        let columns = extract(&model);
        assert_eq!(columns.repositioned_read_order(), (0..11).collect::<Vec<_>>().as_slice());
    }

    #[test]
    fn test_reposition_after() {
        let mut model = pivoted_product();
        with_property(&mut model, "Price", keys::FIELD_COLUMN_POSITION, json!({"FieldGroupJsonPathKey": PRODUCT_ID}));

        let columns = extract(&model);
        assert_eq!(columns.repositioned_read_order(), &[0, 4, 1, 2, 3]);
        assert_eq!(columns.get("$.GroupFields[*].Price").unwrap().index_in_repositioned, 1);
        assert_permutation(&columns);
    }

    #[test]
    fn test_reposition_pivot_block_before() {
        let mut model = pivoted_product();
        with_property(&mut model, "Price", keys::FIELD_COLUMN_POSITION, json!({"FieldGroupJsonPathKey": PRODUCT_ID}));
        with_property(
            &mut model,
            "Name",
            keys::FIELD_COLUMN_POSITION,
            json!({"FieldGroupJsonPathKey": PRODUCT_ID, "FieldGroupPositionBefore": true}),
        );

        let columns = extract(&model);
        assert_eq!(columns.repositioned_read_order(), &[1, 2, 3, 0, 4]);
        assert_eq!(columns.unskipped_read_order(), &[1, 2, 3, 0, 4]);
        assert_permutation(&columns);
    }

    #[test]
    fn test_reposition_pivoted_group_before() {
        let mut model = parse(testdata::user_profile_model());
        with_pivot(&mut model, "Address", 3);
        with_property(
            &mut model,
            "Address",
            keys::FIELD_COLUMN_POSITION,
            json!({"FieldGroupJsonPathKey": "$.GroupFields[*].Age", "FieldGroupPositionBefore": true}),
        );

        let columns = extract(&model);
        assert_eq!(columns.repositioned_read_order(), &[0, 2, 3, 4, 5, 6, 7, 8, 9, 10, 1]);
        assert_permutation(&columns);
    }

    #[test]
    fn test_reposition_nested_group_after() {
        let mut model = parse(testdata::employee_model());
        with_property(
            &mut model,
            "UserProfile",
            keys::FIELD_COLUMN_POSITION,
            json!({"FieldGroupJsonPathKey": "$.GroupFields[*].Skills"}),
        );

        let columns = extract(&model);
        assert_eq!(columns.repositioned_read_order(), &[0, 6, 1, 2, 3, 4, 5]);
        assert_eq!(
            columns.headers(),
            vec!["ID", "Skills", "Name", "Age", "Street", "City", "ZipCode"]
        );
    }

    #[test]
    fn test_reposition_unknown_target() {
        let mut model = parse(testdata::product_model());
        with_property(
            &mut model,
            "Price",
            keys::FIELD_COLUMN_POSITION,
            json!({"FieldGroupJsonPathKey": "$.GroupFields[*].Missing"}),
        );
        let mut columns = Extraction::new(&model).extract().unwrap();
        assert!(matches!(columns.reposition(), Err(Error::ColumnNotFound(_))));
    }

    #[test]
    fn test_skip_is_subsequence_of_repositioned() {
        let mut model = pivoted_product();
        with_property(&mut model, "Price", keys::FIELD_COLUMN_POSITION, json!({"FieldGroupJsonPathKey": PRODUCT_ID}));
        with_property(&mut model, "ID", keys::FIELD_GROUP_VIEW_DISABLE, json!(true));

        let mut columns = extract(&model);
        columns.skip(
            &PropertiesMatch::new().with_equals(keys::FIELD_GROUP_VIEW_DISABLE, json!(true)),
            &PropertiesMatch::new(),
        );

        assert_eq!(columns.repositioned_read_order(), &[0, 4, 1, 2, 3]);
        assert_eq!(columns.unskipped_read_order(), &[4, 1, 2, 3]);
        assert!(columns.by_original_index(0).unwrap().skip);
        assert_eq!(columns.by_original_index(0).unwrap().index_in_unskipped, None);
        assert_eq!(columns.by_unskipped_index(0).unwrap().name(), "Price");
        assert_eq!(columns.headers(), vec!["Price", "Name 1", "Name 2", "Name 3"]);
    }

    #[test]
    fn test_skip_with_add_keeps_only_matches() {
        let mut columns = extract(&parse(testdata::employee_model()));
        columns.skip(
            &PropertiesMatch::new(),
            &PropertiesMatch::new().with_equals(keys::FIELD_DATA_TYPE, json!(keys::FIELD_TYPE_NUMBER)),
        );
        assert_eq!(columns.headers(), vec!["ID", "Age"]);

        // Recomputed from scratch on every call
        columns.skip(&PropertiesMatch::new(), &PropertiesMatch::new());
        assert_eq!(columns.unskipped_read_order().len(), 7);
    }

    #[test]
    fn test_lookups() {
        let columns = extract(&parse(testdata::user_model()));
        let email = columns.get("$.GroupFields[*].Email").unwrap();
        assert_eq!(email.index_in_original, 2);
        assert_eq!(columns.by_repositioned_index(2), Some(email));
        assert_eq!(
            columns.unskipped_positions(),
            vec![
                &ColumnPosition::field("$.GroupFields[*].ID"),
                &ColumnPosition::field("$.GroupFields[*].Name"),
                &ColumnPosition::field("$.GroupFields[*].Email"),
            ]
        );
        assert!(columns.get("$.GroupFields[*].Missing").is_none());
    }
}
