use crate::columns::{ColumnFields, ColumnPosition};
use crate::error::{Error, Result};
use crate::model::{GroupNode, MetadataNode};

/// Unskipped column indexes of one group, used to read its values out of a row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupColumnIndexes {
    /// Primary-key columns, including those of nested groups marked as primary key
    pub primary: Vec<usize>,
    /// Columns written by this group itself; nested groups have their own
    pub all: Vec<usize>,
}

impl GroupColumnIndexes {
    pub fn new(group: &GroupNode, columns: &ColumnFields) -> Result<Self> {
        let mut indexes = GroupColumnIndexes::default();
        indexes.collect(group, columns, false)?;
        Ok(indexes)
    }

    /// Columns identifying an instance of the group: the primary key, else every column
    pub fn signature_columns(&self) -> &[usize] {
        if self.primary.is_empty() {
            &self.all
        } else {
            &self.primary
        }
    }

    /// With `keys_only`, only primary-key children are visited and recorded as primary.
    fn collect(&mut self, group: &GroupNode, columns: &ColumnFields, keys_only: bool) -> Result<()> {
        for (suffix, node) in group.children() {
            let is_primary = node.is_primary_key();
            if keys_only && !is_primary {
                continue;
            }
            let record_all = !keys_only;

            if let MetadataNode::Group(child) = node {
                if !child.extract_as_single_field() {
                    match child.flat_pivot_columns() {
                        Some(max) => {
                            for index in 0..max {
                                for (child_suffix, field) in child.children() {
                                    let position =
                                        ColumnPosition::group_pivot(field.path(), &child.path, child_suffix, index);
                                    self.record(columns, &position, is_primary, record_all)?;
                                }
                            }
                        }
                        None if is_primary => self.collect(child, columns, true)?,
                        None => {
                            tracing::trace!(group = %group.path, suffix, "nested group indexed separately");
                        }
                    }
                    continue;
                }
            }

            match crate::model::pivot_columns(node.properties()) {
                Some(max) => {
                    for index in 0..max {
                        let position = ColumnPosition::field_pivot(node.path(), index);
                        self.record(columns, &position, is_primary, record_all)?;
                    }
                }
                None => self.record(columns, &ColumnPosition::field(node.path()), is_primary, record_all)?,
            }
        }
        Ok(())
    }

    fn record(&mut self, columns: &ColumnFields, position: &ColumnPosition, primary: bool, all: bool) -> Result<()> {
        let identity = position.identity();
        let column = columns
            .get(&identity)
            .ok_or_else(|| Error::ColumnNotFound(identity.clone()))?;
        let Some(index) = column.index_in_unskipped else {
            return Ok(());
        };
        if all {
            self.all.push(index);
        }
        if primary {
            self.primary.push(index);
        }
        Ok(())
    }
}
