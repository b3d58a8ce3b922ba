//! Records to rows
//!
//! A record is converted group by group. Leaf values are appended as one cell to
//! every row built so far; a nested group holding an array branches the rows once per
//! element and concatenates the branches. Rows are kept in original column order and
//! only rearranged (and filtered) when written out.

use crate::columns::{ColumnFields, ColumnPosition};
use crate::error::{Error, Result};
use crate::model::{pivot_columns, GroupNode, JsonPathToValue, MetadataNode};
use crate::object::ValueAccessor;
use crate::table::extract_columns;
use crate::types::{Cell, FlattenedRow, FlattenedTable, TableConfig};
use serde_json::Value;

/// One step of the conversion of a group
#[derive(Debug, Clone)]
enum Conversion {
    /// A physical column, read from its identity path
    Leaf(String),
    /// A nested group converted recursively
    Group { path: String, children: Vec<Conversion> },
}

/// Flattens records described by a metadata model into a [`FlattenedTable`]
#[derive(Debug)]
pub struct Flattener {
    columns: ColumnFields,
    conversion: Vec<Conversion>,
    resolver: JsonPathToValue,
    rows: FlattenedTable,
}

impl Flattener {
    /// Flattener over the columns of `model`, repositioned, with nothing skipped
    pub fn new(model: &MetadataNode) -> Result<Self> {
        Self::from_config(model, &TableConfig::default())
    }

    pub fn from_config(model: &MetadataNode, config: &TableConfig) -> Result<Self> {
        let columns = extract_columns(model, config)?;
        Self::with_column_fields(model, columns)
    }

    /// Use columns prepared by the caller. They must have been extracted from `model`.
    pub fn with_column_fields(model: &MetadataNode, columns: ColumnFields) -> Result<Self> {
        let root = model
            .as_group()
            .ok_or_else(|| Error::invalid_group(model.path(), "metadata model root is not a group"))?;
        let conversion = build_conversion(root, &columns)?;

        Ok(Flattener {
            columns,
            conversion,
            resolver: JsonPathToValue::new(),
            rows: FlattenedTable::new(),
        })
    }

    pub fn columns(&self) -> &ColumnFields {
        &self.columns
    }

    /// Flatten `source` and append the rows to the table, returning how many were added.
    ///
    /// An array source is a list of records, each flattened on its own. Nothing is
    /// appended unless every record converts.
    pub fn flatten(&mut self, source: &Value) -> Result<usize> {
        let converted = match source {
            Value::Array(records) => {
                let mut converted = FlattenedTable::new();
                for record in records {
                    converted.extend(self.flatten_record(record)?);
                }
                converted
            }
            record => self.flatten_record(record)?,
        };

        let added = converted.len();
        self.rows.extend(converted);
        tracing::debug!(rows = added, total = self.rows.len(), "flattened");
        Ok(added)
    }

    fn flatten_record(&self, record: &Value) -> Result<FlattenedTable> {
        if !record.is_object() {
            return Err(Error::ArgumentInvalid(format!(
                "expected an object record, found {}",
                kind(record)
            )));
        }
        self.convert(&self.conversion, record, &mut Vec::new(), FlattenedTable::new())
    }

    fn convert(
        &self,
        steps: &[Conversion],
        record: &Value,
        indexes: &mut Vec<usize>,
        incoming: FlattenedTable,
    ) -> Result<FlattenedTable> {
        let mut rows = if incoming.is_empty() { vec![FlattenedRow::new()] } else { incoming };

        for step in steps {
            match step {
                Conversion::Leaf(path) => {
                    let resolved = self.resolver.resolve(path, indexes)?;
                    let cell = to_cell(record.first_at(&resolved)?);
                    for row in &mut rows {
                        row.push(cell.clone());
                    }
                }
                Conversion::Group { path, children } => {
                    let resolved = self.resolver.resolve(path, indexes)?;
                    match record.first_at(&resolved)? {
                        Some(Value::Array(items)) if !items.is_empty() => {
                            let mut branches = FlattenedTable::with_capacity(rows.len() * items.len());
                            for index in 0..items.len() {
                                indexes.push(index);
                                branches.extend(self.convert(children, record, indexes, rows.clone())?);
                                indexes.pop();
                            }
                            rows = branches;
                        }
                        _ => {
                            indexes.push(0);
                            rows = self.convert(children, record, indexes, rows)?;
                            indexes.pop();
                        }
                    }
                }
            }
        }
        Ok(rows)
    }

    /// Rows in original column order
    pub fn rows(&self) -> &FlattenedTable {
        &self.rows
    }

    /// Rows as written: repositioned, with skipped columns left out
    pub fn written_rows(&self) -> impl Iterator<Item = FlattenedRow> + '_ {
        let order = self.columns.unskipped_read_order();
        self.rows
            .iter()
            .map(move |row| order.iter().filter_map(|&column| row.get(column).cloned()).collect())
    }

    /// Write the table into `destination` as `$[row][column]`, columns in written order
    pub fn write_to_destination<A>(&self, destination: &mut A) -> Result<()>
    where
        A: ValueAccessor + ?Sized,
    {
        let order = self.columns.unskipped_read_order();
        for (row_index, row) in self.rows.iter().enumerate() {
            for (column_index, &source) in order.iter().enumerate() {
                let cell = row.get(source).ok_or_else(|| {
                    Error::ArgumentInvalid(format!(
                        "row {} has {} cells, column {} out of bounds",
                        row_index,
                        row.len(),
                        source
                    ))
                })?;
                destination.set_at(&format!("$[{}][{}]", row_index, column_index), cell.clone())?;
            }
        }
        Ok(())
    }

    /// Drop the accumulated rows, keeping the columns
    pub fn reset(&mut self) {
        self.rows.clear();
    }

    pub fn into_rows(self) -> FlattenedTable {
        self.rows
    }
}

/// Cells are always arrays: absent values are `[]`, scalars are wrapped
fn to_cell(value: Option<&Value>) -> Cell {
    match value {
        None => Value::Array(Vec::new()),
        Some(Value::Array(items)) => Value::Array(items.clone()),
        Some(other) => Value::Array(vec![other.clone()]),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Mirror the extraction walk so that cells are appended in original column order
fn build_conversion(group: &GroupNode, columns: &ColumnFields) -> Result<Vec<Conversion>> {
    let mut steps = Vec::new();

    for (suffix, node) in group.children() {
        if let MetadataNode::Group(child) = node {
            if !child.extract_as_single_field() {
                match child.flat_pivot_columns() {
                    Some(max) => {
                        for index in 0..max {
                            for (child_suffix, field) in child.children() {
                                let position =
                                    ColumnPosition::group_pivot(field.path(), &child.path, child_suffix, index);
                                steps.push(leaf(columns, &position)?);
                            }
                        }
                    }
                    None => match build_conversion(child, columns) {
                        Ok(children) => steps.push(Conversion::Group {
                            path: child.path.clone(),
                            children,
                        }),
                        Err(Error::NoExtractableColumns(path)) => {
                            tracing::debug!(group = %path, suffix, "group without columns left out");
                        }
                        Err(err) => return Err(err),
                    },
                }
                continue;
            }
        }

        match pivot_columns(node.properties()) {
            Some(max) => {
                for index in 0..max {
                    steps.push(leaf(columns, &ColumnPosition::field_pivot(node.path(), index))?);
                }
            }
            None => steps.push(leaf(columns, &ColumnPosition::field(node.path()))?),
        }
    }

    if steps.is_empty() {
        return Err(Error::NoExtractableColumns(group.path.clone()));
    }
    Ok(steps)
}

fn leaf(columns: &ColumnFields, position: &ColumnPosition) -> Result<Conversion> {
    let identity = position.identity();
    if columns.get(&identity).is_none() {
        return Err(Error::ColumnNotFound(identity));
    }
    Ok(Conversion::Leaf(identity))
}
