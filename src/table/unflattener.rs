//! Rows back to records
//!
//! Each row is walked through an index tree shaped like the model's nested groups.
//! At every group the row's signature picks an existing instance or creates the next
//! one, so rows repeating a parent's data collapse into a single record while new
//! child signatures append new array elements.

use crate::columns::{ColumnFields, GroupColumnIndexes};
use crate::error::{Error, Result};
use crate::model::{GroupNode, JsonPathToValue, MetadataNode};
use crate::object::ValueAccessor;
use crate::table::extract_columns;
use crate::table::index::{GroupCollection, Signature};
use crate::types::{FlattenedRow, TableConfig};
use serde_json::Value;

/// What to write for one group and where its nested groups are
#[derive(Debug)]
struct GroupIndexTree {
    indexes: GroupColumnIndexes,
    /// Unskipped column index paired with the column identity
    writes: Vec<(usize, String)>,
    /// Columns written by this group and every group below it
    subtree: Vec<usize>,
    children: Vec<(String, GroupIndexTree)>,
}

impl GroupIndexTree {
    fn build(group: &GroupNode, columns: &ColumnFields) -> Result<Self> {
        let indexes = GroupColumnIndexes::new(group, columns)?;
        let writes = indexes
            .all
            .iter()
            .map(|&index| {
                columns
                    .by_unskipped_index(index)
                    .map(|column| (index, column.identity.clone()))
                    .ok_or_else(|| Error::ColumnNotFound(format!("written column #{}", index)))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut subtree = indexes.all.clone();
        let mut children = Vec::new();
        for (suffix, node) in group.children() {
            if let MetadataNode::Group(child) = node {
                if !child.extract_as_single_field() && child.flat_pivot_columns().is_none() {
                    let child = GroupIndexTree::build(child, columns)?;
                    subtree.extend_from_slice(&child.subtree);
                    children.push((suffix.to_string(), child));
                }
            }
        }

        Ok(GroupIndexTree {
            indexes,
            writes,
            subtree,
            children,
        })
    }

    /// A row holds an instance of the group unless every cell of the subtree is absent
    fn holds_instance(&self, row: &FlattenedRow) -> bool {
        self.subtree
            .iter()
            .any(|&column| row.get(column).is_some_and(|cell| !is_absent(cell)))
    }
}

/// Rebuilds records from rows in written column order (see [`crate::Flattener::written_rows`])
#[derive(Debug)]
pub struct Unflattener {
    columns: ColumnFields,
    tree: GroupIndexTree,
    signature: Signature,
    resolver: JsonPathToValue,
    root: GroupCollection,
    destination: Value,
}

impl Unflattener {
    pub fn new(model: &MetadataNode) -> Result<Self> {
        Self::from_config(model, &TableConfig::default())
    }

    pub fn from_config(model: &MetadataNode, config: &TableConfig) -> Result<Self> {
        let columns = extract_columns(model, config)?;
        Ok(Self::with_column_fields(model, columns)?.with_signature(Signature::new().with_join_symbol(config.join_symbol)))
    }

    /// Use columns prepared by the caller; the rows must be in their unskipped order
    pub fn with_column_fields(model: &MetadataNode, columns: ColumnFields) -> Result<Self> {
        let root = model
            .as_group()
            .ok_or_else(|| Error::invalid_group(model.path(), "metadata model root is not a group"))?;
        let tree = GroupIndexTree::build(root, &columns)?;

        Ok(Unflattener {
            columns,
            tree,
            signature: Signature::new(),
            resolver: JsonPathToValue::new().with_source_is_array(true),
            root: GroupCollection::new(),
            destination: Value::Null,
        })
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    /// Start from an existing array of records instead of an empty one
    pub fn with_destination(mut self, destination: Value) -> Self {
        self.destination = destination;
        self
    }

    pub fn columns(&self) -> &ColumnFields {
        &self.columns
    }

    /// Merge `rows` into the destination.
    ///
    /// Instances are remembered across calls, so a table may arrive in several batches.
    /// A failed call leaves the destination and the instances as they were before it.
    pub fn unflatten(&mut self, rows: &[FlattenedRow]) -> Result<()> {
        let mut root = self.root.clone();
        let mut destination = self.destination.clone();

        for row in rows {
            write_group(
                &self.tree,
                &mut root,
                &[],
                row,
                &self.signature,
                &self.resolver,
                &mut destination,
            )?;
        }

        tracing::debug!(rows = rows.len(), records = root.len(), "unflattened");
        self.root = root;
        self.destination = destination;
        Ok(())
    }

    pub fn destination(&self) -> &Value {
        &self.destination
    }

    /// The reconstructed records, `[]` when nothing was written
    pub fn into_destination(self) -> Value {
        match self.destination {
            Value::Null => Value::Array(Vec::new()),
            records => records,
        }
    }

    /// Forget every instance and clear the destination
    pub fn reset(&mut self) {
        self.root.clear();
        self.destination = Value::Null;
    }
}

fn write_group(
    tree: &GroupIndexTree,
    collection: &mut GroupCollection,
    parent_indexes: &[usize],
    row: &FlattenedRow,
    signature: &Signature,
    resolver: &JsonPathToValue,
    destination: &mut Value,
) -> Result<()> {
    if !tree.holds_instance(row) {
        return Ok(());
    }
    let key = signature.generate(row, tree.indexes.signature_columns());
    let (node, index) = collection.get_or_create_instance(key);

    let mut indexes = Vec::with_capacity(parent_indexes.len() + 1);
    indexes.extend_from_slice(parent_indexes);
    indexes.push(index);

    for (column, identity) in &tree.writes {
        let Some(cell) = row.get(*column).filter(|cell| !is_absent(cell)) else {
            continue;
        };
        let path = resolver.resolve(identity, &indexes)?;
        let value = if path.ends_with(']') {
            // A single pivot slot holds the element itself
            match cell {
                Value::Array(items) => items.first().cloned().unwrap_or_default(),
                other => other.clone(),
            }
        } else {
            match cell {
                Value::Array(_) => cell.clone(),
                other => Value::Array(vec![other.clone()]),
            }
        };
        tracing::trace!(%path, "write");
        destination.set_at(&path, value)?;
    }

    for (suffix, child) in &tree.children {
        write_group(
            child,
            node.get_or_create_group(suffix),
            &indexes,
            row,
            signature,
            resolver,
            destination,
        )?;
    }
    Ok(())
}

fn is_absent(cell: &Value) -> bool {
    match cell {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Flattener;
    use crate::testdata::{self, parse, with_pivot};
    use crate::types::FlattenedTable;
    use serde_json::json;

    fn rows(table: Value) -> FlattenedTable {
        serde_json::from_value(table).unwrap()
    }

    fn unflatten(model: &MetadataNode, table: Value) -> Value {
        let mut unflattener = Unflattener::new(model).unwrap();
        unflattener.unflatten(&rows(table)).unwrap();
        unflattener.into_destination()
    }

    fn round_trip(model: &MetadataNode, records: &Value) -> Value {
        let mut flattener = Flattener::new(model).unwrap();
        flattener.flatten(records).unwrap();
        let table: FlattenedTable = flattener.written_rows().collect();

        let mut unflattener = Unflattener::new(model).unwrap();
        unflattener.unflatten(&table).unwrap();
        unflattener.into_destination()
    }

    #[test]
    fn test_single_user() {
        let records = unflatten(
            &parse(testdata::user_model()),
            json!([[[101], ["Alice"], ["alice@example.com"]]]),
        );
        assert_eq!(records, json!([{"ID": [101], "Name": ["Alice"], "Email": ["alice@example.com"]}]));
    }

    #[test]
    fn test_repeated_parents_merge() {
        let table = json!([
            [[500], ["Bob"], [30], ["123 Tech Ln"], ["Silicon Valley"], ["94000"], ["Go", "Rust"]],
            [[500], ["Bob"], [30], ["456 Tech Ln"], ["Silicon Valley"], ["94000"], ["Go", "Rust"]],
            [[500], ["Alice"], [100], null, null, null, null],
            [600, "Doe", "35", "123 Tech Ln", "Silicon Valley", "94000", ["HTML", "CSS"]],
            [null, null, null, null, null, null, null]
        ]);
        let records = unflatten(&parse(testdata::employee_model()), table);

        assert_eq!(
            records,
            json!([
                {
                    "ID": [500],
                    "Skills": ["Go", "Rust"],
                    "Profile": [
                        {
                            "Name": ["Bob"],
                            "Age": [30],
                            "Address": [
                                {"Street": ["123 Tech Ln"], "City": ["Silicon Valley"], "ZipCode": ["94000"]},
                                {"Street": ["456 Tech Ln"], "City": ["Silicon Valley"], "ZipCode": ["94000"]}
                            ]
                        },
                        {"Name": ["Alice"], "Age": [100]}
                    ]
                },
                {
                    "ID": [600],
                    "Skills": ["HTML", "CSS"],
                    "Profile": [{
                        "Name": ["Doe"],
                        "Age": ["35"],
                        "Address": [{"Street": ["123 Tech Ln"], "City": ["Silicon Valley"], "ZipCode": ["94000"]}]
                    }]
                }
            ])
        );
    }

    #[test]
    fn test_missing_values_are_not_written() {
        let records = unflatten(
            &parse(testdata::product_model()),
            json!([
                [[1], ["Laptop"], [999.99]],
                [[2], ["Freebie"], []]
            ]),
        );
        assert_eq!(
            records,
            json!([
                {"ID": [1], "Name": ["Laptop"], "Price": [999.99]},
                {"ID": [2], "Name": ["Freebie"]}
            ])
        );
    }

    #[test]
    fn test_rows_without_key_values_are_kept() {
        let records = unflatten(
            &parse(testdata::product_model()),
            json!([
                [[1], ["Laptop"], [999.99]],
                [[], ["Freebie"], [0]],
                [null, ["Sticker"], []]
            ]),
        );
        // Rows with no key share the `nil` signature
        assert_eq!(
            records,
            json!([
                {"ID": [1], "Name": ["Laptop"], "Price": [999.99]},
                {"Name": ["Sticker"], "Price": [0]}
            ])
        );
    }

    #[test]
    fn test_failed_batch_leaves_destination_untouched() {
        let model = parse(testdata::product_model());
        let mut unflattener = Unflattener::new(&model).unwrap().with_destination(json!([null, 5]));

        let result = unflattener.unflatten(&rows(json!([
            [[1], ["Laptop"], [999.99]],
            [[2], ["Mouse"], [25.5]]
        ])));
        assert!(matches!(result, Err(Error::ArgumentInvalid(_))));
        assert_eq!(unflattener.destination(), &json!([null, 5]));

        unflattener.unflatten(&rows(json!([[[1], ["Laptop"], [999.99]]]))).unwrap();
        assert_eq!(
            unflattener.into_destination(),
            json!([{"ID": [1], "Name": ["Laptop"], "Price": [999.99]}, 5])
        );
    }

    #[test]
    fn test_round_trip_three_levels() {
        let model = parse(testdata::employee_model());
        let records = testdata::employee_records();
        assert_eq!(round_trip(&model, &records), records);
    }

    #[test]
    fn test_round_trip_pivots() {
        let mut model = parse(testdata::employee_model());
        with_pivot(&mut model, "Skills", 3);
        with_pivot(&mut model, "Address", 2);

        let records = json!([{
            "ID": [500],
            "Profile": [{
                "Name": ["Bob"],
                "Age": [30],
                "Address": [
                    {"Street": ["123 Tech Ln"], "City": ["Silicon Valley"], "ZipCode": ["94000"]},
                    {"Street": ["456 Tech Ln"], "City": ["Palo Alto"], "ZipCode": ["94301"]}
                ]
            }],
            "Skills": ["Go", "Rust"]
        }]);
        assert_eq!(round_trip(&model, &records), records);
    }

    #[test]
    fn test_batches_accumulate_until_reset() {
        let model = parse(testdata::company_model());
        let mut unflattener = Unflattener::new(&model).unwrap();

        unflattener
            .unflatten(&rows(json!([[["Acme"], [1], ["Ann"], ["ann@acme"]]])))
            .unwrap();
        unflattener
            .unflatten(&rows(json!([[["Acme"], [2], ["Ben"], ["ben@acme"]]])))
            .unwrap();
        assert_eq!(
            unflattener.destination(),
            &json!([{
                "Name": ["Acme"],
                "Employees": [
                    {"ID": [1], "Name": ["Ann"], "Email": ["ann@acme"]},
                    {"ID": [2], "Name": ["Ben"], "Email": ["ben@acme"]}
                ]
            }])
        );

        unflattener.reset();
        assert_eq!(unflattener.destination(), &Value::Null);
        unflattener
            .unflatten(&rows(json!([[["Other"], [], [], []]])))
            .unwrap();
        assert_eq!(unflattener.into_destination(), json!([{"Name": ["Other"]}]));
    }

    #[test]
    fn test_join_symbol_from_config() {
        let config = TableConfig {
            join_symbol: ',',
            ..TableConfig::default()
        };
        let model = parse(testdata::address_model());
        let mut unflattener = Unflattener::from_config(&model, &config).unwrap();
        unflattener
            .unflatten(&rows(json!([
                [["Main"], ["Town"], ["1"]],
                [["Main"], ["Town"], ["1"]],
                [["Main"], ["City"], ["1"]]
            ])))
            .unwrap();
        assert_eq!(unflattener.destination().as_array().map(Vec::len), Some(2));
    }
}
