//! # Metaflat - metadata-driven flattening
//!
//! Converts nested records into flat tables and back, driven by a metadata model
//! that describes the record's fields and groups.
//!
//! ## Modules
//!
//! - **model**: the metadata tree, path resolution and property matching
//! - **columns**: physical columns extracted from a model, with reposition and skip
//! - **table**: `Flattener`, `Unflattener` and the JSON Lines `TableWriter`
//! - **database**: per-table column selection and value access by column name
//! - **object**: path-addressable access to `serde_json::Value`
//!
//! ## Quick Start
//!
//! ```rust
//! use metaflat::{Flattener, MetadataNode, Unflattener};
//! use serde_json::json;
//!
//! # fn main() -> metaflat::Result<()> {
//! let model = MetadataNode::from_value(&json!({
//!     "FieldGroupJsonPathKey": "$",
//!     "GroupFields": [{
//!         "ID": {"FieldGroupJsonPathKey": "$.GroupFields[*].ID", "FieldGroupIsPrimaryKey": true},
//!         "Tags": {
//!             "FieldGroupJsonPathKey": "$.GroupFields[*].Tags",
//!             "GroupFields": [{"Tag": {"FieldGroupJsonPathKey": "$.GroupFields[*].Tags.GroupFields[*].Tag"}}],
//!             "GroupReadOrderOfFields": ["Tag"]
//!         }
//!     }],
//!     "GroupReadOrderOfFields": ["ID", "Tags"]
//! }))?;
//!
//! let record = json!({"ID": [1], "Tags": [{"Tag": ["a"]}, {"Tag": ["b"]}]});
//!
//! let mut flattener = Flattener::new(&model)?;
//! flattener.flatten(&record)?;
//! // One row per tag: [[1], ["a"]] and [[1], ["b"]]
//! let rows: Vec<_> = flattener.written_rows().collect();
//! assert_eq!(rows.len(), 2);
//!
//! let mut unflattener = Unflattener::new(&model)?;
//! unflattener.unflatten(&rows)?;
//! assert_eq!(unflattener.into_destination(), json!([record]));
//! # Ok(())
//! # }
//! ```

use anyhow::Context;
use serde_json::Value;
use std::io::{BufRead, Write};

pub mod columns;
pub mod database;
pub mod error;
pub mod model;
pub mod object;
pub mod table;
pub mod types;

#[cfg(test)]
pub(crate) mod testdata;

// Re-export commonly used types for convenience
pub use columns::{ColumnField, ColumnFields, ColumnPosition, Extraction, GroupColumnIndexes};
pub use database::{DatabaseColumns, FieldValue};
pub use error::{Error, Result};
pub use model::{JsonPathToValue, MetadataNode, PropertiesMatch};
pub use object::ValueAccessor;
pub use table::{Flattener, Signature, TableWriter, Unflattener};
pub use types::{Cell, FlattenedRow, FlattenedTable, TableConfig};

/// Flatten a JSON Lines stream of records (or arrays of records) into `writer`,
/// returning the number of rows written
pub fn flatten_json<R: BufRead, W: Write>(
    reader: R,
    writer: &mut TableWriter<W>,
    flattener: &mut Flattener,
) -> anyhow::Result<usize> {
    let mut written = 0;

    for (number, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read line")?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse JSON on line {}", number + 1))?;

        written += flattener
            .flatten(&value)
            .with_context(|| format!("Failed to flatten line {}", number + 1))?;
        writer.write_rows(flattener.written_rows())?;
        flattener.reset();
    }

    Ok(written)
}

/// Merge a JSON Lines stream of rows (one JSON array per line) into `unflattener`,
/// returning the number of rows read
pub fn unflatten_json<R: BufRead>(reader: R, unflattener: &mut Unflattener) -> anyhow::Result<usize> {
    let mut rows = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read line")?;
        if line.trim().is_empty() {
            continue;
        }
        let row: FlattenedRow = serde_json::from_str(&line)
            .with_context(|| format!("Line {} is not a JSON array of cells", number + 1))?;
        rows.push(row);
    }

    unflattener.unflatten(&rows).context("Failed to unflatten rows")?;
    Ok(rows.len())
}
