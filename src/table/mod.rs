//! Object graphs to tables and back
//!
//! - [`Flattener`]: records to rows, exploding one-to-many groups into a Cartesian product
//! - [`Unflattener`]: rows back to records, merging rows that share group signatures
//! - [`TableWriter`]: JSON Lines output of a written table

pub mod flattener;
pub mod index;
pub mod unflattener;
pub mod writer;

pub use flattener::Flattener;
pub use index::{GroupCollection, GroupIndexNode, Signature};
pub use unflattener::Unflattener;
pub use writer::TableWriter;

use crate::columns::{ColumnFields, Extraction};
use crate::error::Result;
use crate::model::MetadataNode;
use crate::types::TableConfig;

/// Extract the columns of `model` and apply reposition and skip as configured
pub fn extract_columns(model: &MetadataNode, config: &TableConfig) -> Result<ColumnFields> {
    let mut columns = Extraction::new(model)
        .with_skip(config.nested_skip_match())
        .with_add(config.nested_add_match())
        .extract()?;
    if config.reposition {
        columns.reposition()?;
    }
    columns.skip(&config.skip_match(), &config.add_match());
    Ok(columns)
}
