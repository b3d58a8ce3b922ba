use crate::columns::{ColumnFields, ColumnPosition, PositionDirective, RepositionDirective};
use crate::error::{Error, Result};
use crate::model::{display_name, keys, pivot_columns, GroupNode, MetadataNode, Properties, PropertiesExt, PropertiesMatch};
use serde_json::Value;
use std::sync::Arc;

/// Turns a metadata model into [`ColumnFields`].
///
/// `skip` and `add` do not filter anything here: the properties they match on a node
/// are inherited by every column below it, so a flag set once on a group can later
/// drive [`ColumnFields::skip`] for all of the group's fields.
pub struct Extraction<'a> {
    model: &'a MetadataNode,
    skip: PropertiesMatch,
    add: PropertiesMatch,
}

impl<'a> Extraction<'a> {
    pub fn new(model: &'a MetadataNode) -> Self {
        Extraction {
            model,
            skip: PropertiesMatch::new(),
            add: PropertiesMatch::new(),
        }
    }

    pub fn with_skip(mut self, skip: PropertiesMatch) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_add(mut self, add: PropertiesMatch) -> Self {
        self.add = add;
        self
    }

    pub fn extract(&self) -> Result<ColumnFields> {
        let root = self
            .model
            .as_group()
            .ok_or_else(|| Error::invalid_group(self.model.path(), "metadata model root is not a group"))?;

        let mut columns = ColumnFields::new();
        self.extract_group(root, &Properties::new(), None, &mut columns)?;

        tracing::debug!(
            columns = columns.len(),
            directives = columns.reposition_directives().len(),
            "columns extracted"
        );
        Ok(columns)
    }

    /// `chain` is the reposition directive in effect for the group's columns, if any.
    /// It is retargeted after every emitted column so the columns move as one block.
    fn extract_group(
        &self,
        group: &GroupNode,
        inherited: &Properties,
        mut chain: Option<&mut PositionDirective>,
        columns: &mut ColumnFields,
    ) -> Result<()> {
        for (_, node) in group.children() {
            let mut matching = inherited.clone();
            if self.add.is_valid() {
                matching.extend(self.add.matching_props(node.properties()));
            }
            if self.skip.is_valid() {
                matching.extend(self.skip.matching_props(node.properties()));
            }

            let mut own = PositionDirective::from_properties(node.properties());
            let next = match own.as_mut() {
                Some(directive) => Some(directive),
                None => chain.as_deref_mut(),
            };

            match node {
                MetadataNode::Group(child) if !child.extract_as_single_field() => match child.flat_pivot_columns() {
                    Some(max) => self.emit_group_pivot(child, max, &matching, next, columns)?,
                    None => self.extract_group(child, &matching, next, columns)?,
                },
                _ => self.emit_field(node, &matching, next, columns)?,
            }
        }
        Ok(())
    }

    fn emit_field(
        &self,
        node: &MetadataNode,
        matching: &Properties,
        mut chain: Option<&mut PositionDirective>,
        columns: &mut ColumnFields,
    ) -> Result<()> {
        let path = node.path();
        match pivot_columns(node.properties()) {
            Some(max) => {
                for index in 0..max {
                    let properties = pivot_properties(node.properties(), matching, index);
                    append(columns, ColumnPosition::field_pivot(path, index), properties, chain.as_deref_mut())?;
                }
                Ok(())
            }
            None => append(
                columns,
                ColumnPosition::field(path),
                merge(node.properties(), matching),
                chain,
            ),
        }
    }

    /// Entry by entry: every child of entry 0, then every child of entry 1, ...
    fn emit_group_pivot(
        &self,
        group: &GroupNode,
        max: usize,
        matching: &Properties,
        mut chain: Option<&mut PositionDirective>,
        columns: &mut ColumnFields,
    ) -> Result<()> {
        for index in 0..max {
            for (suffix, child) in group.children() {
                let properties = pivot_properties(child.properties(), matching, index);
                let position = ColumnPosition::group_pivot(child.path(), &group.path, suffix, index);
                append(columns, position, properties, chain.as_deref_mut())?;
            }
        }
        Ok(())
    }
}

fn append(
    columns: &mut ColumnFields,
    position: ColumnPosition,
    properties: Arc<Properties>,
    chain: Option<&mut PositionDirective>,
) -> Result<()> {
    let index = columns.push(position.clone(), properties)?;
    if let Some(directive) = chain {
        columns.queue_reposition(RepositionDirective {
            source_index: index,
            target: directive.target.clone(),
            before: directive.before,
        });
        directive.target = position;
        directive.before = false;
    }
    Ok(())
}

/// Shares the node's properties unless something has to be merged in
fn merge(base: &Arc<Properties>, overlay: &Properties) -> Arc<Properties> {
    if overlay.is_empty() {
        return Arc::clone(base);
    }
    let mut merged = (**base).clone();
    merged.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    Arc::new(merged)
}

fn pivot_properties(base: &Arc<Properties>, overlay: &Properties, index: usize) -> Arc<Properties> {
    let mut properties = merge(base, overlay);
    let column = Arc::make_mut(&mut properties);
    column.insert(
        keys::FIELD_VIEW_VALUES_IN_SEPARATE_COLUMNS_HEADER_INDEX.to_string(),
        Value::from(index),
    );
    let name = match column
        .text(keys::FIELD_VIEW_VALUES_IN_SEPARATE_COLUMNS_HEADER_FORMAT)
        .filter(|format| !format.is_empty())
    {
        Some(format) => format.replace(keys::ARRAY_PATH_PLACEHOLDER, &(index + 1).to_string()),
        None => format!("{} {}", display_name(column), index + 1),
    };
    column.insert(keys::FIELD_GROUP_NAME.to_string(), Value::String(name));
    properties
}
