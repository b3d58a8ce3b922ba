//! Instance bookkeeping for unflattening
//!
//! Every group instance written to the destination is remembered under the
//! signature of the row that created it. Rows carrying the same signature under
//! the same parent instance land in the same array slot.

use crate::types::FlattenedRow;
use serde_json::Value;
use std::collections::HashMap;

const ABSENT: &str = "nil";

/// Builds the identity string of a group instance from selected row cells
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    join_symbol: char,
}

impl Default for Signature {
    fn default() -> Self {
        Signature { join_symbol: '|' }
    }
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_join_symbol(mut self, join_symbol: char) -> Self {
        self.join_symbol = join_symbol;
        self
    }

    /// Join the cells at `columns`; absent, null and empty cells render as `nil`
    pub fn generate(&self, row: &FlattenedRow, columns: &[usize]) -> String {
        let mut signature = String::with_capacity(columns.len() * 16);

        for (position, &column) in columns.iter().enumerate() {
            if position > 0 {
                signature.push(self.join_symbol);
            }
            match row.get(column).and_then(cell_value) {
                Some(value) => push_value(&mut signature, value),
                None => signature.push_str(ABSENT),
            }
        }

        signature
    }
}

/// The value a cell carries, unwrapping single-element arrays
fn cell_value(cell: &Value) -> Option<&Value> {
    match cell {
        Value::Null => None,
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) if items.len() == 1 => cell_value(&items[0]),
        Value::String(text) if text.is_empty() => None,
        other => Some(other),
    }
}

fn push_value(signature: &mut String, value: &Value) {
    match value {
        Value::String(text) => signature.push_str(text),
        Value::Number(number) => signature.push_str(&number.to_string()),
        Value::Bool(true) => signature.push('t'),
        Value::Bool(false) => signature.push('f'),
        other => signature.push_str(&other.to_string()),
    }
}

/// The instances of one group below one parent instance, keyed by signature
#[derive(Debug, Clone, Default)]
pub struct GroupCollection {
    next_index: usize,
    instances: HashMap<String, GroupIndexNode>,
}

impl GroupCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// The instance for `signature`, created with the next free index if unseen
    pub fn get_or_create_instance(&mut self, signature: String) -> (&mut GroupIndexNode, usize) {
        let next_index = &mut self.next_index;
        let node = self.instances.entry(signature).or_insert_with(|| {
            let node = GroupIndexNode::new(*next_index);
            *next_index += 1;
            node
        });
        let index = node.index;
        (node, index)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn clear(&mut self) {
        self.next_index = 0;
        self.instances.clear();
    }
}

/// One written group instance and the collections of its nested groups
#[derive(Debug, Clone)]
pub struct GroupIndexNode {
    index: usize,
    groups: HashMap<String, GroupCollection>,
}

impl GroupIndexNode {
    fn new(index: usize) -> Self {
        GroupIndexNode {
            index,
            groups: HashMap::new(),
        }
    }

    /// Position of the instance in its destination array
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get_or_create_group(&mut self, suffix: &str) -> &mut GroupCollection {
        self.groups.entry(suffix.to_string()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(cells: Value) -> FlattenedRow {
        match cells {
            Value::Array(cells) => cells,
            other => vec![other],
        }
    }

    #[test]
    fn test_signature_of_primitive_cells() {
        let row = row(json!([[500], ["Bob"], [true], [2.5], "raw"]));
        let signature = Signature::new();
        assert_eq!(signature.generate(&row, &[0, 1]), "500|Bob");
        assert_eq!(signature.generate(&row, &[2, 3, 4]), "t|2.5|raw");
        assert_eq!(signature.generate(&row, &[]), "");
    }

    #[test]
    fn test_signature_of_composite_cells() {
        let row = row(json!([["Go", "Rust"], [{"a": 1}]]));
        let signature = Signature::new().with_join_symbol(',');
        assert_eq!(
            signature.generate(&row, &[0, 1]),
            r#"["Go","Rust"],{"a":1}"#
        );
    }

    #[test]
    fn test_signature_with_absent_cells() {
        let row = row(json!([[1], null, [], [""]]));
        let signature = Signature::new();
        assert_eq!(signature.generate(&row, &[0, 1, 2, 9]), "1|nil|nil|nil");
        assert_eq!(signature.generate(&row, &[1, 2, 3, 9]), "nil|nil|nil|nil");
    }

    #[test]
    fn test_instances_are_stable() {
        let mut collection = GroupCollection::new();
        assert_eq!(collection.get_or_create_instance("a".into()).1, 0);
        assert_eq!(collection.get_or_create_instance("b".into()).1, 1);
        assert_eq!(collection.get_or_create_instance("a".into()).1, 0);
        assert_eq!(collection.len(), 2);

        collection.clear();
        assert!(collection.is_empty());
        assert_eq!(collection.get_or_create_instance("b".into()).1, 0);
    }

    #[test]
    fn test_nested_collections_are_per_instance() {
        let mut root = GroupCollection::new();
        {
            let (first, _) = root.get_or_create_instance("1".into());
            let addresses = first.get_or_create_group("Address");
            addresses.get_or_create_instance("home".into());
            addresses.get_or_create_instance("work".into());
        }
        let (second, index) = root.get_or_create_instance("2".into());
        assert_eq!(index, 1);
        let (_, address_index) = second.get_or_create_group("Address").get_or_create_instance("work".into());
        assert_eq!(address_index, 0);
    }
}
