//! Metadata models shared by the unit tests
//!
//! Every model can be nested under a parent by passing a [`Root`] with the parent's
//! child path, table and join depth, the same way a model is reused in a larger one.

use crate::model::{keys, MetadataNode};
use serde_json::{json, Map, Value};

pub(crate) struct Root {
    path: String,
    table: Option<String>,
    join_depth: u64,
}

impl Root {
    pub(crate) fn top() -> Self {
        Root {
            path: keys::JSON_PATH_ROOT.to_string(),
            table: None,
            join_depth: 0,
        }
    }

    fn nested(parent: &str, suffix: &str, table: &str, join_depth: u64) -> Self {
        Root {
            path: format!("{}{}{}", parent, keys::GROUP_JSON_PATH_PREFIX, suffix),
            table: Some(table.to_string()),
            join_depth,
        }
    }
}

struct Column {
    name: &'static str,
    data_type: &'static str,
    ui: &'static str,
    primary_key: bool,
}

const fn column(name: &'static str, data_type: &'static str, ui: &'static str) -> Column {
    Column {
        name,
        data_type,
        ui,
        primary_key: false,
    }
}

const fn key_column(name: &'static str, data_type: &'static str, ui: &'static str) -> Column {
    Column {
        name,
        data_type,
        ui,
        primary_key: true,
    }
}

const TEXT: (&str, &str) = (keys::FIELD_TYPE_TEXT, keys::FIELD_UI_TEXT);
const NUMBER: (&str, &str) = (keys::FIELD_TYPE_NUMBER, keys::FIELD_UI_NUMBER);

fn entity(root: &Root, default_name: &str, columns: &[Column], nested: Vec<(&str, usize, Value)>) -> Value {
    let table = root.table.clone().unwrap_or_else(|| default_name.to_string());

    let mut fields = Map::new();
    let mut order: Vec<(usize, String)> = Vec::new();
    for (position, col) in columns.iter().enumerate() {
        let mut field = json!({
            keys::FIELD_GROUP_JSON_PATH_KEY: format!("{}{}{}", root.path, keys::GROUP_JSON_PATH_PREFIX, col.name),
            keys::FIELD_GROUP_NAME: col.name,
            keys::FIELD_DATA_TYPE: col.data_type,
            keys::FIELD_UI: col.ui,
            keys::DATABASE_TABLE_COLLECTION_UID: table,
            keys::DATABASE_TABLE_COLLECTION_NAME: table,
            keys::DATABASE_JOIN_DEPTH: root.join_depth,
            keys::DATABASE_FIELD_COLUMN_NAME: col.name,
        });
        if col.primary_key {
            field[keys::FIELD_GROUP_IS_PRIMARY_KEY] = json!(true);
        }
        fields.insert(col.name.to_string(), field);
        order.push((position * 2, col.name.to_string()));
    }
    // Nested groups slot in before the column at `position`
    for (suffix, position, model) in nested {
        fields.insert(suffix.to_string(), model);
        order.push((position * 2 - 1, suffix.to_string()));
    }
    order.sort();

    json!({
        keys::FIELD_GROUP_JSON_PATH_KEY: root.path,
        keys::FIELD_GROUP_NAME: default_name,
        keys::DATABASE_TABLE_COLLECTION_UID: table,
        keys::DATABASE_TABLE_COLLECTION_NAME: table,
        keys::DATABASE_JOIN_DEPTH: root.join_depth,
        keys::GROUP_FIELDS: [Value::Object(fields)],
        keys::GROUP_READ_ORDER_OF_FIELDS: order.into_iter().map(|(_, suffix)| suffix).collect::<Vec<_>>(),
    })
}

/// ID (primary key), Name, Email
pub(crate) fn user_model() -> Value {
    user_model_at(&Root::top())
}

fn user_model_at(root: &Root) -> Value {
    entity(
        root,
        "User",
        &[
            key_column("ID", NUMBER.0, NUMBER.1),
            column("Name", TEXT.0, TEXT.1),
            column("Email", TEXT.0, TEXT.1),
        ],
        vec![],
    )
}

/// ID (primary key), Name, Price
pub(crate) fn product_model() -> Value {
    entity(
        &Root::top(),
        "Product",
        &[
            key_column("ID", NUMBER.0, NUMBER.1),
            column("Name", TEXT.0, TEXT.1),
            column("Price", NUMBER.0, NUMBER.1),
        ],
        vec![],
    )
}

/// Name (primary key), Employees (a nested user model)
pub(crate) fn company_model() -> Value {
    let root = Root::top();
    let employees = user_model_at(&Root::nested(&root.path, "Employees", "Employees", 1));
    entity(&root, "Company", &[key_column("Name", TEXT.0, TEXT.1)], vec![("Employees", 1, employees)])
}

/// Street, City, ZipCode
pub(crate) fn address_model() -> Value {
    address_model_at(&Root::top())
}

fn address_model_at(root: &Root) -> Value {
    entity(
        root,
        "Address",
        &[
            column("Street", TEXT.0, TEXT.1),
            column("City", TEXT.0, TEXT.1),
            column("ZipCode", TEXT.0, TEXT.1),
        ],
        vec![],
    )
}

/// Name (primary key), Age, Address (a nested address model on the same table depth)
pub(crate) fn user_profile_model() -> Value {
    user_profile_model_at(&Root::top())
}

fn user_profile_model_at(root: &Root) -> Value {
    let address = address_model_at(&Root::nested(&root.path, "Address", "UserProfile", root.join_depth));
    entity(
        root,
        "UserProfile",
        &[key_column("Name", TEXT.0, TEXT.1), column("Age", NUMBER.0, NUMBER.1)],
        vec![("Address", 2, address)],
    )
}

/// ID (primary key), Profile (a nested user profile model), Skills
pub(crate) fn employee_model() -> Value {
    let root = Root::top();
    let profile = user_profile_model_at(&Root::nested(&root.path, "Profile", "Profile", 1));
    entity(
        &root,
        "Employee",
        &[key_column("ID", NUMBER.0, NUMBER.1), column("Skills", TEXT.0, TEXT.1)],
        vec![("Profile", 1, profile)],
    )
}

pub(crate) fn parse(model: Value) -> MetadataNode {
    MetadataNode::from_value(&model).unwrap()
}

/// Set `key` on every node whose `FieldGroupName` is `name`, the root included
pub(crate) fn with_property(model: &mut MetadataNode, name: &str, key: &str, value: Value) {
    let matches = |node: &MetadataNode| node.properties().get(keys::FIELD_GROUP_NAME) == Some(&json!(name));
    if matches(model) {
        model.properties_mut().insert(key.to_string(), value.clone());
    }
    if let MetadataNode::Group(group) = model {
        crate::model::map(group, |_, node| {
            if matches(node) {
                node.properties_mut().insert(key.to_string(), value.clone());
            }
            crate::model::Visit::Continue
        });
    }
}

/// Turn `name` into a pivot of `max` columns
pub(crate) fn with_pivot(model: &mut MetadataNode, name: &str, max: usize) {
    with_property(model, name, keys::FIELD_GROUP_VIEW_VALUES_IN_SEPARATE_COLUMNS, json!(true));
    with_property(model, name, keys::FIELD_GROUP_VIEW_MAX_NO_OF_VALUES_IN_SEPARATE_COLUMNS, json!(max));
}

/// One employee with one profile at one address
pub(crate) fn employee_record() -> Value {
    json!({
        "ID": [500],
        "Profile": [{
            "Name": ["Bob"],
            "Age": [30],
            "Address": [{"Street": ["123 Tech Ln"], "City": ["Silicon Valley"], "ZipCode": ["94000"]}]
        }],
        "Skills": ["Go", "Rust"]
    })
}

/// Two employees: the first has one profile at two addresses, the second two profiles at one address each
pub(crate) fn employee_records() -> Value {
    json!([
        {
            "ID": [100],
            "Skills": ["Go"],
            "Profile": [{
                "Name": ["Dev"],
                "Age": [30],
                "Address": [
                    {"Street": ["Home St"], "City": ["Nairobi"], "ZipCode": ["00100"]},
                    {"Street": ["Work Ave"], "City": ["Westlands"], "ZipCode": ["00200"]}
                ]
            }]
        },
        {
            "ID": [200],
            "Skills": ["Management"],
            "Profile": [
                {
                    "Name": ["Admin"],
                    "Age": [45],
                    "Address": [{"Street": ["HQ Blvd"], "City": ["Mombasa"], "ZipCode": ["80100"]}]
                },
                {
                    "Name": ["Consultant"],
                    "Age": [50],
                    "Address": [{"Street": ["Remote Ln"], "City": ["Kisumu"], "ZipCode": ["40100"]}]
                }
            ]
        }
    ])
}

pub(crate) fn product_records() -> Value {
    json!([
        {"ID": [1], "Name": ["Laptop"], "Price": [999.99]},
        {"ID": [2], "Name": ["Mouse"], "Price": [25.5]}
    ])
}
