//! Property names used by metadata models

/// Schema path of a field or group, e.g. `$.GroupFields[*].Profile`
pub const FIELD_GROUP_JSON_PATH_KEY: &str = "FieldGroupJsonPathKey";
pub const FIELD_GROUP_NAME: &str = "FieldGroupName";
pub const FIELD_GROUP_DESCRIPTION: &str = "FieldGroupDescription";
pub const FIELD_GROUP_IS_PRIMARY_KEY: &str = "FieldGroupIsPrimaryKey";
pub const FIELD_GROUP_VIEW_DISABLE: &str = "FieldGroupViewDisable";
pub const FIELD_GROUP_MAX_ENTRIES: &str = "FieldGroupMaxEntries";

/// Pivot switch; only honoured together with a positive maximum
pub const FIELD_GROUP_VIEW_VALUES_IN_SEPARATE_COLUMNS: &str = "FieldGroupViewValuesInSeparateColumns";
pub const FIELD_GROUP_VIEW_MAX_NO_OF_VALUES_IN_SEPARATE_COLUMNS: &str =
    "FieldGroupViewMaxNoOfValuesInSeparateColumns";
/// Header template for pivot columns; `[*]` becomes the 1-based column number
pub const FIELD_VIEW_VALUES_IN_SEPARATE_COLUMNS_HEADER_FORMAT: &str =
    "FieldViewValuesInSeparateColumnsHeaderFormat";
pub const FIELD_VIEW_VALUES_IN_SEPARATE_COLUMNS_HEADER_INDEX: &str =
    "FieldViewValuesInSeparateColumnsHeaderIndex";

pub const FIELD_DATA_TYPE: &str = "FieldDataType";
pub const FIELD_UI: &str = "FieldUi";

/// Reposition directive: `{FieldGroupJsonPathKey, FieldGroupPositionBefore}`
pub const FIELD_COLUMN_POSITION: &str = "FieldColumnPosition";
pub const FIELD_GROUP_POSITION_BEFORE: &str = "FieldGroupPositionBefore";

pub const GROUP_EXTRACT_AS_SINGLE_FIELD: &str = "GroupExtractAsSingleField";
pub const GROUP_READ_ORDER_OF_FIELDS: &str = "GroupReadOrderOfFields";
pub const GROUP_FIELDS: &str = "GroupFields";

pub const DATABASE_TABLE_COLLECTION_UID: &str = "DatabaseTableCollectionUid";
pub const DATABASE_TABLE_COLLECTION_NAME: &str = "DatabaseTableCollectionName";
pub const DATABASE_FIELD_COLUMN_NAME: &str = "DatabaseFieldColumnName";
pub const DATABASE_JOIN_DEPTH: &str = "DatabaseJoinDepth";

/// Wildcard array index in schema paths
pub const ARRAY_PATH_PLACEHOLDER: &str = "[*]";
/// Appended to a group path to address one of its children
pub const GROUP_JSON_PATH_PREFIX: &str = ".GroupFields[*].";
pub const JSON_PATH_ROOT: &str = "$";

pub const FIELD_TYPE_TEXT: &str = "Text";
pub const FIELD_TYPE_NUMBER: &str = "Number";
pub const FIELD_TYPE_BOOLEAN: &str = "Boolean";
pub const FIELD_TYPE_TIMESTAMP: &str = "Timestamp";
pub const FIELD_TYPE_ANY: &str = "Any";

pub const FIELD_UI_TEXT: &str = "Text";
pub const FIELD_UI_TEXT_AREA: &str = "TextArea";
pub const FIELD_UI_NUMBER: &str = "Number";
pub const FIELD_UI_CHECKBOX: &str = "Checkbox";
pub const FIELD_UI_SELECT: &str = "Select";
pub const FIELD_UI_DATETIME: &str = "DateTime";
