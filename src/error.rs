use thiserror::Error;

/// Errors raised while resolving paths, extracting columns, flattening or unflattening.
#[derive(Debug, Error)]
pub enum Error {
    /// A value had the wrong dynamic shape for the requested action
    #[error("invalid argument: {0}")]
    ArgumentInvalid(String),

    /// Path resolution left `[*]` placeholders behind
    #[error("path '{path}' still contains index placeholders after resolving {supplied} index(es)")]
    PathPlaceholderRemaining { path: String, supplied: usize },

    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    #[error("duplicate column identity '{0}'")]
    DuplicateColumnIdentity(String),

    /// A group produced zero columns during conversion
    #[error("group '{0}' has no extractable columns")]
    NoExtractableColumns(String),

    #[error("field '{0}' has no DatabaseFieldColumnName")]
    MissingColumnName(String),

    /// Group-fields of a metadata model are structurally invalid
    #[error("invalid group '{path}': {reason}")]
    InvalidGroup { path: String, reason: String },

    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_group(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidGroup {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
