use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlBridgeError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter binding error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Row mapping error: {0}")]
    MappingError(String),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Unknown statement: group `{group_id}`, sql `{sql_id}`")]
    UnknownStatement { group_id: String, sql_id: String },

    #[error("Resource `{0}` already has an open cursor")]
    CursorAlreadyOpen(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for SqlBridgeError {
    fn from(err: serde_json::Error) -> Self {
        SqlBridgeError::ConfigError(format!("invalid JSON: {err}"))
    }
}
