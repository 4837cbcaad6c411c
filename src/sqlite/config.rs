use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::SqlBridgeError;
use crate::template::SqlCatalog;

use super::engine::SqliteEngine;

/// Name given to the default resource when none is configured.
pub const DEFAULT_RESOURCE_NAME: &str = "default";

/// Path that opens a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Options for the `SQLite` engine.
///
/// Deserializes from JSON such as:
/// ```json
/// {
///   "defaultResource": "main",
///   "resources": { "main": "app.db", "audit": ":memory:" },
///   "initSql": "PRAGMA foreign_keys = ON;",
///   "sqlDir": "sql"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqliteOptions {
    /// Resource used when a request names none.
    #[serde(default = "default_resource_name")]
    pub default_resource: String,
    /// Resource name to database path.
    pub resources: HashMap<String, String>,
    /// Statements run on every newly opened connection.
    #[serde(default)]
    pub init_sql: Option<String>,
    /// Directory of `<group_id>.json` statement files.
    #[serde(default)]
    pub sql_dir: Option<PathBuf>,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_resource_name() -> String {
    DEFAULT_RESOURCE_NAME.to_owned()
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl SqliteOptions {
    /// Options with a single default resource at `db_path`.
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            default_resource: default_resource_name(),
            resources: HashMap::from([(default_resource_name(), db_path.into())]),
            init_sql: None,
            sql_dir: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    /// Read options from a JSON file. A relative `sqlDir` resolves against the file's directory.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::ConfigError` if the file cannot be read, parsed, or validated.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SqlBridgeError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            SqlBridgeError::ConfigError(format!("cannot read config {}: {e}", path.display()))
        })?;
        let mut options = Self::from_json_str(&text)?;

        if let (Some(dir), Some(base)) = (options.sql_dir.as_ref(), path.parent())
            && dir.is_relative()
        {
            options.sql_dir = Some(base.join(dir));
        }
        Ok(options)
    }

    /// Parse options from JSON text.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::ConfigError` if the text is not valid options.
    pub fn from_json_str(text: &str) -> Result<Self, SqlBridgeError> {
        let options: SqliteOptions = serde_json::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    /// Check the options are usable.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::ConfigError` if the default resource has no path or a
    /// resource name is empty.
    pub fn validate(&self) -> Result<(), SqlBridgeError> {
        if !self.resources.contains_key(&self.default_resource) {
            return Err(SqlBridgeError::ConfigError(format!(
                "default resource `{}` has no database path",
                self.default_resource
            )));
        }
        if self.resources.keys().any(String::is_empty) {
            return Err(SqlBridgeError::ConfigError(
                "resource names must not be empty".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub(crate) fn path_of(&self, name: &str) -> Option<&str> {
        self.resources.get(name).map(String::as_str)
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
    catalog: Option<SqlCatalog>,
}

impl SqliteOptionsBuilder {
    /// Start from a default resource at `db_path`.
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
            catalog: None,
        }
    }

    /// Make `name` the default resource.
    ///
    /// If `name` is not registered yet, the current default's path moves to it. A path already
    /// registered for `name` wins and the previous default stays as an ordinary resource.
    #[must_use]
    pub fn default_resource(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.opts.resources.contains_key(&name) {
            if let Some(path) = self.opts.resources.remove(&self.opts.default_resource) {
                self.opts.resources.insert(name.clone(), path);
            }
        }
        self.opts.default_resource = name;
        self
    }

    /// Add a named resource.
    #[must_use]
    pub fn resource(mut self, name: impl Into<String>, db_path: impl Into<String>) -> Self {
        self.opts.resources.insert(name.into(), db_path.into());
        self
    }

    #[must_use]
    pub fn init_sql(mut self, sql: impl Into<String>) -> Self {
        self.opts.init_sql = Some(sql.into());
        self
    }

    #[must_use]
    pub fn sql_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.opts.sql_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Use an in-code catalog instead of (or on top of) `sql_dir`.
    #[must_use]
    pub fn catalog(mut self, catalog: SqlCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build the engine. Nothing is opened until a resource is first used.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::ConfigError` if the options are invalid or `sql_dir` cannot be
    /// loaded.
    pub fn build(self) -> Result<SqliteEngine, SqlBridgeError> {
        match self.catalog {
            Some(catalog) => SqliteEngine::with_catalog(self.opts, catalog),
            None => SqliteEngine::new(self.opts),
        }
    }
}
