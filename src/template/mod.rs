//! Catalog of SQL statements addressed by `(group_id, sql_id)`.
//!
//! A catalog is filled in code or loaded from a directory holding one `<group_id>.json` file
//! per group, each an object mapping `sql_id` to SQL text:
//! ```json
//! { "BY_ID": "SELECT id, name FROM users WHERE id = :id" }
//! ```

mod compile;
mod parsers;
mod scanner;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub use compile::CompiledSql;

use crate::error::SqlBridgeError;

#[derive(Debug, Clone, Default)]
pub struct SqlCatalog {
    groups: HashMap<String, HashMap<String, CompiledSql>>,
}

impl SqlCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one statement.
    pub fn insert(
        &mut self,
        group_id: impl Into<String>,
        sql_id: impl Into<String>,
        sql: &str,
    ) -> &mut Self {
        self.groups
            .entry(group_id.into())
            .or_default()
            .insert(sql_id.into(), CompiledSql::compile(sql));
        self
    }

    /// Builder form of [`SqlCatalog::insert`].
    #[must_use]
    pub fn with_statement(
        mut self,
        group_id: impl Into<String>,
        sql_id: impl Into<String>,
        sql: &str,
    ) -> Self {
        self.insert(group_id, sql_id, sql);
        self
    }

    /// Look up a statement.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::UnknownStatement` if the group or the statement is missing.
    pub fn get(&self, group_id: &str, sql_id: &str) -> Result<&CompiledSql, SqlBridgeError> {
        self.groups
            .get(group_id)
            .and_then(|group| group.get(sql_id))
            .ok_or_else(|| SqlBridgeError::UnknownStatement {
                group_id: group_id.to_owned(),
                sql_id: sql_id.to_owned(),
            })
    }

    /// Move every statement of `other` into this catalog, replacing same-id statements.
    pub fn merge(&mut self, other: SqlCatalog) -> &mut Self {
        for (group_id, statements) in other.groups {
            self.groups.entry(group_id).or_default().extend(statements);
        }
        self
    }

    #[must_use]
    pub fn contains(&self, group_id: &str, sql_id: &str) -> bool {
        self.get(group_id, sql_id).is_ok()
    }

    /// Number of statements across all groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load every `*.json` file in `dir` as a group named after the file stem.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::ConfigError` if the directory or a file cannot be read or a file
    /// is not a JSON object of strings.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, SqlBridgeError> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| {
            SqlBridgeError::ConfigError(format!("cannot read SQL directory {}: {e}", dir.display()))
        })?;

        let mut catalog = SqlCatalog::new();
        for entry in entries {
            let path = entry
                .map_err(|e| {
                    SqlBridgeError::ConfigError(format!(
                        "cannot list SQL directory {}: {e}",
                        dir.display()
                    ))
                })?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(group_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            catalog.load_group_file(group_id.to_owned(), &path)?;
        }

        tracing::debug!(dir = %dir.display(), statements = catalog.len(), "loaded SQL catalog");
        Ok(catalog)
    }

    /// Load one group from a JSON file, replacing statements with the same ids.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::ConfigError` if the file cannot be read or parsed.
    pub fn load_group_file(
        &mut self,
        group_id: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<&mut Self, SqlBridgeError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            SqlBridgeError::ConfigError(format!("cannot read SQL file {}: {e}", path.display()))
        })?;
        let statements: HashMap<String, String> = serde_json::from_str(&text).map_err(|e| {
            SqlBridgeError::ConfigError(format!("invalid SQL file {}: {e}", path.display()))
        })?;

        let group_id = group_id.into();
        for (sql_id, sql) in statements {
            self.insert(group_id.clone(), sql_id, &sql);
        }
        Ok(self)
    }
}
