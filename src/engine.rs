//! The contract the bridge needs from the SQL engine and its resource registry.

use crate::error::SqlBridgeError;
use crate::params::DriverParams;
use crate::results::Cursor;
use crate::types::ResourceId;

/// Where a statement's SQL comes from.
#[derive(Debug, Clone, Copy)]
pub enum Statement<'a> {
    /// A catalogued statement, resolved by the engine from `(group_id, sql_id)`.
    Template {
        group_id: &'a str,
        sql_id: &'a str,
        params: &'a DriverParams,
    },
    /// SQL text run as given.
    Raw { sql: &'a str },
}

impl Statement<'_> {
    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Statement::Template {
                group_id, sql_id, ..
            } => format!("{group_id}.{sql_id}"),
            Statement::Raw { sql } => {
                let trimmed = sql.trim();
                match trimmed.char_indices().nth(60) {
                    Some((idx, _)) => format!("{}...", &trimmed[..idx]),
                    None => trimmed.to_owned(),
                }
            }
        }
    }
}

/// SQL execution engine plus the registry of named resources it runs against.
///
/// Every method addresses a resource by name, `None` meaning the registry's default resource.
/// Resources may be opened lazily on first use. Implementations own all locking; the bridge
/// calls these methods from a single thread per request and holds no resource state itself.
///
/// A resource runs one statement at a time: after `query` hands out a cursor, the resource
/// counts as busy until `close_open_cursor` is called for it.
pub trait SqlEngine {
    /// Open (or confirm) a resource. Calling it for an already-open resource is a no-op.
    ///
    /// # Errors
    /// Returns `SqlBridgeError` if the resource is unknown or cannot be connected.
    fn open(&self, resource: Option<&ResourceId>) -> Result<(), SqlBridgeError>;

    /// Run a statement that produces rows.
    ///
    /// # Errors
    /// Returns `SqlBridgeError` if the resource or statement cannot be resolved, or the driver fails.
    fn query(
        &self,
        resource: Option<&ResourceId>,
        statement: Statement<'_>,
    ) -> Result<Box<dyn Cursor>, SqlBridgeError>;

    /// Run a data-modifying statement, returning the affected-row count.
    ///
    /// # Errors
    /// Returns `SqlBridgeError` if the resource or statement cannot be resolved, or the driver fails.
    fn update(
        &self,
        resource: Option<&ResourceId>,
        statement: Statement<'_>,
    ) -> Result<usize, SqlBridgeError>;

    /// Run any statement (DDL included), discarding its outcome.
    ///
    /// # Errors
    /// Returns `SqlBridgeError` if the resource or statement cannot be resolved, or the driver fails.
    fn execute(
        &self,
        resource: Option<&ResourceId>,
        statement: Statement<'_>,
    ) -> Result<(), SqlBridgeError>;

    /// Clear the resource's open-cursor state so it can take the next statement.
    ///
    /// # Errors
    /// Returns `SqlBridgeError` if the resource is unknown.
    fn close_open_cursor(&self, resource: Option<&ResourceId>) -> Result<(), SqlBridgeError>;

    /// Commit the resource's current unit of work.
    ///
    /// # Errors
    /// Returns `SqlBridgeError` if the resource is unknown or the commit fails.
    fn commit(&self, resource: Option<&ResourceId>) -> Result<(), SqlBridgeError>;

    /// Roll back the resource's current unit of work.
    ///
    /// # Errors
    /// Returns `SqlBridgeError` if the resource is unknown or the rollback fails.
    fn rollback(&self, resource: Option<&ResourceId>) -> Result<(), SqlBridgeError>;

    /// Release every resource the registry holds.
    ///
    /// # Errors
    /// Returns `SqlBridgeError` if releasing any resource fails.
    fn close_all(&self) -> Result<(), SqlBridgeError>;
}

impl<E: SqlEngine + ?Sized> SqlEngine for &E {
    fn open(&self, resource: Option<&ResourceId>) -> Result<(), SqlBridgeError> {
        (**self).open(resource)
    }

    fn query(
        &self,
        resource: Option<&ResourceId>,
        statement: Statement<'_>,
    ) -> Result<Box<dyn Cursor>, SqlBridgeError> {
        (**self).query(resource, statement)
    }

    fn update(
        &self,
        resource: Option<&ResourceId>,
        statement: Statement<'_>,
    ) -> Result<usize, SqlBridgeError> {
        (**self).update(resource, statement)
    }

    fn execute(
        &self,
        resource: Option<&ResourceId>,
        statement: Statement<'_>,
    ) -> Result<(), SqlBridgeError> {
        (**self).execute(resource, statement)
    }

    fn close_open_cursor(&self, resource: Option<&ResourceId>) -> Result<(), SqlBridgeError> {
        (**self).close_open_cursor(resource)
    }

    fn commit(&self, resource: Option<&ResourceId>) -> Result<(), SqlBridgeError> {
        (**self).commit(resource)
    }

    fn rollback(&self, resource: Option<&ResourceId>) -> Result<(), SqlBridgeError> {
        (**self).rollback(resource)
    }

    fn close_all(&self) -> Result<(), SqlBridgeError> {
        (**self).close_all()
    }
}
