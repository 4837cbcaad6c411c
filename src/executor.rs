use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::engine::{SqlEngine, Statement};
use crate::error::SqlBridgeError;
use crate::mapper::{IdentityMapper, RowMapper};
use crate::marshal::marshal_rows;
use crate::params::DriverParams;
use crate::request::{SqlRequest, TemplateRequest};
use crate::types::{Mapping, ResourceId, describe_resource};

/// Facade a scripting host talks to.
///
/// Owns the injected collaborators: the SQL engine (with its resource registry), the row
/// mapper applied to every result row, and the diagnostics sink for unconverted values.
/// It keeps no resource state of its own; every call addresses a resource by name.
///
/// No operation commits implicitly. Updates and executes stay inside the resource's current
/// unit of work until the caller invokes `commit` or `rollback`.
///
/// ```rust,no_run
/// use sql_script_bridge::prelude::*;
///
/// # fn demo() -> Result<(), SqlBridgeError> {
/// let engine = SqliteOptionsBuilder::new("app.db").build()?;
/// let bridge = SqlBridge::new(engine);
///
/// let users = bridge.execute_query_sql(&SqlRequest::new("SELECT id, name FROM users"))?;
/// bridge.execute_update_sql(&SqlRequest::new("UPDATE users SET seen = 1"))?;
/// bridge.commit(None)?;
/// bridge.close_all()?;
/// # let _ = users;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SqlBridge<E, M = IdentityMapper, D = TracingDiagnostics> {
    engine: E,
    mapper: M,
    diagnostics: D,
}

impl<E: SqlEngine> SqlBridge<E> {
    /// Bridge with the identity row mapper and `tracing` diagnostics.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            mapper: IdentityMapper,
            diagnostics: TracingDiagnostics,
        }
    }
}

impl<E, M, D> SqlBridge<E, M, D>
where
    E: SqlEngine,
    M: RowMapper,
    D: Diagnostics,
{
    /// Swap the row mapper.
    pub fn with_mapper<M2: RowMapper>(self, mapper: M2) -> SqlBridge<E, M2, D> {
        SqlBridge {
            engine: self.engine,
            mapper,
            diagnostics: self.diagnostics,
        }
    }

    /// Swap the diagnostics sink.
    pub fn with_diagnostics<D2: Diagnostics>(self, diagnostics: D2) -> SqlBridge<E, M, D2> {
        SqlBridge {
            engine: self.engine,
            mapper: self.mapper,
            diagnostics,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    /// Consume the bridge and hand back the engine.
    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Open a resource ahead of use. Optional: resources also open on first reference.
    ///
    /// # Errors
    /// Returns the engine's error if the resource is unknown or cannot be connected.
    pub fn open(&self, resource: Option<&ResourceId>) -> Result<(), SqlBridgeError> {
        self.engine.open(resource)
    }

    /// Run a catalogued query and materialize every mapped row.
    ///
    /// # Errors
    /// Returns `SqlBridgeError` from the engine (unknown resource or statement, driver failure)
    /// or from the row mapper. The cursor and the resource's cursor state are released first.
    pub fn execute_query(&self, request: &TemplateRequest) -> Result<Vec<M::Record>, SqlBridgeError> {
        let params = DriverParams::bind(&request.params);
        let statement = Statement::Template {
            group_id: &request.group_id,
            sql_id: &request.sql_id,
            params: &params,
        };
        self.run_query(request.resource.as_ref(), statement, request.mapping.as_ref())
    }

    /// First mapped row of a catalogued query, or `None` when it returns no rows.
    ///
    /// # Errors
    /// Same as [`SqlBridge::execute_query`].
    pub fn get_single(&self, request: &TemplateRequest) -> Result<Option<M::Record>, SqlBridgeError> {
        Ok(self.execute_query(request)?.into_iter().next())
    }

    /// Run a catalogued data-modifying statement and return the affected-row count.
    ///
    /// # Errors
    /// Returns the engine's error unchanged.
    pub fn execute_update(&self, request: &TemplateRequest) -> Result<usize, SqlBridgeError> {
        let params = DriverParams::bind(&request.params);
        let statement = Statement::Template {
            group_id: &request.group_id,
            sql_id: &request.sql_id,
            params: &params,
        };
        tracing::trace!(resource = describe_resource(request.resource.as_ref()), statement = %statement.label(), "update");
        self.engine.update(request.resource.as_ref(), statement)
    }

    /// Run any catalogued statement, DDL included.
    ///
    /// # Errors
    /// Returns the engine's error unchanged.
    pub fn execute(&self, request: &TemplateRequest) -> Result<(), SqlBridgeError> {
        let params = DriverParams::bind(&request.params);
        let statement = Statement::Template {
            group_id: &request.group_id,
            sql_id: &request.sql_id,
            params: &params,
        };
        tracing::trace!(resource = describe_resource(request.resource.as_ref()), statement = %statement.label(), "execute");
        self.engine.execute(request.resource.as_ref(), statement)
    }

    /// Run raw SQL that produces rows and materialize every mapped row.
    ///
    /// # Errors
    /// Same as [`SqlBridge::execute_query`].
    pub fn execute_query_sql(&self, request: &SqlRequest) -> Result<Vec<M::Record>, SqlBridgeError> {
        let statement = Statement::Raw { sql: &request.sql };
        self.run_query(request.resource.as_ref(), statement, request.mapping.as_ref())
    }

    /// First mapped row of a raw query, or `None` when it returns no rows.
    ///
    /// # Errors
    /// Same as [`SqlBridge::execute_query`].
    pub fn get_single_sql(&self, request: &SqlRequest) -> Result<Option<M::Record>, SqlBridgeError> {
        Ok(self.execute_query_sql(request)?.into_iter().next())
    }

    /// Run raw data-modifying SQL and return the affected-row count.
    ///
    /// # Errors
    /// Returns the engine's error unchanged.
    pub fn execute_update_sql(&self, request: &SqlRequest) -> Result<usize, SqlBridgeError> {
        let statement = Statement::Raw { sql: &request.sql };
        tracing::trace!(resource = describe_resource(request.resource.as_ref()), statement = %statement.label(), "update");
        self.engine.update(request.resource.as_ref(), statement)
    }

    /// Run any raw SQL statement, DDL included.
    ///
    /// # Errors
    /// Returns the engine's error unchanged.
    pub fn execute_sql(&self, request: &SqlRequest) -> Result<(), SqlBridgeError> {
        let statement = Statement::Raw { sql: &request.sql };
        tracing::trace!(resource = describe_resource(request.resource.as_ref()), statement = %statement.label(), "execute");
        self.engine.execute(request.resource.as_ref(), statement)
    }

    fn run_query(
        &self,
        resource: Option<&ResourceId>,
        statement: Statement<'_>,
        mapping: Option<&Mapping>,
    ) -> Result<Vec<M::Record>, SqlBridgeError> {
        tracing::trace!(resource = describe_resource(resource), statement = %statement.label(), "query");

        let mut cursor = match self.engine.query(resource, statement) {
            Ok(cursor) => cursor,
            Err(err) => {
                self.release_after_failure(resource);
                return Err(err);
            }
        };

        let marshalled = marshal_rows(&mut cursor, &self.mapper, mapping, &self.diagnostics);
        let closed = cursor.close();
        drop(cursor);

        match marshalled {
            Ok(records) => {
                if let Err(err) = closed {
                    self.release_after_failure(resource);
                    return Err(err);
                }
                self.engine.close_open_cursor(resource)?;
                Ok(records)
            }
            Err(err) => {
                if let Err(close_err) = closed {
                    tracing::warn!(error = %close_err, "closing cursor failed after query error");
                }
                self.release_after_failure(resource);
                Err(err)
            }
        }
    }

    // The primary error wins; a failing release is only logged.
    fn release_after_failure(&self, resource: Option<&ResourceId>) {
        if let Err(err) = self.engine.close_open_cursor(resource) {
            tracing::warn!(
                resource = describe_resource(resource),
                error = %err,
                "releasing cursor state failed after query error"
            );
        }
    }
}
