use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use crate::engine::{SqlEngine, Statement};
use crate::error::SqlBridgeError;
use crate::results::Cursor;
use crate::template::SqlCatalog;
use crate::types::ResourceId;

use super::config::SqliteOptions;
use super::connection::SqliteResource;
use super::executor::{execute_batch, execute_dml, execute_select, execute_statement};
use super::params::Params;

type ResourceKey = (ThreadId, String);
type ResourceSlot = Arc<Mutex<SqliteResource>>;

/// `SQLite` engine with a registry of named resources.
///
/// Resources are scoped to the calling thread: each thread that references a name gets its
/// own connection, opened on first use and kept until that thread calls
/// [`SqlEngine::close_all`] or the engine is dropped. Work on a resource stays in one
/// transaction until it is committed or rolled back; nothing commits implicitly.
///
/// The registry lock only guards lookups. Statements run under the resource's own lock, so
/// a statement waiting on a busy database never blocks other resources.
pub struct SqliteEngine {
    options: SqliteOptions,
    catalog: SqlCatalog,
    resources: Mutex<HashMap<ResourceKey, ResourceSlot>>,
}

impl SqliteEngine {
    /// Engine whose catalog comes from `options.sql_dir`, or is empty when none is set.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::ConfigError` if the options are invalid or the SQL directory
    /// cannot be loaded.
    pub fn new(options: SqliteOptions) -> Result<Self, SqlBridgeError> {
        Self::with_catalog(options, SqlCatalog::new())
    }

    /// Engine using `catalog`, layered over `options.sql_dir` when that is set.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::ConfigError` if the options are invalid or the SQL directory
    /// cannot be loaded.
    pub fn with_catalog(options: SqliteOptions, catalog: SqlCatalog) -> Result<Self, SqlBridgeError> {
        options.validate()?;
        let catalog = match options.sql_dir.as_deref() {
            Some(dir) => {
                let mut loaded = SqlCatalog::load_dir(dir)?;
                loaded.merge(catalog);
                loaded
            }
            None => catalog,
        };

        Ok(Self {
            options,
            catalog,
            resources: Mutex::new(HashMap::new()),
        })
    }

    /// Engine configured from a JSON options file.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::ConfigError` if the file is unreadable or invalid.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SqlBridgeError> {
        Self::new(SqliteOptions::from_json_file(path)?)
    }

    #[must_use]
    pub fn options(&self) -> &SqliteOptions {
        &self.options
    }

    #[must_use]
    pub fn catalog(&self) -> &SqlCatalog {
        &self.catalog
    }

    /// Whether the calling thread holds an open connection for the resource.
    #[must_use]
    pub fn is_open(&self, resource: Option<&ResourceId>) -> bool {
        self.slot(self.name_of(resource)).is_some()
    }

    /// Whether the calling thread's connection for the resource has uncommitted work.
    #[must_use]
    pub fn in_transaction(&self, resource: Option<&ResourceId>) -> bool {
        self.slot(self.name_of(resource))
            .is_some_and(|slot| lock_slot(&slot).in_transaction())
    }

    /// Names of the resources the calling thread has open, sorted.
    #[must_use]
    pub fn open_resources(&self) -> Vec<String> {
        let current = thread::current().id();
        let mut names: Vec<String> = self
            .lock_resources()
            .keys()
            .filter(|(owner, _)| *owner == current)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn name_of<'a>(&'a self, resource: Option<&'a ResourceId>) -> &'a str {
        resource.map_or(self.options.default_resource.as_str(), ResourceId::as_str)
    }

    fn known_name<'a>(&'a self, resource: Option<&'a ResourceId>) -> Result<&'a str, SqlBridgeError> {
        let name = self.name_of(resource);
        if self.options.resources.contains_key(name) {
            Ok(name)
        } else {
            Err(SqlBridgeError::UnknownResource(name.to_owned()))
        }
    }

    fn lock_resources(&self) -> MutexGuard<'_, HashMap<ResourceKey, ResourceSlot>> {
        match self.resources.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// The calling thread's slot for `name`, if it is open.
    fn slot(&self, name: &str) -> Option<ResourceSlot> {
        let key = (thread::current().id(), name.to_owned());
        self.lock_resources().get(&key).map(Arc::clone)
    }

    /// Run `func` against the calling thread's resource, opening it first if needed.
    fn with_resource<R>(
        &self,
        resource: Option<&ResourceId>,
        func: impl FnOnce(&mut SqliteResource) -> Result<R, SqlBridgeError>,
    ) -> Result<R, SqlBridgeError> {
        let name = self.known_name(resource)?;
        let slot = match self.slot(name) {
            Some(slot) => slot,
            None => {
                let path = self
                    .options
                    .path_of(name)
                    .ok_or_else(|| SqlBridgeError::UnknownResource(name.to_owned()))?;
                let opened = SqliteResource::open(
                    name,
                    path,
                    self.options.init_sql.as_deref(),
                    self.options.busy_timeout(),
                )?;
                let key = (thread::current().id(), name.to_owned());
                let slot = Arc::new(Mutex::new(opened));
                self.lock_resources().insert(key, Arc::clone(&slot));
                slot
            }
        };
        let mut res = lock_slot(&slot);
        func(&mut *res)
    }

    /// Run `func` only if the resource is already open; unopened resources have nothing to do.
    fn with_opened_resource(
        &self,
        resource: Option<&ResourceId>,
        func: impl FnOnce(&mut SqliteResource) -> Result<(), SqlBridgeError>,
    ) -> Result<(), SqlBridgeError> {
        let name = self.known_name(resource)?;
        match self.slot(name) {
            Some(slot) => func(&mut *lock_slot(&slot)),
            None => Ok(()),
        }
    }

    fn resolve<'a>(&'a self, statement: Statement<'a>) -> Result<(&'a str, Params), SqlBridgeError> {
        match statement {
            Statement::Template {
                group_id,
                sql_id,
                params,
            } => {
                let compiled = self.catalog.get(group_id, sql_id)?;
                let values = compiled.bind(params)?;
                Ok((compiled.sql(), Params::convert(&values)))
            }
            Statement::Raw { sql } => Ok((sql, Params::default())),
        }
    }
}

fn lock_slot(slot: &ResourceSlot) -> MutexGuard<'_, SqliteResource> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

fn close_slot(slot: ResourceSlot) -> Result<(), SqlBridgeError> {
    match Arc::try_unwrap(slot) {
        Ok(resource) => resource
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .close(),
        // still borrowed by a caller on this thread; discard its work and let the last
        // reference close the connection
        Err(shared) => lock_slot(&shared).rollback(),
    }
}

impl SqlEngine for SqliteEngine {
    fn open(&self, resource: Option<&ResourceId>) -> Result<(), SqlBridgeError> {
        self.with_resource(resource, |_| Ok(()))
    }

    fn query(
        &self,
        resource: Option<&ResourceId>,
        statement: Statement<'_>,
    ) -> Result<Box<dyn Cursor>, SqlBridgeError> {
        let (sql, params) = self.resolve(statement)?;
        self.with_resource(resource, |res| {
            res.ensure_no_open_cursor()?;
            res.begin_if_needed()?;
            let cursor = execute_select(res.conn(), sql, &params)?;
            res.set_cursor_open(true);
            Ok(Box::new(cursor) as Box<dyn Cursor>)
        })
    }

    fn update(
        &self,
        resource: Option<&ResourceId>,
        statement: Statement<'_>,
    ) -> Result<usize, SqlBridgeError> {
        let (sql, params) = self.resolve(statement)?;
        self.with_resource(resource, |res| {
            res.ensure_no_open_cursor()?;
            res.begin_if_needed()?;
            execute_dml(res.conn(), sql, &params)
        })
    }

    fn execute(
        &self,
        resource: Option<&ResourceId>,
        statement: Statement<'_>,
    ) -> Result<(), SqlBridgeError> {
        let raw = matches!(statement, Statement::Raw { .. });
        let (sql, params) = self.resolve(statement)?;
        self.with_resource(resource, |res| {
            res.ensure_no_open_cursor()?;
            res.begin_if_needed()?;
            if raw {
                execute_batch(res.conn(), sql)
            } else {
                execute_statement(res.conn(), sql, &params)
            }
        })
    }

    fn close_open_cursor(&self, resource: Option<&ResourceId>) -> Result<(), SqlBridgeError> {
        self.with_opened_resource(resource, |res| {
            res.set_cursor_open(false);
            Ok(())
        })
    }

    fn commit(&self, resource: Option<&ResourceId>) -> Result<(), SqlBridgeError> {
        self.with_opened_resource(resource, SqliteResource::commit)
    }

    fn rollback(&self, resource: Option<&ResourceId>) -> Result<(), SqlBridgeError> {
        self.with_opened_resource(resource, SqliteResource::rollback)
    }

    fn close_all(&self) -> Result<(), SqlBridgeError> {
        let current = thread::current().id();
        let drained: Vec<(String, ResourceSlot)> = {
            let mut resources = self.lock_resources();
            let keys: Vec<ResourceKey> = resources
                .keys()
                .filter(|(owner, _)| *owner == current)
                .cloned()
                .collect();
            keys.into_iter()
                .filter_map(|key| resources.remove(&key).map(|slot| (key.1, slot)))
                .collect()
        };
        let count = drained.len();

        let mut first_err = None;
        for (name, slot) in drained {
            if let Err(err) = close_slot(slot) {
                tracing::warn!(resource = %name, error = %err, "closing resource failed");
                first_err.get_or_insert(err);
            }
        }

        tracing::debug!(closed = count, "closed all resources");
        first_err.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for SqliteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteEngine")
            .field("default_resource", &self.options.default_resource)
            .field("statements", &self.catalog.len())
            .field("open_resources", &self.open_resources())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::DriverParams;
    use crate::sqlite::config::{MEMORY_PATH, SqliteOptionsBuilder};
    use crate::types::{DriverValue, HostParams, HostValue};

    fn engine() -> SqliteEngine {
        SqliteOptionsBuilder::new(MEMORY_PATH)
            .resource("audit", MEMORY_PATH)
            .catalog(
                SqlCatalog::new()
                    .with_statement("T", "INSERT", "INSERT INTO t (x) VALUES (:x)")
                    .with_statement("T", "BY_X", "SELECT x FROM t WHERE x = :x"),
            )
            .build()
            .unwrap()
    }

    fn raw(sql: &str) -> Statement<'_> {
        Statement::Raw { sql }
    }

    #[test]
    fn resources_open_lazily() {
        let engine = engine();
        assert!(engine.open_resources().is_empty());

        engine.execute(None, raw("CREATE TABLE t (x)")).unwrap();
        assert_eq!(engine.open_resources(), ["default"]);

        engine.open(Some(&ResourceId::new("audit"))).unwrap();
        assert_eq!(engine.open_resources(), ["audit", "default"]);
    }

    #[test]
    fn open_twice_keeps_connection_and_pending_work() {
        let engine = engine();
        engine.execute(None, raw("CREATE TABLE t (x)")).unwrap();
        engine.update(None, raw("INSERT INTO t VALUES (1)")).unwrap();
        assert!(engine.in_transaction(None));

        engine.open(None).unwrap();
        engine.open(None).unwrap();
        assert!(engine.in_transaction(None));
        assert_eq!(engine.open_resources(), ["default"]);

        // same in-memory connection, so the uncommitted row is still there
        let mut cursor = engine.query(None, raw("SELECT count(*) FROM t")).unwrap();
        assert_eq!(cursor.next_row().unwrap(), Some(vec![DriverValue::Long(1)]));
    }

    #[test]
    fn resources_are_scoped_to_the_calling_thread() {
        let engine = engine();
        engine.execute(None, raw("CREATE TABLE t (x)")).unwrap();
        let _cursor = engine.query(None, raw("SELECT x FROM t")).unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                assert!(!engine.is_open(None));
                // a fresh connection: no open cursor here, and no table either
                engine.query(None, raw("SELECT 1")).unwrap();
                engine.close_open_cursor(None).unwrap();
                assert!(engine.query(None, raw("SELECT x FROM t")).is_err());
                engine.rollback(None).unwrap();
                engine.close_all().unwrap();
                assert!(engine.open_resources().is_empty());
            });
        });

        assert_eq!(engine.open_resources(), ["default"]);
        assert!(engine.in_transaction(None));
        assert!(matches!(
            engine.query(None, raw("SELECT 2")),
            Err(SqlBridgeError::CursorAlreadyOpen(_))
        ));
    }

    #[test]
    fn unknown_resource_is_rejected() {
        let engine = engine();
        let missing = ResourceId::new("nope");
        assert!(matches!(
            engine.execute(Some(&missing), raw("SELECT 1")),
            Err(SqlBridgeError::UnknownResource(name)) if name == "nope"
        ));
        assert!(matches!(
            engine.commit(Some(&missing)),
            Err(SqlBridgeError::UnknownResource(_))
        ));
    }

    #[test]
    fn templates_bind_named_parameters() {
        let engine = engine();
        engine.execute(None, raw("CREATE TABLE t (x INTEGER)")).unwrap();

        let params = DriverParams::bind(&HostParams::from([("x".to_string(), HostValue::Num(5.0))]));
        let insert = Statement::Template {
            group_id: "T",
            sql_id: "INSERT",
            params: &params,
        };
        assert_eq!(engine.update(None, insert).unwrap(), 1);

        let select = Statement::Template {
            group_id: "T",
            sql_id: "BY_X",
            params: &params,
        };
        let mut cursor = engine.query(None, select).unwrap();
        assert_eq!(cursor.next_row().unwrap(), Some(vec![DriverValue::Long(5)]));
    }

    #[test]
    fn missing_parameter_and_unknown_statement() {
        let engine = engine();
        let empty = DriverParams::default();
        let insert = Statement::Template {
            group_id: "T",
            sql_id: "INSERT",
            params: &empty,
        };
        assert!(matches!(
            engine.update(None, insert),
            Err(SqlBridgeError::ParameterError(_))
        ));

        let unknown = Statement::Template {
            group_id: "T",
            sql_id: "NOPE",
            params: &empty,
        };
        assert!(matches!(
            engine.execute(None, unknown),
            Err(SqlBridgeError::UnknownStatement { .. })
        ));
    }

    #[test]
    fn open_cursor_blocks_until_released() {
        let engine = engine();
        let _cursor = engine.query(None, raw("SELECT 1")).unwrap();
        assert!(matches!(
            engine.query(None, raw("SELECT 2")),
            Err(SqlBridgeError::CursorAlreadyOpen(_))
        ));

        engine.close_open_cursor(None).unwrap();
        engine.query(None, raw("SELECT 2")).unwrap();
    }

    #[test]
    fn work_stays_pending_until_commit() {
        let engine = engine();
        engine.execute(None, raw("CREATE TABLE t (x)")).unwrap();
        assert!(engine.in_transaction(None));

        engine.commit(None).unwrap();
        assert!(!engine.in_transaction(None));

        engine.update(None, raw("INSERT INTO t VALUES (1)")).unwrap();
        engine.rollback(None).unwrap();

        let mut cursor = engine.query(None, raw("SELECT count(*) FROM t")).unwrap();
        assert_eq!(cursor.next_row().unwrap(), Some(vec![DriverValue::Long(0)]));
    }

    #[test]
    fn commit_on_unopened_resource_is_noop() {
        let engine = engine();
        engine.commit(Some(&ResourceId::new("audit"))).unwrap();
        engine.rollback(None).unwrap();
        engine.close_open_cursor(None).unwrap();
        assert!(engine.open_resources().is_empty());
    }

    #[test]
    fn close_all_empties_the_registry() {
        let engine = engine();
        engine.execute(None, raw("CREATE TABLE t (x)")).unwrap();
        engine.open(Some(&ResourceId::new("audit"))).unwrap();

        engine.close_all().unwrap();
        assert!(engine.open_resources().is_empty());
        // reopens as a fresh in-memory database
        assert!(engine.query(None, raw("SELECT * FROM t")).is_err());
    }
}
