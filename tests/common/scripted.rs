#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use sql_script_bridge::prelude::*;

pub const DEFAULT: &str = "default";

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Result a scripted query hands out.
#[derive(Clone)]
pub struct ScriptedResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<DriverValue>>,
    /// Fail `next_row` once this many rows were returned.
    pub fail_after: Option<usize>,
    pub fail_close: bool,
}

impl ScriptedResult {
    pub fn new(columns: &[&str], rows: Vec<Vec<DriverValue>>) -> Self {
        Self {
            columns: columns.iter().map(|c| (*c).to_owned()).collect(),
            rows,
            fail_after: None,
            fail_close: false,
        }
    }

    pub fn failing_after(mut self, rows: usize) -> Self {
        self.fail_after = Some(rows);
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

struct ScriptedCursor {
    result: ScriptedResult,
    next: usize,
    closed: Arc<AtomicBool>,
}

impl Cursor for ScriptedCursor {
    fn column_names(&self) -> &[String] {
        &self.result.columns
    }

    fn next_row(&mut self) -> Result<Option<Vec<DriverValue>>, SqlBridgeError> {
        if self.result.fail_after == Some(self.next) {
            return Err(SqlBridgeError::ExecutionError("fetch failed".into()));
        }
        let row = self.result.rows.get(self.next).cloned();
        self.next += 1;
        Ok(row)
    }

    fn close(&mut self) -> Result<(), SqlBridgeError> {
        self.closed.store(true, Ordering::SeqCst);
        if self.result.fail_close {
            Err(SqlBridgeError::ExecutionError("close failed".into()))
        } else {
            Ok(())
        }
    }
}

/// In-memory engine that answers from a script and records every call.
///
/// Statements are keyed by `Statement::label()`: `GROUP.SQL_ID` for templates, the SQL text
/// for raw statements.
pub struct ScriptedEngine {
    resources: HashSet<String>,
    results: Mutex<HashMap<String, ScriptedResult>>,
    update_counts: Mutex<HashMap<String, usize>>,
    failures: Mutex<HashMap<String, String>>,
    open_cursors: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    bound: Mutex<Vec<DriverParams>>,
    cursors_closed: Mutex<Vec<Arc<AtomicBool>>>,
}

impl ScriptedEngine {
    pub fn new(extra_resources: &[&str]) -> Self {
        let mut resources: HashSet<String> = extra_resources.iter().map(|r| (*r).to_owned()).collect();
        resources.insert(DEFAULT.to_owned());
        Self {
            resources,
            results: Mutex::new(HashMap::new()),
            update_counts: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            open_cursors: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            bound: Mutex::new(Vec::new()),
            cursors_closed: Mutex::new(Vec::new()),
        }
    }

    pub fn on_query(&self, label: &str, result: ScriptedResult) -> &Self {
        lock(&self.results).insert(label.to_owned(), result);
        self
    }

    pub fn on_update(&self, label: &str, count: usize) -> &Self {
        lock(&self.update_counts).insert(label.to_owned(), count);
        self
    }

    pub fn fail(&self, label: &str, message: &str) -> &Self {
        lock(&self.failures).insert(label.to_owned(), message.to_owned());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn bound_params(&self) -> Vec<DriverParams> {
        lock(&self.bound).clone()
    }

    pub fn has_open_cursor(&self, resource: &str) -> bool {
        lock(&self.open_cursors).contains(resource)
    }

    /// Whether every cursor handed out so far was closed.
    pub fn all_cursors_closed(&self) -> bool {
        lock(&self.cursors_closed)
            .iter()
            .all(|closed| closed.load(Ordering::SeqCst))
    }

    fn resolve(&self, resource: Option<&ResourceId>) -> Result<String, SqlBridgeError> {
        let name = resource.map_or(DEFAULT, ResourceId::as_str);
        if self.resources.contains(name) {
            Ok(name.to_owned())
        } else {
            Err(SqlBridgeError::UnknownResource(name.to_owned()))
        }
    }

    fn record(&self, call: String) {
        lock(&self.calls).push(call);
    }

    fn enter(&self, op: &str, resource: Option<&ResourceId>, statement: &Statement<'_>) -> Result<(String, String), SqlBridgeError> {
        let name = self.resolve(resource)?;
        let label = statement.label();
        self.record(format!("{op} {name} {label}"));
        if let Statement::Template { params, .. } = statement {
            lock(&self.bound).push((*params).clone());
        }
        if lock(&self.open_cursors).contains(&name) {
            return Err(SqlBridgeError::CursorAlreadyOpen(name));
        }
        if let Some(message) = lock(&self.failures).get(&label) {
            return Err(SqlBridgeError::ExecutionError(message.clone()));
        }
        Ok((name, label))
    }
}

impl SqlEngine for ScriptedEngine {
    fn open(&self, resource: Option<&ResourceId>) -> Result<(), SqlBridgeError> {
        let name = self.resolve(resource)?;
        self.record(format!("open {name}"));
        Ok(())
    }

    fn query(
        &self,
        resource: Option<&ResourceId>,
        statement: Statement<'_>,
    ) -> Result<Box<dyn Cursor>, SqlBridgeError> {
        let (name, label) = self.enter("query", resource, &statement)?;
        let result = lock(&self.results)
            .get(&label)
            .cloned()
            .unwrap_or_else(|| ScriptedResult::new(&[], Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        lock(&self.cursors_closed).push(Arc::clone(&closed));
        lock(&self.open_cursors).insert(name);
        Ok(Box::new(ScriptedCursor {
            result,
            next: 0,
            closed,
        }))
    }

    fn update(
        &self,
        resource: Option<&ResourceId>,
        statement: Statement<'_>,
    ) -> Result<usize, SqlBridgeError> {
        let (_, label) = self.enter("update", resource, &statement)?;
        Ok(lock(&self.update_counts).get(&label).copied().unwrap_or(0))
    }

    fn execute(
        &self,
        resource: Option<&ResourceId>,
        statement: Statement<'_>,
    ) -> Result<(), SqlBridgeError> {
        self.enter("execute", resource, &statement)?;
        Ok(())
    }

    fn close_open_cursor(&self, resource: Option<&ResourceId>) -> Result<(), SqlBridgeError> {
        let name = self.resolve(resource)?;
        self.record(format!("close_open_cursor {name}"));
        lock(&self.open_cursors).remove(&name);
        Ok(())
    }

    fn commit(&self, resource: Option<&ResourceId>) -> Result<(), SqlBridgeError> {
        let name = self.resolve(resource)?;
        self.record(format!("commit {name}"));
        Ok(())
    }

    fn rollback(&self, resource: Option<&ResourceId>) -> Result<(), SqlBridgeError> {
        let name = self.resolve(resource)?;
        self.record(format!("rollback {name}"));
        Ok(())
    }

    fn close_all(&self) -> Result<(), SqlBridgeError> {
        self.record("close_all".to_owned());
        lock(&self.open_cursors).clear();
        Ok(())
    }
}
