use std::fmt;
use std::thread;
use std::time::Duration;

use rusqlite::{Connection, ErrorCode};

use crate::error::SqlBridgeError;

use super::config::MEMORY_PATH;

const ROLLBACK_BUSY_RETRIES: &[Duration] = &[
    Duration::from_millis(10),
    Duration::from_millis(25),
    Duration::from_millis(50),
];

/// One opened resource: a `SQLite` connection with autocommit turned off.
///
/// `SQLite` itself autocommits, so the first statement after open, commit or rollback opens
/// a transaction that stays open until the caller ends it.
pub(crate) struct SqliteResource {
    name: String,
    conn: Connection,
    cursor_open: bool,
}

impl SqliteResource {
    pub(crate) fn open(
        name: &str,
        path: &str,
        init_sql: Option<&str>,
        busy_timeout: Duration,
    ) -> Result<Self, SqlBridgeError> {
        let conn = if path == MEMORY_PATH {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(|e| {
            SqlBridgeError::ConnectionError(format!("cannot open resource `{name}` at {path}: {e}"))
        })?;

        conn.busy_timeout(busy_timeout)?;
        if let Some(sql) = init_sql {
            conn.execute_batch(sql)?;
        }

        tracing::debug!(resource = name, path, "opened resource");
        Ok(Self {
            name: name.to_owned(),
            conn,
            cursor_open: false,
        })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn set_cursor_open(&mut self, open: bool) {
        self.cursor_open = open;
    }

    /// Whether uncommitted work is pending.
    pub(crate) fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    pub(crate) fn ensure_no_open_cursor(&self) -> Result<(), SqlBridgeError> {
        if self.cursor_open {
            Err(SqlBridgeError::CursorAlreadyOpen(self.name.clone()))
        } else {
            Ok(())
        }
    }

    /// Open a transaction unless one is already pending.
    pub(crate) fn begin_if_needed(&self) -> Result<(), SqlBridgeError> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    pub(crate) fn commit(&mut self) -> Result<(), SqlBridgeError> {
        if self.in_transaction() {
            self.conn.execute_batch("COMMIT")?;
        }
        self.cursor_open = false;
        Ok(())
    }

    pub(crate) fn rollback(&mut self) -> Result<(), SqlBridgeError> {
        if self.in_transaction() {
            self.rollback_with_busy_retries()?;
        }
        self.cursor_open = false;
        Ok(())
    }

    /// Discard pending work and close the connection.
    pub(crate) fn close(mut self) -> Result<(), SqlBridgeError> {
        let rolled_back = self.rollback();
        let Self { name, conn, .. } = self;
        let closed = conn
            .close()
            .map_err(|(_, err)| SqlBridgeError::SqliteError(err));
        tracing::debug!(resource = %name, "closed resource");
        rolled_back.and(closed)
    }

    fn rollback_with_busy_retries(&self) -> Result<(), SqlBridgeError> {
        for (idx, delay) in ROLLBACK_BUSY_RETRIES.iter().copied().enumerate() {
            match self.conn.execute_batch("ROLLBACK") {
                Ok(()) => return Ok(()),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::DatabaseBusy
                        && idx + 1 < ROLLBACK_BUSY_RETRIES.len() =>
                {
                    thread::sleep(delay);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(SqlBridgeError::ExecutionError(
            "rollback retries exhausted".into(),
        ))
    }
}

impl fmt::Debug for SqliteResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteResource")
            .field("name", &self.name)
            .field("in_transaction", &self.in_transaction())
            .field("cursor_open", &self.cursor_open)
            .finish()
    }
}
