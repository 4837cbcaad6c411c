use rusqlite::Connection;

use crate::error::SqlBridgeError;
use crate::results::BufferedCursor;

use super::params::Params;
use super::query::build_cursor;

/// Execute one or more `;`-separated statements without parameters.
///
/// # Errors
/// Returns `SqlBridgeError::SqliteError` if any statement fails.
pub fn execute_batch(conn: &Connection, sql: &str) -> Result<(), SqlBridgeError> {
    conn.execute_batch(sql)?;
    Ok(())
}

/// Execute a row-producing statement and fetch every row.
///
/// # Errors
/// Returns `SqlBridgeError::SqliteError` if preparing or stepping the statement fails.
pub fn execute_select(
    conn: &Connection,
    sql: &str,
    params: &Params,
) -> Result<BufferedCursor, SqlBridgeError> {
    let mut stmt = conn.prepare_cached(sql)?;
    build_cursor(&mut stmt, params)
}

/// Execute a DML statement (INSERT, UPDATE, DELETE) and return the affected-row count.
///
/// # Errors
/// Returns `SqlBridgeError::SqliteError` if execution fails, including when the statement
/// returns rows.
pub fn execute_dml(conn: &Connection, sql: &str, params: &Params) -> Result<usize, SqlBridgeError> {
    let mut stmt = conn.prepare_cached(sql)?;
    let refs = params.as_refs();
    Ok(stmt.execute(&refs[..])?)
}

/// Execute any single statement with parameters, discarding rows it may produce.
///
/// # Errors
/// Returns `SqlBridgeError::SqliteError` if preparing or stepping the statement fails.
pub fn execute_statement(
    conn: &Connection,
    sql: &str,
    params: &Params,
) -> Result<(), SqlBridgeError> {
    let mut stmt = conn.prepare_cached(sql)?;
    let refs = params.as_refs();
    let mut rows = stmt.query(&refs[..])?;
    while rows.next()?.is_some() {}
    Ok(())
}
