// SQLite engine - runs bridge statements against named SQLite databases
//
// - config: resource registry options and the builder
// - connection: one opened resource and its transaction state
// - params: driver values to SQLite values
// - query: declared-type aware row extraction
// - executor: statement execution helpers
// - engine: the resource registry implementing `SqlEngine`

pub mod config;
mod connection;
pub mod engine;
pub mod executor;
pub mod params;
pub mod query;

pub use config::{DEFAULT_RESOURCE_NAME, MEMORY_PATH, SqliteOptions, SqliteOptionsBuilder};
pub use engine::SqliteEngine;
pub use executor::{execute_batch, execute_dml, execute_select, execute_statement};
pub use params::Params;
pub use query::build_cursor;
