//! SQL access for scripting hosts.
//!
//! A script hands the bridge loosely typed values (strings, booleans, numbers, instants,
//! nulls). The bridge converts them to driver values, runs catalogued or raw SQL against a
//! named resource, and converts every result row back into host values, passing each row
//! through a pluggable [`RowMapper`](mapper::RowMapper).
//!
//! Transactions are explicit: nothing is committed until the script calls
//! [`SqlBridge::commit`](executor::SqlBridge::commit).

pub mod coercion;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod executor;
pub mod mapper;
pub mod marshal;
pub mod params;
pub mod prelude;
pub mod request;
pub mod results;
pub mod template;
pub mod types;

mod transaction;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use error::SqlBridgeError;
pub use executor::SqlBridge;
pub use types::{DriverValue, HostParams, HostValue, Mapping, ResourceId};
