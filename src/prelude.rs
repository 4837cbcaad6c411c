//! Convenient imports for common functionality.
//!
//! ```rust
//! use sql_script_bridge::prelude::*;
//! ```

pub use crate::coercion::{driver_to_host, host_to_driver};
pub use crate::diagnostics::{Diagnostics, RecordingDiagnostics, TracingDiagnostics};
pub use crate::engine::{SqlEngine, Statement};
pub use crate::error::SqlBridgeError;
pub use crate::executor::SqlBridge;
pub use crate::mapper::{FnMapper, IdentityMapper, JsonMapper, RowMapper};
pub use crate::marshal::marshal_rows;
pub use crate::params::DriverParams;
pub use crate::request::{SqlRequest, TemplateRequest};
pub use crate::results::{BufferedCursor, Cursor, RawRow};
pub use crate::template::{CompiledSql, SqlCatalog};
pub use crate::types::{DriverValue, HostParams, HostValue, Mapping, ResourceId};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteEngine, SqliteOptions, SqliteOptionsBuilder};
