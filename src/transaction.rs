use crate::diagnostics::Diagnostics;
use crate::engine::SqlEngine;
use crate::error::SqlBridgeError;
use crate::executor::SqlBridge;
use crate::mapper::RowMapper;
use crate::types::{ResourceId, describe_resource};

impl<E, M, D> SqlBridge<E, M, D>
where
    E: SqlEngine,
    M: RowMapper,
    D: Diagnostics,
{
    /// Commit the resource's current unit of work.
    ///
    /// # Errors
    /// Returns the registry's error unchanged.
    pub fn commit(&self, resource: Option<&ResourceId>) -> Result<(), SqlBridgeError> {
        tracing::debug!(resource = describe_resource(resource), "commit");
        self.engine().commit(resource)
    }

    /// Roll back the resource's current unit of work.
    ///
    /// # Errors
    /// Returns the registry's error unchanged.
    pub fn rollback(&self, resource: Option<&ResourceId>) -> Result<(), SqlBridgeError> {
        tracing::debug!(resource = describe_resource(resource), "rollback");
        self.engine().rollback(resource)
    }

    /// Release every resource the registry holds, whatever its name.
    ///
    /// # Errors
    /// Returns the registry's error unchanged.
    pub fn close_all(&self) -> Result<(), SqlBridgeError> {
        tracing::debug!("close all resources");
        self.engine().close_all()
    }
}
