//! Sink for non-fatal reports raised while crossing the driver/host boundary.

use std::sync::Mutex;

/// Receives a report whenever a driver value has no entry in the coercion table.
pub trait Diagnostics {
    /// Report a value left unconverted.
    ///
    /// # Arguments
    /// * `value_description` - The value rendered as text
    /// * `driver_class_name` - The driver type family the value belongs to
    fn report_unsupported_type(&self, value_description: &str, driver_class_name: &str);
}

/// Default sink: emits a `tracing` warning per report.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report_unsupported_type(&self, value_description: &str, driver_class_name: &str) {
        tracing::warn!(
            value = value_description,
            driver_type = driver_class_name,
            "[{value_description}] is an instance of {driver_class_name} which is not supported"
        );
    }
}

/// Sink that keeps every report in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    reports: Mutex<Vec<UnsupportedTypeReport>>,
}

/// One recorded report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedTypeReport {
    pub value_description: String,
    pub driver_class_name: String,
}

impl RecordingDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the reports received so far.
    #[must_use]
    pub fn reports(&self) -> Vec<UnsupportedTypeReport> {
        match self.reports.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reports().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn report_unsupported_type(&self, value_description: &str, driver_class_name: &str) {
        let report = UnsupportedTypeReport {
            value_description: value_description.to_owned(),
            driver_class_name: driver_class_name.to_owned(),
        };
        let mut guard = match self.reports.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(report);
    }
}

impl<D: Diagnostics + ?Sized> Diagnostics for &D {
    fn report_unsupported_type(&self, value_description: &str, driver_class_name: &str) {
        (**self).report_unsupported_type(value_description, driver_class_name);
    }
}

impl<D: Diagnostics + ?Sized> Diagnostics for std::sync::Arc<D> {
    fn report_unsupported_type(&self, value_description: &str, driver_class_name: &str) {
        (**self).report_unsupported_type(value_description, driver_class_name);
    }
}
