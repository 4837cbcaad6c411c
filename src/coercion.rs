//! Value coercion between host values and driver values.
//!
//! Host to driver is used when binding parameters, driver to host when marshalling result
//! columns. The `driver_to_host` match is the one place every driver type family has to be
//! accounted for; families without a host counterpart fall through to a single arm that
//! reports them and passes them along unconverted.

use chrono::DateTime;

use crate::diagnostics::Diagnostics;
use crate::types::{DriverValue, HostValue};

/// Coerce a host value into the value bound to the driver.
///
/// Null and the empty string bind as SQL NULL, instants bind as a SQL date carrying the same
/// epoch milliseconds, everything else is handed to the driver as is.
#[must_use]
pub fn host_to_driver(value: &HostValue) -> DriverValue {
    match value {
        HostValue::Null => DriverValue::Null,
        HostValue::Str(s) if s.is_empty() => DriverValue::Null,
        HostValue::Str(s) => DriverValue::Text(s.clone()),
        HostValue::Bool(b) => DriverValue::Bool(*b),
        HostValue::Num(n) => DriverValue::Double(*n),
        HostValue::Instant(millis) => match DateTime::from_timestamp_millis(*millis) {
            Some(dt) => DriverValue::Date(dt),
            // Out of chrono's range; let the driver see the raw number.
            None => DriverValue::Long(*millis),
        },
        HostValue::Unconverted(inner) => inner.clone(),
    }
}

/// Coerce a driver column value into a host value.
///
/// Values outside the table are reported through `diagnostics` and returned wrapped in
/// `HostValue::Unconverted`.
pub fn driver_to_host<D: Diagnostics + ?Sized>(value: DriverValue, diagnostics: &D) -> HostValue {
    match value {
        DriverValue::Null => HostValue::Null,
        DriverValue::Text(s) => HostValue::Str(s),
        DriverValue::Bool(b) => HostValue::Bool(b),
        DriverValue::Byte(n) => HostValue::Num(f64::from(n)),
        DriverValue::Short(n) => HostValue::Num(f64::from(n)),
        DriverValue::Int(n) => HostValue::Num(f64::from(n)),
        #[allow(clippy::cast_precision_loss)]
        DriverValue::Long(n) => HostValue::Num(n as f64),
        DriverValue::Float(n) => HostValue::Num(f64::from(n)),
        DriverValue::Double(n) => HostValue::Num(n),
        DriverValue::Decimal(text) => HostValue::Num(text.trim().parse().unwrap_or(f64::NAN)),
        DriverValue::Date(dt) | DriverValue::Time(dt) | DriverValue::Timestamp(dt) => {
            HostValue::Instant(dt.timestamp_millis())
        }
        other => {
            diagnostics.report_unsupported_type(&other.to_string(), other.type_name());
            HostValue::Unconverted(other)
        }
    }
}
