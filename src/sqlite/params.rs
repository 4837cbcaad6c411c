use rusqlite::ToSql;
use rusqlite::types::Value;

use crate::types::DriverValue;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const TIME_FORMAT: &str = "%H:%M:%S%.3f";

// Largest magnitude below which every f64 integer is exact.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Convert a single driver value to a rusqlite `Value`.
///
/// Integral doubles bind as integers so `id = :id` compares the way scripts expect.
/// Temporals bind as UTC text, which the `DATE`/`TIME`/`TIMESTAMP` column readers parse back.
#[must_use]
pub fn driver_value_to_sqlite(value: &DriverValue) -> Value {
    match value {
        DriverValue::Null => Value::Null,
        DriverValue::Text(s) | DriverValue::Decimal(s) => Value::Text(s.clone()),
        DriverValue::Bool(b) => Value::Integer(i64::from(*b)),
        DriverValue::Byte(n) => Value::Integer(i64::from(*n)),
        DriverValue::Short(n) => Value::Integer(i64::from(*n)),
        DriverValue::Int(n) => Value::Integer(i64::from(*n)),
        DriverValue::Long(n) => Value::Integer(*n),
        DriverValue::Float(f) => Value::Real(f64::from(*f)),
        DriverValue::Double(f) => double_to_sqlite(*f),
        DriverValue::Date(dt) | DriverValue::Timestamp(dt) => {
            Value::Text(dt.format(TIMESTAMP_FORMAT).to_string())
        }
        DriverValue::Time(dt) => Value::Text(dt.format(TIME_FORMAT).to_string()),
        DriverValue::Blob(bytes) => Value::Blob(bytes.clone()),
        DriverValue::Other { value, .. } => Value::Text(value.clone()),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn double_to_sqlite(f: f64) -> Value {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < MAX_EXACT_INTEGER {
        Value::Integer(f as i64)
    } else {
        Value::Real(f)
    }
}

/// Positional `SQLite` parameters, in placeholder order.
#[derive(Debug, Clone, Default)]
pub struct Params(pub Vec<Value>);

impl Params {
    /// Convert driver values into `SQLite` values.
    #[must_use]
    pub fn convert(params: &[DriverValue]) -> Self {
        Params(params.iter().map(driver_value_to_sqlite).collect())
    }

    #[must_use]
    pub fn as_values(&self) -> &[Value] {
        &self.0
    }

    /// Borrowed params slice suitable for rusqlite execution.
    #[must_use]
    pub fn as_refs(&self) -> Vec<&dyn ToSql> {
        self.0.iter().map(|v| v as &dyn ToSql).collect()
    }
}
