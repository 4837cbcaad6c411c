use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque row-mapping configuration, handed untouched to the `RowMapper`.
pub type Mapping = serde_json::Value;

/// Host-side parameter set keyed by parameter name.
pub type HostParams = HashMap<String, HostValue>;

/// Values as the scripting host sees them.
///
/// This is the only vocabulary the bridge hands to callers. `Unconverted` carries a driver
/// value the coercion table has no entry for; it is always reported through `Diagnostics`
/// before it is handed out.
/// ```rust
/// use sql_script_bridge::prelude::*;
///
/// let params = HostParams::from([
///     ("id".to_string(), HostValue::from("42")),
///     ("active".to_string(), HostValue::Bool(true)),
/// ]);
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HostValue {
    #[default]
    Null,
    Str(String),
    Bool(bool),
    Num(f64),
    /// Milliseconds since the Unix epoch.
    Instant(i64),
    Unconverted(DriverValue),
}

impl HostValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        if let HostValue::Str(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        if let HostValue::Bool(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        if let HostValue::Num(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_epoch_millis(&self) -> Option<i64> {
        if let HostValue::Instant(millis) = self {
            Some(*millis)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        self.as_epoch_millis().and_then(DateTime::from_timestamp_millis)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::Str(value.to_owned())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::Str(value)
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Num(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        HostValue::Num(f64::from(value))
    }
}

impl From<i64> for HostValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        HostValue::Num(value as f64)
    }
}

impl From<DateTime<Utc>> for HostValue {
    fn from(value: DateTime<Utc>) -> Self {
        HostValue::Instant(value.timestamp_millis())
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(HostValue::Null, Into::into)
    }
}

impl Serialize for HostValue {
    #[allow(clippy::cast_possible_truncation)]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HostValue::Null => serializer.serialize_none(),
            HostValue::Str(value) => serializer.serialize_str(value),
            HostValue::Bool(value) => serializer.serialize_bool(*value),
            HostValue::Num(value) => {
                if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
                    serializer.serialize_i64(*value as i64)
                } else {
                    serializer.serialize_f64(*value)
                }
            }
            HostValue::Instant(millis) => match DateTime::from_timestamp_millis(*millis) {
                Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
                None => serializer.serialize_i64(*millis),
            },
            HostValue::Unconverted(value) => serializer.collect_str(value),
        }
    }
}

impl<'de> Deserialize<'de> for HostValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bool(bool),
            Num(f64),
            Str(String),
        }

        Ok(match Option::<Repr>::deserialize(deserializer)? {
            None => HostValue::Null,
            Some(Repr::Bool(value)) => HostValue::Bool(value),
            Some(Repr::Num(value)) => HostValue::Num(value),
            Some(Repr::Str(value)) => HostValue::Str(value),
        })
    }
}

/// Values as a SQL driver hands them over, one variant per driver type family.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverValue {
    Null,
    Text(String),
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// Arbitrary-precision decimal in its textual form.
    Decimal(String),
    Date(DateTime<Utc>),
    Time(DateTime<Utc>),
    Timestamp(DateTime<Utc>),
    Blob(Vec<u8>),
    /// Any driver type this crate has no family for.
    Other { type_name: String, value: String },
}

impl DriverValue {
    /// Driver class name, as reported in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            DriverValue::Null => "NULL",
            DriverValue::Text(_) => "TEXT",
            DriverValue::Bool(_) => "BOOLEAN",
            DriverValue::Byte(_) => "TINYINT",
            DriverValue::Short(_) => "SMALLINT",
            DriverValue::Int(_) => "INTEGER",
            DriverValue::Long(_) => "BIGINT",
            DriverValue::Float(_) => "FLOAT",
            DriverValue::Double(_) => "DOUBLE",
            DriverValue::Decimal(_) => "DECIMAL",
            DriverValue::Date(_) => "DATE",
            DriverValue::Time(_) => "TIME",
            DriverValue::Timestamp(_) => "TIMESTAMP",
            DriverValue::Blob(_) => "BLOB",
            DriverValue::Other { type_name, .. } => type_name,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Epoch milliseconds of a temporal value.
    #[must_use]
    pub fn epoch_millis(&self) -> Option<i64> {
        match self {
            DriverValue::Date(dt) | DriverValue::Time(dt) | DriverValue::Timestamp(dt) => {
                Some(dt.timestamp_millis())
            }
            _ => None,
        }
    }
}

impl fmt::Display for DriverValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverValue::Null => f.write_str("null"),
            DriverValue::Text(value) | DriverValue::Decimal(value) => f.write_str(value),
            DriverValue::Bool(value) => write!(f, "{value}"),
            DriverValue::Byte(value) => write!(f, "{value}"),
            DriverValue::Short(value) => write!(f, "{value}"),
            DriverValue::Int(value) => write!(f, "{value}"),
            DriverValue::Long(value) => write!(f, "{value}"),
            DriverValue::Float(value) => write!(f, "{value}"),
            DriverValue::Double(value) => write!(f, "{value}"),
            DriverValue::Date(dt) => write!(f, "{}", dt.format("%Y-%m-%d")),
            DriverValue::Time(dt) => write!(f, "{}", dt.format("%H:%M:%S")),
            DriverValue::Timestamp(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.3f")),
            DriverValue::Blob(bytes) => write!(f, "blob({} bytes)", bytes.len()),
            DriverValue::Other { value, .. } => f.write_str(value),
        }
    }
}

/// Name of a database resource (connection/session) known to the engine's registry.
///
/// Requests carry `Option<ResourceId>`; `None` addresses the registry's default resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(String);

impl ResourceId {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Map a host-supplied name to a resource, treating missing and empty names as the default.
    #[must_use]
    pub fn from_host(name: Option<&str>) -> Option<Self> {
        match name {
            Some(name) if !name.is_empty() => Some(Self::new(name)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ResourceId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

pub(crate) fn describe_resource(resource: Option<&ResourceId>) -> &str {
    resource.map_or("<default>", ResourceId::as_str)
}
