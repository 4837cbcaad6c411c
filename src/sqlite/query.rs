use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::Statement;
use rusqlite::types::Value;

use crate::error::SqlBridgeError;
use crate::results::BufferedCursor;
use crate::types::DriverValue;

use super::params::Params;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// How a column's declared type shapes the values read from it.
///
/// `SQLite` stores a handful of storage classes; the declared type is what tells a `DATE`
/// column holding text apart from any other text column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclaredKind {
    Boolean,
    Date,
    Time,
    Timestamp,
    Decimal,
    TinyInt,
    SmallInt,
    Int,
    Untyped,
}

impl DeclaredKind {
    pub(crate) fn from_decl_type(decl: Option<&str>) -> Self {
        let Some(decl) = decl else {
            return DeclaredKind::Untyped;
        };
        let upper = decl.trim().to_ascii_uppercase();
        let base = upper.split('(').next().unwrap_or_default().trim();

        match base {
            b if b.starts_with("BOOL") => DeclaredKind::Boolean,
            "DATE" => DeclaredKind::Date,
            b if b.contains("DATETIME") || b.contains("TIMESTAMP") => DeclaredKind::Timestamp,
            b if b == "TIME" || b.starts_with("TIME ") => DeclaredKind::Time,
            b if b.starts_with("DECIMAL") || b.starts_with("NUMERIC") || b == "NUMBER" => {
                DeclaredKind::Decimal
            }
            "TINYINT" | "INT1" => DeclaredKind::TinyInt,
            "SMALLINT" | "INT2" => DeclaredKind::SmallInt,
            "INT" | "INT4" | "MEDIUMINT" => DeclaredKind::Int,
            _ => DeclaredKind::Untyped,
        }
    }

    fn temporal(self, dt: DateTime<Utc>) -> DriverValue {
        match self {
            DeclaredKind::Date => DriverValue::Date(dt),
            DeclaredKind::Time => DriverValue::Time(dt),
            _ => DriverValue::Timestamp(dt),
        }
    }
}

/// Classify one stored value using its column's declared type.
pub(crate) fn to_driver_value(value: Value, kind: DeclaredKind) -> DriverValue {
    use DeclaredKind as K;

    match (value, kind) {
        (Value::Null, _) => DriverValue::Null,

        (Value::Integer(i), K::Boolean) => DriverValue::Bool(i != 0),
        (Value::Text(s), K::Boolean) => match s.to_ascii_lowercase().as_str() {
            "true" => DriverValue::Bool(true),
            "false" => DriverValue::Bool(false),
            _ => DriverValue::Text(s),
        },

        (Value::Integer(ms), K::Date | K::Time | K::Timestamp) => {
            match DateTime::from_timestamp_millis(ms) {
                Some(dt) => kind.temporal(dt),
                None => DriverValue::Long(ms),
            }
        }
        (Value::Text(s), K::Date | K::Time | K::Timestamp) => match parse_temporal(&s) {
            Some(dt) => kind.temporal(dt),
            None => DriverValue::Text(s),
        },

        (Value::Integer(i), K::Decimal) => DriverValue::Decimal(i.to_string()),
        (Value::Real(f), K::Decimal) => DriverValue::Decimal(f.to_string()),
        (Value::Text(s), K::Decimal) if s.trim().parse::<f64>().is_ok() => {
            DriverValue::Decimal(s.trim().to_owned())
        }

        (Value::Integer(i), K::TinyInt) => i8::try_from(i).map_or(DriverValue::Long(i), DriverValue::Byte),
        (Value::Integer(i), K::SmallInt) => {
            i16::try_from(i).map_or(DriverValue::Long(i), DriverValue::Short)
        }
        (Value::Integer(i), K::Int) => i32::try_from(i).map_or(DriverValue::Long(i), DriverValue::Int),
        (Value::Integer(i), _) => DriverValue::Long(i),

        (Value::Real(f), _) => DriverValue::Double(f),
        (Value::Text(s), _) => DriverValue::Text(s),
        (Value::Blob(b), _) => DriverValue::Blob(b),
    }
}

/// Parse the text layouts `SQLite` date functions and drivers commonly write.
///
/// Values without an offset are read as UTC; time-only values land on 1970-01-01.
pub(crate) fn parse_temporal(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Some(dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN).and_utc());
    }
    let time = TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())?;
    Some(NaiveDate::from_ymd_opt(1970, 1, 1)?.and_time(time).and_utc())
}

/// Run a prepared statement and fetch every row into a cursor.
///
/// # Errors
/// Returns `SqlBridgeError::SqliteError` if the statement fails while stepping or reading rows.
pub fn build_cursor(stmt: &mut Statement, params: &Params) -> Result<BufferedCursor, SqlBridgeError> {
    let (column_names, kinds): (Vec<String>, Vec<DeclaredKind>) = stmt
        .columns()
        .iter()
        .map(|col| {
            (
                col.name().to_owned(),
                DeclaredKind::from_decl_type(col.decl_type()),
            )
        })
        .unzip();

    let param_refs = params.as_refs();
    let mut rows_iter = stmt.query(&param_refs[..])?;
    let mut rows = Vec::new();

    while let Some(row) = rows_iter.next()? {
        let mut values = Vec::with_capacity(kinds.len());
        for (idx, kind) in kinds.iter().enumerate() {
            let value: Value = row.get(idx)?;
            values.push(to_driver_value(value, *kind));
        }
        rows.push(values);
    }

    Ok(BufferedCursor::new(column_names, rows))
}
