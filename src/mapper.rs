//! Row mappers turn a `RawRow` into the record handed back to the caller.

use std::marker::PhantomData;

use crate::error::SqlBridgeError;
use crate::results::RawRow;
use crate::types::Mapping;

/// Reshapes one raw row according to the request's mapping configuration.
///
/// Called once per cursor row, in cursor order. The bridge never looks inside the record.
pub trait RowMapper {
    type Record;

    /// Transform a raw row.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::MappingError` (or any other variant) if the row cannot be mapped.
    fn transform(
        &self,
        row: RawRow,
        mapping: Option<&Mapping>,
    ) -> Result<Self::Record, SqlBridgeError>;
}

/// Hands the raw row back untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMapper;

impl RowMapper for IdentityMapper {
    type Record = RawRow;

    fn transform(&self, row: RawRow, _mapping: Option<&Mapping>) -> Result<RawRow, SqlBridgeError> {
        Ok(row)
    }
}

/// Turns each row into a JSON object, the shape a scripting host consumes.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMapper;

impl RowMapper for JsonMapper {
    type Record = serde_json::Value;

    fn transform(
        &self,
        row: RawRow,
        _mapping: Option<&Mapping>,
    ) -> Result<serde_json::Value, SqlBridgeError> {
        serde_json::to_value(&row).map_err(|e| SqlBridgeError::MappingError(e.to_string()))
    }
}

/// Adapts a closure into a `RowMapper`.
///
/// ```rust
/// use sql_script_bridge::prelude::*;
///
/// let names = FnMapper::new(|row: RawRow, _mapping: Option<&Mapping>| {
///     Ok(row.get("NAME").and_then(HostValue::as_str).unwrap_or_default().to_owned())
/// });
/// # let _ = names;
/// ```
pub struct FnMapper<F, R> {
    func: F,
    _record: PhantomData<fn() -> R>,
}

impl<F, R> FnMapper<F, R>
where
    F: Fn(RawRow, Option<&Mapping>) -> Result<R, SqlBridgeError>,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            _record: PhantomData,
        }
    }
}

impl<F, R> RowMapper for FnMapper<F, R>
where
    F: Fn(RawRow, Option<&Mapping>) -> Result<R, SqlBridgeError>,
{
    type Record = R;

    fn transform(&self, row: RawRow, mapping: Option<&Mapping>) -> Result<R, SqlBridgeError> {
        (self.func)(row, mapping)
    }
}

impl<M: RowMapper + ?Sized> RowMapper for &M {
    type Record = M::Record;

    fn transform(
        &self,
        row: RawRow,
        mapping: Option<&Mapping>,
    ) -> Result<Self::Record, SqlBridgeError> {
        (**self).transform(row, mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HostValue;
    use serde_json::json;

    fn sample() -> RawRow {
        [
            ("ID", HostValue::Num(42.0)),
            ("NAME", HostValue::from("Ann")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn identity_returns_same_row() {
        let row = sample();
        assert_eq!(IdentityMapper.transform(row.clone(), None).unwrap(), row);
    }

    #[test]
    fn json_mapper_builds_object() {
        let value = JsonMapper.transform(sample(), None).unwrap();
        assert_eq!(value, json!({"ID": 42, "NAME": "Ann"}));
    }

    #[test]
    fn closure_mapper_sees_mapping_config() {
        let mapper = FnMapper::new(|row: RawRow, mapping: Option<&Mapping>| {
            let key = mapping
                .and_then(|m| m.get("key"))
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| SqlBridgeError::MappingError("no key".into()))?;
            Ok(row.get(key).cloned())
        });
        let mapping = json!({"key": "NAME"});
        assert_eq!(
            mapper.transform(sample(), Some(&mapping)).unwrap(),
            Some(HostValue::from("Ann"))
        );
        assert!(mapper.transform(sample(), None).is_err());
    }
}
