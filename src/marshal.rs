use crate::coercion::driver_to_host;
use crate::diagnostics::Diagnostics;
use crate::error::SqlBridgeError;
use crate::mapper::RowMapper;
use crate::results::{Cursor, RawRow};
use crate::types::Mapping;

/// Drain a cursor into mapped records, in cursor order.
///
/// Column names are read once up front. Each row is coerced column by column into a
/// `RawRow` and handed to `mapper` together with `mapping`. The cursor is left open; closing
/// it is the caller's job.
///
/// # Errors
/// Returns `SqlBridgeError` if fetching a row fails, a row's width does not match the
/// column metadata, or the mapper rejects a row.
pub fn marshal_rows<C, M, D>(
    cursor: &mut C,
    mapper: &M,
    mapping: Option<&Mapping>,
    diagnostics: &D,
) -> Result<Vec<M::Record>, SqlBridgeError>
where
    C: Cursor + ?Sized,
    M: RowMapper + ?Sized,
    D: Diagnostics + ?Sized,
{
    let column_names = cursor.column_names().to_vec();
    let mut records = Vec::new();

    while let Some(values) = cursor.next_row()? {
        if values.len() != column_names.len() {
            return Err(SqlBridgeError::ExecutionError(format!(
                "row has {} values but the result reports {} columns",
                values.len(),
                column_names.len()
            )));
        }

        let mut raw = RawRow::with_capacity(column_names.len());
        for (column, value) in column_names.iter().zip(values) {
            raw.insert(column.as_str(), driver_to_host(value, diagnostics));
        }
        records.push(mapper.transform(raw, mapping)?);
    }

    Ok(records)
}
