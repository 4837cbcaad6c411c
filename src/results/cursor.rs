use crate::error::SqlBridgeError;
use crate::types::DriverValue;

/// Stateful handle over a statement's result rows.
///
/// Engines hand one out per query; the bridge reads the column names once, pulls rows until
/// exhaustion and then closes it, on the error path as well.
pub trait Cursor {
    /// Column names in result order, as reported by the result metadata.
    fn column_names(&self) -> &[String];

    /// Advance to the next row, returning its driver values in column order.
    ///
    /// # Errors
    /// Returns `SqlBridgeError` if the driver fails while fetching or the cursor is closed.
    fn next_row(&mut self) -> Result<Option<Vec<DriverValue>>, SqlBridgeError>;

    /// Release the cursor. Closing twice is not an error.
    ///
    /// # Errors
    /// Returns `SqlBridgeError` if the driver fails to release the result.
    fn close(&mut self) -> Result<(), SqlBridgeError>;
}

/// Cursor over rows that were fully fetched from the driver up front.
#[derive(Debug)]
pub struct BufferedCursor {
    column_names: Vec<String>,
    rows: std::vec::IntoIter<Vec<DriverValue>>,
    closed: bool,
}

impl BufferedCursor {
    #[must_use]
    pub fn new(column_names: Vec<String>, rows: Vec<Vec<DriverValue>>) -> Self {
        Self {
            column_names,
            rows: rows.into_iter(),
            closed: false,
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Rows not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl Cursor for BufferedCursor {
    fn column_names(&self) -> &[String] {
        &self.column_names
    }

    fn next_row(&mut self) -> Result<Option<Vec<DriverValue>>, SqlBridgeError> {
        if self.closed {
            return Err(SqlBridgeError::ExecutionError(
                "cursor already closed".into(),
            ));
        }
        Ok(self.rows.next())
    }

    fn close(&mut self) -> Result<(), SqlBridgeError> {
        self.closed = true;
        // drop whatever was not consumed
        self.rows = Vec::new().into_iter();
        Ok(())
    }
}

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    fn column_names(&self) -> &[String] {
        (**self).column_names()
    }

    fn next_row(&mut self) -> Result<Option<Vec<DriverValue>>, SqlBridgeError> {
        (**self).next_row()
    }

    fn close(&mut self) -> Result<(), SqlBridgeError> {
        (**self).close()
    }
}
