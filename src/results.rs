mod cursor;
mod row;

pub use cursor::{BufferedCursor, Cursor};
pub use row::RawRow;
