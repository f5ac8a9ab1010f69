use std::fmt::{self, Display};

use crate::{cursor::RowData, model::RowIdentity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorError {
    pub message: String,
}

impl CursorError {
    pub fn new(message: &str) -> Self {
        Self { message: message.to_string() }
    }
}

impl Display for CursorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CursorError: {}", self.message)
    }
}

impl std::error::Error for CursorError {}

/// Forward cursor over materialised result rows.
///
/// Both methods take `&self`: the driver advances the cursor while readers
/// such as `RowValueCache` hold a shared borrow of it.
pub trait ResultCursor {
    /// Position of the current row, `NO_ROW` before the first one.
    fn current_row_identity(&self) -> Result<RowIdentity, CursorError>;
    fn current_row(&self) -> Option<&dyn RowData>;
}
