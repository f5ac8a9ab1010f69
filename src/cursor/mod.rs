pub mod result_row;
pub use result_row::*;

pub mod result_cursor;
pub use result_cursor::*;

pub mod memory_cursor;
pub use memory_cursor::*;
