pub mod expr_catalog;
pub use expr_catalog::*;
