pub mod json_primitive;
pub use json_primitive::*;

pub mod data_type;
pub use data_type::*;

pub mod expression;
pub use expression::*;

pub mod conditional;
pub use conditional::*;
