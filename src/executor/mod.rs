pub mod resolve_error;
pub use resolve_error::*;

pub mod script_engine;
pub use script_engine::*;

pub mod type_converter;
pub use type_converter::*;

pub mod condition_eval;
pub use condition_eval::*;

pub mod expression_resolver;
pub use expression_resolver::*;

pub mod row_value_cache;
pub use row_value_cache::*;
