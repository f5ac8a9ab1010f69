pub mod model;
pub use model::{BoundExpression, ConditionalExpression, ConditionalOperator, DataType, JsonPrimitive, RowIdentity, NO_ROW};

pub mod cursor;
pub use cursor::{MemoryCursor, ResultCursor, ResultRow, RowData};

pub mod catalog;
pub use catalog::{ExpressionCatalog, MemoryExprCatalog};

pub mod config;
pub use config::ResolverConfig;

pub mod executor;
pub use executor::{ExpressionResolver, ResolveError, RowValueCache, ScriptEngine};
