use std::fmt::{self, Display};

use serde_json::Value;

use crate::model::{DataType, JsonPrimitive};

/// Failure raised while resolving an expression for a row.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// The binding has no compiled handle. Upstream contract violation.
    InvalidExpression { text: String },
    /// Script engine, field access or operator failure.
    Evaluation { message: String },
    /// Coercion to the declared type failed.
    IncompatibleType { value: Value, observed: JsonPrimitive, target: DataType },
}

impl ResolveError {
    pub fn invalid_expression(text: &str) -> Self {
        Self::InvalidExpression { text: text.to_string() }
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation { message: message.into() }
    }

    pub fn incompatible(value: Value, target: DataType) -> Self {
        let observed = JsonPrimitive::of_value(&value);
        Self::IncompatibleType { value, observed, target }
    }

    pub fn err<T>(self) -> Result<T, ResolveError> {
        Err(self)
    }

    /// `InvalidExpression` is the only kind that signals a broken compiler
    /// rather than bad data.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ResolveError::InvalidExpression { .. })
    }
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::InvalidExpression { text } => {
                write!(f, "InvalidExpression: no compiled handle for expression '{}'", text)
            }
            ResolveError::Evaluation { message } => write!(f, "EvaluationError: {}", message),
            ResolveError::IncompatibleType { value, observed, target } => write!(
                f,
                "IncompatibleType: cannot convert {} value {} to {}",
                observed, value, target
            ),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Rejected access to the read-only row projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowAccessError {
    NotSupported(&'static str),
}

impl Display for RowAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowAccessError::NotSupported(what) => write!(f, "{} on result set row is not supported.", what),
        }
    }
}

impl std::error::Error for RowAccessError {}
