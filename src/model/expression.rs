use std::fmt;

use crate::model::{ConditionalExpression, ConditionalOperator, DataType};

/// Cursor position of a row. `NO_ROW` means "before the first row".
pub type RowIdentity = i64;

pub const NO_ROW: RowIdentity = -1;

/// Direct column access that bypasses the script engine.
///
/// Indexes are 1-based; index `0` is the row-position pseudo-column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnReference {
    Index(usize),
    Name(String),
}

/// Expression source handed to the script engine as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpaqueExpression {
    pub source: String,
}

impl OpaqueExpression {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScalarExpression {
    Column(ColumnReference),
    Opaque(OpaqueExpression),
}

/// Compiled form of a bound expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionHandle {
    Scalar(ScalarExpression),
    Conditional(Box<ConditionalExpression>),
}

/// A named binding's compiled expression plus its declared result type and
/// source text.
///
/// `handle` is `None` when the compiler never produced a handle for the
/// expression; resolving such a binding is an invalid-expression error.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundExpression {
    pub handle: Option<ExpressionHandle>,
    pub data_type: DataType,
    pub text: String,
}

impl BoundExpression {
    pub fn new(handle: ExpressionHandle, data_type: DataType, text: impl Into<String>) -> Self {
        Self { handle: Some(handle), data_type, text: text.into() }
    }

    pub fn uncompiled(text: impl Into<String>) -> Self {
        Self { handle: None, data_type: DataType::Any, text: text.into() }
    }

    pub fn column_index(index: usize) -> Self {
        let text = format!("row[{}]", index);
        Self::new(ExpressionHandle::Scalar(ScalarExpression::Column(ColumnReference::Index(index))), DataType::Any, text)
    }

    pub fn column_name(name: &str) -> Self {
        let text = format!("row[\"{}\"]", name);
        Self::new(
            ExpressionHandle::Scalar(ScalarExpression::Column(ColumnReference::Name(name.to_string()))),
            DataType::Any,
            text,
        )
    }

    pub fn opaque(source: &str) -> Self {
        Self::new(ExpressionHandle::Scalar(ScalarExpression::Opaque(OpaqueExpression::new(source))), DataType::Any, source)
    }

    pub fn conditional(conditional: ConditionalExpression) -> Self {
        let text = conditional.to_string();
        Self::new(ExpressionHandle::Conditional(Box::new(conditional)), DataType::Any, text)
    }

    pub fn typed(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn is_column_reference(&self) -> bool {
        matches!(self.handle, Some(ExpressionHandle::Scalar(ScalarExpression::Column(_))))
    }
}

impl fmt::Display for ConditionalExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.expression.text, self.operator)?;
        match (&self.operand1, &self.operand2, self.operator) {
            (Some(a), Some(b), ConditionalOperator::Between | ConditionalOperator::NotBetween) => {
                write!(f, " {} AND {}", a.text, b.text)
            }
            (Some(a), Some(b), _) => write!(f, " {}, {}", a.text, b.text),
            (Some(a), None, _) => write!(f, " {}", a.text),
            _ => Ok(()),
        }
    }
}
