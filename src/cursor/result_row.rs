use std::fmt::{self, Display};

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::executor::ResolveError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    UnknownName(String),
    IndexOutOfRange { index: usize, len: usize },
}

impl Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::UnknownName(name) => write!(f, "invalid field name '{}'", name),
            FieldError::IndexOutOfRange { index, len } => {
                write!(f, "field index {} out of range 1..={}", index, len)
            }
        }
    }
}

impl std::error::Error for FieldError {}

impl From<FieldError> for ResolveError {
    fn from(value: FieldError) -> Self {
        ResolveError::evaluation(value.to_string())
    }
}

/// Read-only field access for one materialised row.
pub trait RowData {
    /// 1-based positional read.
    fn field_by_index(&self, index: usize) -> Result<&Value, FieldError>;
    fn field_by_name(&self, name: &str) -> Result<&Value, FieldError>;
    fn field_count(&self) -> usize;
}

/// Row whose fields keep their insertion order, so every field is reachable
/// both by name and by position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow(pub IndexMap<String, Value>);

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn from_object(map: Map<String, Value>) -> Self {
        Self(map.into_iter().collect())
    }

    /// Accepts a JSON object; anything else is rejected.
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Object(map) => Ok(Self::from_object(map)),
            other => Err(format!("Row must be a JSON object, got {}", other)),
        }
    }
}

impl RowData for ResultRow {
    fn field_by_index(&self, index: usize) -> Result<&Value, FieldError> {
        // position 0 is the row-position pseudo-column and never a stored field
        index
            .checked_sub(1)
            .and_then(|i| self.0.get_index(i))
            .map(|(_, v)| v)
            .ok_or(FieldError::IndexOutOfRange { index, len: self.0.len() })
    }

    fn field_by_name(&self, name: &str) -> Result<&Value, FieldError> {
        self.0.get(name).ok_or_else(|| FieldError::UnknownName(name.to_string()))
    }

    fn field_count(&self) -> usize {
        self.0.len()
    }
}
