use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared result type of a bound expression.
///
/// Every scalar result is coerced to this type before it leaves the resolver.
/// `Any` and `Unknown` pass values through untouched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Any,
    Unknown,
    Boolean,
    Integer,
    Double,
    String,
    /// Calendar date, normalised to `YYYY-MM-DD`.
    Date,
    /// Time of day, normalised to `HH:MM:SS`.
    Time,
    /// Date and time, normalised to `YYYY-MM-DDTHH:MM:SS[.fff]`.
    DateTime,
}

impl DataType {
    pub fn is_passthrough(&self) -> bool {
        matches!(self, DataType::Any | DataType::Unknown)
    }
}

impl TryFrom<&str> for DataType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "any" => Ok(DataType::Any),
            "unknown" => Ok(DataType::Unknown),
            "boolean" | "bool" => Ok(DataType::Boolean),
            "integer" | "int" => Ok(DataType::Integer),
            "double" | "float" | "decimal" => Ok(DataType::Double),
            "string" => Ok(DataType::String),
            "date" => Ok(DataType::Date),
            "time" => Ok(DataType::Time),
            "datetime" | "timestamp" => Ok(DataType::DateTime),
            _ => Err(format!("Invalid data type: '{}'", value)),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Any => "any",
            DataType::Unknown => "unknown",
            DataType::Boolean => "boolean",
            DataType::Integer => "integer",
            DataType::Double => "double",
            DataType::String => "string",
            DataType::Date => "date",
            DataType::Time => "time",
            DataType::DateTime => "datetime",
        };
        f.write_str(name)
    }
}
