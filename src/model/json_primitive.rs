use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Runtime kind of a value, reported as the observed side of coercion and
/// comparison failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonPrimitive {
    Null,
    Bool,
    Int,
    Float,
    String,
    Object,
    Array,
}

impl JsonPrimitive {
    pub fn of_value(v: &Value) -> JsonPrimitive {
        use JsonPrimitive::*;
        match v {
            Value::Null => Null,
            Value::Bool(_) => Bool,
            // u64 above i64::MAX is still an integer
            Value::Number(n) if n.is_f64() => Float,
            Value::Number(_) => Int,
            Value::String(_) => String,
            Value::Array(_) => Array,
            Value::Object(_) => Object,
        }
    }

    /// Int and Float order against each other and against numeric strings.
    pub fn is_numeric(&self) -> bool {
        matches!(self, JsonPrimitive::Int | JsonPrimitive::Float)
    }

    pub fn name(&self) -> &'static str {
        match self {
            JsonPrimitive::Null => "null",
            JsonPrimitive::Bool => "bool",
            JsonPrimitive::Int => "int",
            JsonPrimitive::Float => "float",
            JsonPrimitive::String => "string",
            JsonPrimitive::Object => "object",
            JsonPrimitive::Array => "array",
        }
    }
}

impl fmt::Display for JsonPrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
