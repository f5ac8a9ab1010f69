use serde_json::Value;

use crate::{
    cursor::RowData,
    executor::ResolveError,
    model::{OpaqueExpression, RowIdentity},
};

/// Evaluation scope handed to a script engine: the row being evaluated and
/// its cursor position.
#[derive(Clone, Copy)]
pub struct RowScope<'r> {
    pub row_index: RowIdentity,
    pub row: Option<&'r dyn RowData>,
}

impl<'r> RowScope<'r> {
    pub fn new(row_index: RowIdentity, row: Option<&'r dyn RowData>) -> Self {
        Self { row_index, row }
    }
}

/// Evaluates expressions that are not direct column reads.
pub trait ScriptEngine {
    fn evaluate(&self, expr: &OpaqueExpression, scope: &RowScope<'_>) -> Result<Value, ResolveError>;
}

impl<F> ScriptEngine for F
where
    F: Fn(&OpaqueExpression, &RowScope<'_>) -> Result<Value, ResolveError>,
{
    fn evaluate(&self, expr: &OpaqueExpression, scope: &RowScope<'_>) -> Result<Value, ResolveError> {
        self(expr, scope)
    }
}

/// Rejects every opaque expression. For pipelines that only bind columns.
pub struct NoScriptEngine;

impl ScriptEngine for NoScriptEngine {
    fn evaluate(&self, expr: &OpaqueExpression, _scope: &RowScope<'_>) -> Result<Value, ResolveError> {
        ResolveError::evaluation(format!("no script engine available to evaluate '{}'", expr.source)).err()
    }
}

/// Small engine for literal and field-access expressions.
///
/// Understands JSON literals, `row.name`, `row["name"]`, `row[n]` (`row[0]`
/// is the row position) and the one-argument string functions `upper`,
/// `lower`, `trim` and `length`.
pub struct BasicScriptEngine;

impl ScriptEngine for BasicScriptEngine {
    fn evaluate(&self, expr: &OpaqueExpression, scope: &RowScope<'_>) -> Result<Value, ResolveError> {
        Self::eval_source(expr.source.trim(), scope)
    }
}

impl BasicScriptEngine {
    fn eval_source(source: &str, scope: &RowScope<'_>) -> Result<Value, ResolveError> {
        if let Some((name, arg)) = Self::split_call(source) {
            let value = Self::eval_source(arg.trim(), scope)?;
            return Self::eval_function(name, value);
        }
        if let Some(field) = source.strip_prefix("row.") {
            return Self::read_field(scope, field);
        }
        if let Some(inner) = source.strip_prefix("row[").and_then(|s| s.strip_suffix(']')) {
            let inner = inner.trim();
            if let Ok(index) = inner.parse::<usize>() {
                if index == 0 {
                    return Ok(Value::from(scope.row_index));
                }
                return match scope.row {
                    Some(row) => Ok(row.field_by_index(index)?.clone()),
                    None => Ok(Value::Null),
                };
            }
            if let Ok(Value::String(name)) = serde_json::from_str::<Value>(inner) {
                return Self::read_field(scope, &name);
            }
        }
        serde_json::from_str::<Value>(source)
            .map_err(|_| ResolveError::evaluation(format!("cannot evaluate expression '{}'", source)))
    }

    fn split_call(source: &str) -> Option<(&str, &str)> {
        let open = source.find('(')?;
        let inner = source.strip_suffix(')')?.get(open + 1..)?;
        let name = source[..open].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return None;
        }
        Some((name, inner))
    }

    fn read_field(scope: &RowScope<'_>, name: &str) -> Result<Value, ResolveError> {
        match scope.row {
            Some(row) => Ok(row.field_by_name(name)?.clone()),
            None => Ok(Value::Null),
        }
    }

    fn eval_function(name: &str, arg: Value) -> Result<Value, ResolveError> {
        let lname = name.to_ascii_lowercase();
        match (lname.as_str(), arg) {
            (_, Value::Null) => Ok(Value::Null),
            ("upper", Value::String(s)) => Ok(Value::String(s.to_uppercase())),
            ("lower", Value::String(s)) => Ok(Value::String(s.to_lowercase())),
            ("trim", Value::String(s)) => Ok(Value::String(s.trim().to_string())),
            ("length", Value::String(s)) => Ok(Value::from(s.chars().count() as i64)),
            (_, other) => ResolveError::evaluation(format!("function {}({}) is not supported", name, other)).err(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cursor::ResultRow;

    fn eval(source: &str, row_index: RowIdentity, row: Option<&dyn RowData>) -> Result<Value, ResolveError> {
        BasicScriptEngine.evaluate(&OpaqueExpression::new(source), &RowScope::new(row_index, row))
    }

    #[test]
    fn literals_and_field_access() {
        let row = ResultRow::from_value(json!({ "name": " Ana ", "age": 31 })).unwrap();
        assert_eq!(eval("42", 0, None), Ok(json!(42)));
        assert_eq!(eval("\"x\"", 0, None), Ok(json!("x")));
        assert_eq!(eval("row.age", 0, Some(&row)), Ok(json!(31)));
        assert_eq!(eval("row[\"name\"]", 0, Some(&row)), Ok(json!(" Ana ")));
        assert_eq!(eval("row[2]", 0, Some(&row)), Ok(json!(31)));
        assert_eq!(eval("row[0]", 9, Some(&row)), Ok(json!(9)));
        assert_eq!(eval("row.age", 0, None), Ok(Value::Null));
    }

    #[test]
    fn string_functions_nest() {
        let row = ResultRow::from_value(json!({ "name": " Ana " })).unwrap();
        assert_eq!(eval("upper(trim(row.name))", 0, Some(&row)), Ok(json!("ANA")));
        assert_eq!(eval("length(\"hé\")", 0, None), Ok(json!(2)));
        assert_eq!(eval("lower(null)", 0, None), Ok(Value::Null));
        assert!(eval("upper(1)", 0, None).is_err());
    }

    #[test]
    fn unknown_fields_and_garbage_fail() {
        let row = ResultRow::from_value(json!({ "a": 1 })).unwrap();
        assert!(eval("row.b", 0, Some(&row)).is_err());
        assert!(eval("row.a +", 0, Some(&row)).is_err());
        assert!(NoScriptEngine.evaluate(&OpaqueExpression::new("1"), &RowScope::new(0, None)).is_err());
    }

    #[test]
    fn closures_are_engines() {
        let engine = |expr: &OpaqueExpression, scope: &RowScope<'_>| -> Result<Value, ResolveError> {
            Ok(json!(format!("{}@{}", expr.source, scope.row_index)))
        };
        let value = engine.evaluate(&OpaqueExpression::new("x"), &RowScope::new(3, None));
        assert_eq!(value, Ok(json!("x@3")));
    }
}
