use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use ordered_float::NotNan;
use serde_json::{Number, Value};

use crate::{executor::ResolveError, model::DataType};

/// Coerces a raw value to a declared `DataType`.
pub trait TypeConverter {
    /// Fails with `ResolveError::IncompatibleType` when `value` has no
    /// representation in `target`.
    fn convert(&self, value: Value, target: DataType) -> Result<Value, ResolveError>;
}

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const TIME_FORMATS: [&str; 3] = ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

/// Null stays null for every target; `Any`/`Unknown` pass values through.
pub struct DefaultTypeConverter;

impl TypeConverter for DefaultTypeConverter {
    fn convert(&self, value: Value, target: DataType) -> Result<Value, ResolveError> {
        if value.is_null() || target.is_passthrough() {
            return Ok(value);
        }
        let converted = match target {
            DataType::Boolean => Self::to_boolean(&value),
            DataType::Integer => Self::to_integer(&value),
            DataType::Double => Self::to_double(&value),
            DataType::String => Self::to_text(&value),
            DataType::Date => Self::to_datetime(&value).map(|dt| Value::String(dt.date().format("%Y-%m-%d").to_string())),
            DataType::Time => Self::to_time(&value).map(|t| Value::String(t.format("%H:%M:%S").to_string())),
            DataType::DateTime => {
                Self::to_datetime(&value).map(|dt| Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            }
            DataType::Any | DataType::Unknown => Some(value.clone()),
        };
        converted.ok_or_else(|| ResolveError::incompatible(value, target))
    }
}

impl DefaultTypeConverter {
    fn finite(f: f64) -> Option<NotNan<f64>> {
        if f.is_finite() { NotNan::new(f).ok() } else { None }
    }

    fn parse_number(s: &str) -> Option<NotNan<f64>> {
        s.trim().parse::<f64>().ok().and_then(Self::finite)
    }

    fn truncate(f: NotNan<f64>) -> Option<Value> {
        let t = f.into_inner().trunc();
        // i64::MAX as f64 rounds up to 2^63, which is already out of range
        if t >= i64::MIN as f64 && t < i64::MAX as f64 { Some(Value::from(t as i64)) } else { None }
    }

    pub fn to_boolean(value: &Value) -> Option<Value> {
        match value {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::Number(n) => n.as_f64().map(|f| Value::Bool(f != 0.0)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                other => Self::parse_number(other).map(|f| Value::Bool(f.into_inner() != 0.0)),
            },
            _ => None,
        }
    }

    fn to_integer(value: &Value) -> Option<Value> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Some(Value::from(i));
                }
                if let Some(u) = n.as_u64() {
                    return i64::try_from(u).ok().map(Value::from);
                }
                n.as_f64().and_then(Self::finite).and_then(Self::truncate)
            }
            Value::Bool(b) => Some(Value::from(*b as i64)),
            Value::String(s) => match s.trim().parse::<i64>() {
                Ok(i) => Some(Value::from(i)),
                Err(_) => Self::parse_number(s).and_then(Self::truncate),
            },
            _ => None,
        }
    }

    fn to_double(value: &Value) -> Option<Value> {
        let f = match value {
            Value::Number(n) => n.as_f64().and_then(Self::finite),
            Value::Bool(b) => Self::finite(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => Self::parse_number(s),
            _ => None,
        }?;
        Number::from_f64(f.into_inner()).map(Value::Number)
    }

    fn to_text(value: &Value) -> Option<Value> {
        match value {
            Value::String(s) => Some(Value::String(s.clone())),
            Value::Number(n) => Some(Value::String(n.to_string())),
            Value::Bool(b) => Some(Value::String(b.to_string())),
            Value::Array(_) | Value::Object(_) => serde_json::to_string(value).ok().map(Value::String),
            Value::Null => None,
        }
    }

    /// Epoch milliseconds or a date/datetime string.
    pub fn to_datetime(value: &Value) -> Option<NaiveDateTime> {
        match value {
            Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis).map(|dt| dt.naive_utc()),
            Value::String(s) => Self::parse_datetime(s.trim()),
            _ => None,
        }
    }

    fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.naive_local());
        }
        DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0)))
    }

    fn to_time(value: &Value) -> Option<NaiveTime> {
        if let Value::String(s) = value {
            let s = s.trim();
            if let Some(t) = TIME_FORMATS.iter().find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok()) {
                return Some(t);
            }
        }
        Self::to_datetime(value).map(|dt| dt.time())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::JsonPrimitive;

    fn convert(value: Value, target: DataType) -> Result<Value, ResolveError> {
        DefaultTypeConverter.convert(value, target)
    }

    #[test]
    fn null_and_passthrough_targets_are_untouched() {
        assert_eq!(convert(Value::Null, DataType::Integer), Ok(Value::Null));
        assert_eq!(convert(json!({"a": 1}), DataType::Any), Ok(json!({"a": 1})));
        assert_eq!(convert(json!([1]), DataType::Unknown), Ok(json!([1])));
    }

    #[test]
    fn integer_coercion() {
        assert_eq!(convert(json!(7), DataType::Integer), Ok(json!(7)));
        assert_eq!(convert(json!(7.9), DataType::Integer), Ok(json!(7)));
        assert_eq!(convert(json!(-7.9), DataType::Integer), Ok(json!(-7)));
        assert_eq!(convert(json!(" 12 "), DataType::Integer), Ok(json!(12)));
        assert_eq!(convert(json!("3.5"), DataType::Integer), Ok(json!(3)));
        assert_eq!(convert(json!(true), DataType::Integer), Ok(json!(1)));
    }

    #[test]
    fn non_numeric_string_to_integer_is_incompatible() {
        assert_eq!(
            convert(json!("abc"), DataType::Integer),
            Err(ResolveError::IncompatibleType {
                value: json!("abc"),
                observed: JsonPrimitive::String,
                target: DataType::Integer
            })
        );
        assert!(convert(json!("NaN"), DataType::Double).is_err());
        assert!(convert(json!([1, 2]), DataType::Integer).is_err());
    }

    #[test]
    fn integer_out_of_range_is_incompatible_not_clamped() {
        let two_pow_63 = 9223372036854775808.0_f64;
        assert!(matches!(
            convert(json!(two_pow_63), DataType::Integer),
            Err(ResolveError::IncompatibleType { target: DataType::Integer, .. })
        ));
        assert!(matches!(
            convert(json!("9223372036854775808"), DataType::Integer),
            Err(ResolveError::IncompatibleType { observed: JsonPrimitive::String, .. })
        ));
        assert!(convert(json!(9223372036854775808_u64), DataType::Integer).is_err());
        assert!(convert(json!("1e19"), DataType::Integer).is_err());
        assert_eq!(convert(json!(-two_pow_63), DataType::Integer), Ok(json!(i64::MIN)));
        assert_eq!(convert(json!("9223372036854775807"), DataType::Integer), Ok(json!(i64::MAX)));
    }

    #[test]
    fn double_boolean_and_string() {
        assert_eq!(convert(json!("2.5"), DataType::Double), Ok(json!(2.5)));
        assert_eq!(convert(json!(false), DataType::Double), Ok(json!(0.0)));
        assert_eq!(convert(json!("TRUE"), DataType::Boolean), Ok(json!(true)));
        assert_eq!(convert(json!(0), DataType::Boolean), Ok(json!(false)));
        assert!(convert(json!("maybe"), DataType::Boolean).is_err());
        assert_eq!(convert(json!(10), DataType::String), Ok(json!("10")));
        assert_eq!(convert(json!([1, 2]), DataType::String), Ok(json!("[1,2]")));
    }

    #[test]
    fn date_and_time_normalisation() {
        assert_eq!(convert(json!("2025-02-14"), DataType::Date), Ok(json!("2025-02-14")));
        assert_eq!(convert(json!("2025-02-14 08:30:00"), DataType::Date), Ok(json!("2025-02-14")));
        assert_eq!(convert(json!("2025-02-14T08:30:00Z"), DataType::Time), Ok(json!("08:30:00")));
        assert_eq!(convert(json!("08:30"), DataType::Time), Ok(json!("08:30:00")));
        assert_eq!(convert(json!(0), DataType::Date), Ok(json!("1970-01-01")));

        let dt = convert(json!("2025-02-14 08:30:15"), DataType::DateTime).unwrap();
        assert!(dt.as_str().unwrap().starts_with("2025-02-14T08:30:15"));

        assert!(convert(json!("yesterday"), DataType::Date).is_err());
        assert!(convert(json!(true), DataType::DateTime).is_err());
    }
}
