use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::Mutex,
};

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::{
    executor::{DefaultTypeConverter, ResolveError},
    model::{ConditionalOperator, JsonPrimitive},
};

/// One side of a conditional expression as seen by the operator: the
/// resolution outcome (if the operand exists) and its source text.
///
/// A failed resolution is kept as-is and only raised by `value()`, i.e. when
/// the operator actually needs that operand.
#[derive(Debug, Clone, Copy)]
pub struct Operand<'a> {
    pub text: Option<&'a str>,
    pub result: Option<&'a Result<Value, ResolveError>>,
}

impl<'a> Operand<'a> {
    pub fn new(text: &'a str, result: &'a Result<Value, ResolveError>) -> Self {
        Self { text: Some(text), result: Some(result) }
    }

    pub fn absent() -> Self {
        Self { text: None, result: None }
    }

    pub fn is_present(&self) -> bool {
        self.result.is_some()
    }

    pub fn value(&self, operator: ConditionalOperator) -> Result<&'a Value, ResolveError> {
        match self.result {
            Some(Ok(value)) => Ok(value),
            Some(Err(e)) => Err(e.clone()),
            None => ResolveError::evaluation(format!(
                "operator {} is missing an operand, it takes {}",
                operator,
                operator.arity()
            ))
            .err(),
        }
    }

    fn label(&self) -> &str {
        self.text.unwrap_or("<absent>")
    }
}

/// Applies a conditional operator.
pub trait ConditionEvaluator {
    fn evaluate(
        &self,
        operator: ConditionalOperator,
        expression: &Operand<'_>,
        operand1: &Operand<'_>,
        operand2: &Operand<'_>,
    ) -> Result<Value, ResolveError>;
}

static SCRIPT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/(?s)(.*)/([gimsuy]*)$").expect("static regex")
});

const PATTERN_CACHE_LIMIT: usize = 256;

/// Compiled LIKE/MATCH patterns keyed by the text handed to `compile_match`.
static PATTERN_CACHE: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Boolean-valued operator catalog. Nulls order before every other value.
///
/// The ranking operators (`TopN`, `BottomN`, `TopPercent`, `BottomPercent`)
/// need the whole group and fail here.
pub struct DefaultConditionEvaluator;

impl ConditionEvaluator for DefaultConditionEvaluator {
    fn evaluate(
        &self,
        operator: ConditionalOperator,
        expression: &Operand<'_>,
        operand1: &Operand<'_>,
        operand2: &Operand<'_>,
    ) -> Result<Value, ResolveError> {
        use ConditionalOperator::*;
        let value = expression.value(operator)?;
        let truth = match operator {
            Eq => Self::value_equal(value, operand1.value(operator)?),
            Ne => !Self::value_equal(value, operand1.value(operator)?),
            Lt => Self::compare(value, operand1.value(operator)?)? == Ordering::Less,
            Le => Self::compare(value, operand1.value(operator)?)? != Ordering::Greater,
            Gt => Self::compare(value, operand1.value(operator)?)? == Ordering::Greater,
            Ge => Self::compare(value, operand1.value(operator)?)? != Ordering::Less,
            Between => Self::between(value, operand1.value(operator)?, operand2.value(operator)?)?,
            NotBetween => !Self::between(value, operand1.value(operator)?, operand2.value(operator)?)?,
            Null => value.is_null(),
            NotNull => !value.is_null(),
            True => Self::is_true(value),
            False => matches!(DefaultTypeConverter::to_boolean(value), Some(Value::Bool(false))),
            Like => Self::like(value, operand1, operator)?,
            NotLike => !Self::like(value, operand1, operator)?,
            Match => Self::matches(value, operand1, operator)?,
            NotMatch => !Self::matches(value, operand1, operator)?,
            In => Self::contained(value, operand1, operand2, operator)?,
            NotIn => !Self::contained(value, operand1, operand2, operator)?,
            Any => true,
            TopN | BottomN | TopPercent | BottomPercent => {
                return ResolveError::evaluation(format!("operator {} needs group context and cannot be applied to a single row", operator)).err();
            }
        };
        Ok(Value::Bool(truth))
    }
}

impl DefaultConditionEvaluator {
    fn is_true(value: &Value) -> bool {
        matches!(DefaultTypeConverter::to_boolean(value), Some(Value::Bool(true)))
    }

    pub fn value_equal(a: &Value, b: &Value) -> bool {
        use serde_json::Value::*;
        match (a, b) {
            (Null, Null) => true,
            (Null, _) | (_, Null) => false,
            (Number(_), Number(_)) | (Number(_), String(_)) | (String(_), Number(_)) => {
                Self::numeric_order(a, b) == Some(Ordering::Equal)
            }
            _ => a == b,
        }
    }

    /// Total order for comparable pairs; nulls first.
    pub fn compare(a: &Value, b: &Value) -> Result<Ordering, ResolveError> {
        use serde_json::Value::*;
        match (a, b) {
            (Null, Null) => Ok(Ordering::Equal),
            (Null, _) => Ok(Ordering::Less),
            (_, Null) => Ok(Ordering::Greater),
            (Bool(x), Bool(y)) => Ok(x.cmp(y)),
            (String(x), String(y)) => Ok(x.cmp(y)),
            _ if JsonPrimitive::of_value(a).is_numeric() || JsonPrimitive::of_value(b).is_numeric() => {
                Self::numeric_order(a, b).map_or_else(|| Self::incomparable(a, b), Ok)
            }
            _ => Self::incomparable(a, b),
        }
    }

    /// Integers compare exactly (ids past 2^53 stay distinct); anything with
    /// a fractional part falls back to f64.
    fn numeric_order(a: &Value, b: &Value) -> Option<Ordering> {
        if let (Some(x), Some(y)) = (Self::as_integer(a), Self::as_integer(b)) {
            return Some(x.cmp(&y));
        }
        let (x, y) = (Self::as_float(a)?, Self::as_float(b)?);
        Some(x.partial_cmp(&y).unwrap_or(Ordering::Equal))
    }

    fn as_integer(v: &Value) -> Option<i128> {
        match v {
            Value::Number(n) => n.as_i64().map(i128::from).or_else(|| n.as_u64().map(i128::from)),
            Value::String(s) => s.trim().parse::<i128>().ok(),
            _ => None,
        }
    }

    fn as_float(v: &Value) -> Option<f64> {
        match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    fn incomparable(a: &Value, b: &Value) -> Result<Ordering, ResolveError> {
        ResolveError::evaluation(format!(
            "cannot compare {} value {} with {} value {}",
            JsonPrimitive::of_value(a),
            a,
            JsonPrimitive::of_value(b),
            b
        ))
        .err()
    }

    fn between(value: &Value, low: &Value, high: &Value) -> Result<bool, ResolveError> {
        Ok(Self::compare(value, low)? != Ordering::Less && Self::compare(value, high)? != Ordering::Greater)
    }

    fn contained(
        value: &Value,
        operand1: &Operand<'_>,
        operand2: &Operand<'_>,
        operator: ConditionalOperator,
    ) -> Result<bool, ResolveError> {
        let mut candidates = Vec::new();
        match operand1.value(operator)? {
            Value::Array(items) => candidates.extend(items.iter()),
            other => candidates.push(other),
        }
        if operand2.is_present() {
            candidates.push(operand2.value(operator)?);
        }
        Ok(candidates.into_iter().any(|c| Self::value_equal(value, c)))
    }

    fn pattern_text<'v>(operand: &Operand<'v>, operator: ConditionalOperator) -> Result<&'v str, ResolveError> {
        match operand.value(operator)? {
            Value::String(s) => Ok(s.as_str()),
            other => ResolveError::evaluation(format!(
                "operator {} expects a string pattern, operand '{}' gave {}",
                operator,
                operand.label(),
                other
            ))
            .err(),
        }
    }

    fn subject(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    fn like(value: &Value, operand: &Operand<'_>, operator: ConditionalOperator) -> Result<bool, ResolveError> {
        let pattern = Self::pattern_text(operand, operator)?;
        let Some(subject) = Self::subject(value) else { return Ok(false) };
        let re = Self::compile_match(&Self::like_to_regex(pattern)).map_err(|e| {
            ResolveError::evaluation(format!("invalid LIKE pattern '{}': {}", operand.label(), e))
        })?;
        Ok(re.is_match(&subject))
    }

    /// `%` matches any run, `_` any single char, `\` escapes the next char.
    pub fn like_to_regex(pattern: &str) -> String {
        let mut regex = String::from("(?s)^");
        let mut chars = pattern.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '%' => regex.push_str(".*"),
                '_' => regex.push('.'),
                '\\' => match chars.next() {
                    Some(escaped) => regex.push_str(&regex::escape(&escaped.to_string())),
                    None => regex.push_str(r"\\"),
                },
                c => regex.push_str(&regex::escape(&c.to_string())),
            }
        }
        regex.push('$');
        regex
    }

    fn matches(value: &Value, operand: &Operand<'_>, operator: ConditionalOperator) -> Result<bool, ResolveError> {
        let pattern = Self::pattern_text(operand, operator)?;
        let Some(subject) = Self::subject(value) else { return Ok(false) };
        let re = Self::compile_match(pattern).map_err(|e| {
            ResolveError::evaluation(format!("invalid MATCH pattern '{}': {}", operand.label(), e))
        })?;
        Ok(re.is_match(&subject))
    }

    /// Accepts a bare regex or a `/pattern/flags` literal (`i`, `m`, `s`
    /// honoured, others ignored). Successful compilations are reused across
    /// rows; the cache is dropped wholesale once it reaches its limit.
    fn compile_match(pattern: &str) -> Result<Regex, regex::Error> {
        if let Some(re) = PATTERN_CACHE.lock().ok().and_then(|cache| cache.get(pattern).cloned()) {
            return Ok(re);
        }
        let re = Self::build_match(pattern)?;
        if let Ok(mut cache) = PATTERN_CACHE.lock() {
            if cache.len() >= PATTERN_CACHE_LIMIT {
                cache.clear();
            }
            cache.insert(pattern.to_string(), re.clone());
        }
        Ok(re)
    }

    fn build_match(pattern: &str) -> Result<Regex, regex::Error> {
        match SCRIPT_REGEX.captures(pattern) {
            Some(caps) => {
                let body = caps.get(1).map_or("", |m| m.as_str());
                let flags = caps.get(2).map_or("", |m| m.as_str());
                RegexBuilder::new(body)
                    .case_insensitive(flags.contains('i'))
                    .multi_line(flags.contains('m'))
                    .dot_matches_new_line(flags.contains('s'))
                    .build()
            }
            None => Regex::new(pattern),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn apply(op: ConditionalOperator, value: Value, operands: &[Value]) -> Result<Value, ResolveError> {
        let expression = Ok(value);
        let results: Vec<Result<Value, ResolveError>> = operands.iter().cloned().map(Ok).collect();
        let first = results.first().map(|r| Operand::new("op1", r)).unwrap_or_else(Operand::absent);
        let second = results.get(1).map(|r| Operand::new("op2", r)).unwrap_or_else(Operand::absent);
        DefaultConditionEvaluator.evaluate(op, &Operand::new("expr", &expression), &first, &second)
    }

    fn truth(op: ConditionalOperator, value: Value, operands: &[Value]) -> bool {
        apply(op, value, operands).unwrap() == Value::Bool(true)
    }

    use ConditionalOperator::*;

    #[test]
    fn equality_and_ordering() {
        assert!(truth(Eq, json!(2), &[json!(2.0)]));
        assert!(truth(Eq, json!("10"), &[json!(10)]));
        assert!(truth(Ne, json!("a"), &[json!("b")]));
        assert!(truth(Eq, Value::Null, &[Value::Null]));
        assert!(!truth(Eq, Value::Null, &[json!(0)]));
        assert!(truth(Lt, json!(1), &[json!(2)]));
        assert!(truth(Le, json!("b"), &[json!("b")]));
        assert!(truth(Gt, json!(true), &[json!(false)]));
        assert!(truth(Ge, json!(3), &[json!("2.5")]));
        assert!(truth(Lt, Value::Null, &[json!(-100)]));
    }

    #[test]
    fn integers_past_float_precision_stay_distinct() {
        let above = json!(9007199254740993_i64);
        let below = json!(9007199254740992_i64);
        assert!(!truth(Eq, above.clone(), &[below.clone()]));
        assert!(truth(Ne, above.clone(), &[below.clone()]));
        assert!(truth(Gt, above.clone(), &[below.clone()]));
        assert!(truth(Lt, below.clone(), &[above.clone()]));
        assert!(truth(Eq, above.clone(), &[json!("9007199254740993")]));
        assert!(!truth(Eq, json!("9007199254740992"), &[above.clone()]));
        assert!(truth(Gt, json!(u64::MAX), &[json!(i64::MAX)]));
        assert!(truth(Lt, json!(i64::MIN), &[json!(u64::MAX)]));
        assert!(truth(In, above.clone(), &[json!([9007199254740992_i64, 9007199254740993_i64])]));
        assert!(truth(Between, above, &[below, json!(9007199254740994_i64)]));
    }

    #[test]
    fn missing_operand_reports_arity() {
        let err = apply(Between, json!(5), &[json!(1)]).unwrap_err();
        assert_eq!(err, ResolveError::evaluation("operator BETWEEN is missing an operand, it takes 2"));
    }

    #[test]
    fn compiled_patterns_are_reused() {
        let pattern = DefaultConditionEvaluator::like_to_regex("reuse-%-marker");
        assert!(truth(Like, json!("reuse-1-marker"), &[json!("reuse-%-marker")]));
        assert!(PATTERN_CACHE.lock().unwrap().contains_key(&pattern));
        assert!(truth(Like, json!("reuse-22-marker"), &[json!("reuse-%-marker")]));
        assert!(!truth(Like, json!("reuse-22-other"), &[json!("reuse-%-marker")]));

        assert!(truth(Match, json!("CACHED"), &[json!("/^cached$/i")]));
        assert!(PATTERN_CACHE.lock().unwrap().contains_key("/^cached$/i"));
        assert!(!truth(Match, json!("CACHED"), &[json!("^cached$")]));
    }

    #[test]
    fn incomparable_values_fail() {
        let err = apply(Lt, json!(true), &[json!(1)]).unwrap_err();
        assert_eq!(err, ResolveError::evaluation("cannot compare bool value true with int value 1"));
        assert!(apply(Gt, json!("abc"), &[json!(1)]).is_err());
    }

    #[test]
    fn ranges() {
        assert!(truth(Between, json!(5), &[json!(1), json!(5)]));
        assert!(!truth(Between, json!(6), &[json!(1), json!(5)]));
        assert!(truth(NotBetween, json!("z"), &[json!("a"), json!("m")]));
        assert!(apply(Between, json!(5), &[json!(1)]).is_err());
    }

    #[test]
    fn null_and_truth_tests() {
        assert!(truth(Null, Value::Null, &[]));
        assert!(truth(NotNull, json!(0), &[]));
        assert!(truth(True, json!("true"), &[]));
        assert!(truth(True, json!(1), &[]));
        assert!(truth(False, json!(false), &[]));
        assert!(!truth(False, Value::Null, &[]));
        assert!(!truth(True, json!("maybe"), &[]));
        assert!(truth(Any, json!({"x": 1}), &[]));
    }

    #[test]
    fn like_translates_wildcards_and_escapes() {
        assert!(truth(Like, json!("Hello123"), &[json!("He%2_")]));
        assert!(!truth(Like, json!("hello123"), &[json!("He%")]));
        assert!(truth(Like, json!("a_c"), &[json!("a\\_c")]));
        assert!(!truth(Like, json!("abc"), &[json!("a\\_c")]));
        assert!(truth(Like, json!("1.5"), &[json!("1.5")]));
        assert!(!truth(Like, json!("105"), &[json!("1.5")]));
        assert!(truth(NotLike, json!("abc"), &[json!("x%")]));
        assert!(!truth(Like, Value::Null, &[json!("%")]));
        assert!(apply(Like, json!("a"), &[json!(1)]).is_err());
    }

    #[test]
    fn match_accepts_script_literals() {
        assert!(!truth(Match, json!("Report-2025"), &[json!("^report-\\d+$")]));
        assert!(truth(Match, json!("Report-2025"), &[json!("/^report-\\d+$/i")]));
        assert!(truth(NotMatch, json!("abc"), &[json!("\\d")]));
        assert!(apply(Match, json!("abc"), &[json!("(")]).is_err());
    }

    #[test]
    fn membership() {
        assert!(truth(In, json!(2), &[json!([1, 2, 3])]));
        assert!(truth(In, json!("b"), &[json!("a"), json!("b")]));
        assert!(truth(NotIn, json!(9), &[json!([1, 2, 3])]));
        assert!(!truth(In, Value::Null, &[json!([1])]));
    }

    #[test]
    fn ranking_operators_need_group_context() {
        assert!(apply(TopN, json!(1), &[json!(3)]).is_err());
        assert!(apply(BottomPercent, json!(1), &[json!(10)]).is_err());
    }

    #[test]
    fn deferred_operand_failure_is_raised_unchanged_when_demanded() {
        let expression = Ok(json!(3));
        let failed = Err(ResolveError::evaluation("boom"));
        let unused = Operand::new("row.bad", &failed);

        // IS NULL never looks at its operands
        let ok = DefaultConditionEvaluator.evaluate(Null, &Operand::new("e", &expression), &unused, &Operand::absent());
        assert_eq!(ok, Ok(json!(false)));

        let err = DefaultConditionEvaluator.evaluate(Eq, &Operand::new("e", &expression), &unused, &Operand::absent());
        assert_eq!(err, Err(ResolveError::evaluation("boom")));
    }
}
