use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::BoundExpression;

/// Operator applied by a conditional expression to its primary value and
/// operands.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionalOperator {
    #[default]
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Between,
    NotBetween,
    Null,
    NotNull,
    True,
    False,
    Like,
    NotLike,
    Match,
    NotMatch,
    In,
    NotIn,
    Any,
    TopN,
    BottomN,
    TopPercent,
    BottomPercent,
}

impl ConditionalOperator {
    /// Number of operands the operator consumes.
    pub fn arity(&self) -> usize {
        use ConditionalOperator::*;
        match self {
            Null | NotNull | True | False | Any => 0,
            Between | NotBetween => 2,
            _ => 1,
        }
    }
}

impl TryFrom<&str> for ConditionalOperator {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        use ConditionalOperator::*;
        match value.trim().to_uppercase().as_str() {
            "=" | "==" | "EQ" => Ok(Eq),
            "!=" | "<>" | "NE" => Ok(Ne),
            "<" | "LT" => Ok(Lt),
            "<=" | "LE" => Ok(Le),
            ">" | "GT" => Ok(Gt),
            ">=" | "GE" => Ok(Ge),
            "BETWEEN" => Ok(Between),
            "NOT BETWEEN" => Ok(NotBetween),
            "IS NULL" | "NULL" => Ok(Null),
            "IS NOT NULL" | "NOT NULL" => Ok(NotNull),
            "IS TRUE" | "TRUE" => Ok(True),
            "IS FALSE" | "FALSE" => Ok(False),
            "LIKE" => Ok(Like),
            "NOT LIKE" => Ok(NotLike),
            "MATCH" => Ok(Match),
            "NOT MATCH" => Ok(NotMatch),
            "IN" => Ok(In),
            "NOT IN" => Ok(NotIn),
            "ANY" => Ok(Any),
            "TOP N" => Ok(TopN),
            "BOTTOM N" => Ok(BottomN),
            "TOP PERCENT" => Ok(TopPercent),
            "BOTTOM PERCENT" => Ok(BottomPercent),
            _ => Err(format!("Invalid conditional operator: '{}'", value)),
        }
    }
}

impl fmt::Display for ConditionalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ConditionalOperator::*;
        let text = match self {
            Eq => "=",
            Ne => "<>",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            Between => "BETWEEN",
            NotBetween => "NOT BETWEEN",
            Null => "IS NULL",
            NotNull => "IS NOT NULL",
            True => "IS TRUE",
            False => "IS FALSE",
            Like => "LIKE",
            NotLike => "NOT LIKE",
            Match => "MATCH",
            NotMatch => "NOT MATCH",
            In => "IN",
            NotIn => "NOT IN",
            Any => "ANY",
            TopN => "TOP N",
            BottomN => "BOTTOM N",
            TopPercent => "TOP PERCENT",
            BottomPercent => "BOTTOM PERCENT",
        };
        f.write_str(text)
    }
}

/// `<expression> <operator> [operand1 [, operand2]]`
///
/// Operand presence is trusted to match the operator's arity; the compiler
/// that produced the expression is responsible for that.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    pub operator: ConditionalOperator,
    pub expression: BoundExpression,
    pub operand1: Option<BoundExpression>,
    pub operand2: Option<BoundExpression>,
}

impl ConditionalExpression {
    pub fn new(expression: BoundExpression, operator: ConditionalOperator) -> Self {
        Self { operator, expression, operand1: None, operand2: None }
    }

    pub fn with_operand(expression: BoundExpression, operator: ConditionalOperator, operand1: BoundExpression) -> Self {
        Self { operator, expression, operand1: Some(operand1), operand2: None }
    }

    pub fn with_operands(
        expression: BoundExpression,
        operator: ConditionalOperator,
        operand1: BoundExpression,
        operand2: BoundExpression,
    ) -> Self {
        Self { operator, expression, operand1: Some(operand1), operand2: Some(operand2) }
    }
}
