use serde_json::Value;
use tracing::instrument;

use crate::{
    config::{ROW_POSITION, ResolverConfig},
    cursor::RowData,
    executor::{
        ConditionEvaluator, DefaultConditionEvaluator, DefaultTypeConverter, Operand, ResolveError, RowScope,
        ScriptEngine, TypeConverter,
    },
    model::{BoundExpression, ColumnReference, ConditionalExpression, ExpressionHandle, RowIdentity, ScalarExpression},
};

/// Computes the value of a bound expression for one row.
///
/// Direct column references are read straight from the row; everything else
/// goes through the injected `ScriptEngine`. Scalar results are coerced to
/// the expression's declared type; conditional results are returned as the
/// operator produced them.
pub struct ExpressionResolver<'a> {
    engine: &'a dyn ScriptEngine,
    converter: &'a dyn TypeConverter,
    conditions: &'a dyn ConditionEvaluator,
    row_position_name: String,
}

impl<'a> ExpressionResolver<'a> {
    pub fn new(engine: &'a dyn ScriptEngine) -> Self {
        Self {
            engine,
            converter: &DefaultTypeConverter,
            conditions: &DefaultConditionEvaluator,
            row_position_name: ROW_POSITION.to_string(),
        }
    }

    pub fn with_converter(mut self, converter: &'a dyn TypeConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_condition_evaluator(mut self, conditions: &'a dyn ConditionEvaluator) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_config(mut self, config: &ResolverConfig) -> Self {
        self.set_config(config);
        self
    }

    pub fn set_config(&mut self, config: &ResolverConfig) {
        self.row_position_name = config.row_position_name.clone();
    }

    pub fn row_position_name(&self) -> &str {
        &self.row_position_name
    }

    #[instrument(name = "resolver::resolve", level = "trace", skip_all, fields(text = %expr.text, row_index = row_index))]
    pub fn resolve(
        &self,
        expr: &BoundExpression,
        row_index: RowIdentity,
        row: Option<&dyn RowData>,
    ) -> Result<Value, ResolveError> {
        let Some(handle) = &expr.handle else {
            return ResolveError::invalid_expression(&expr.text).err();
        };
        match handle {
            ExpressionHandle::Scalar(scalar) => {
                let raw = self.resolve_scalar(scalar, row_index, row)?;
                self.converter.convert(raw, expr.data_type)
            }
            ExpressionHandle::Conditional(conditional) => self.resolve_conditional(conditional, row_index, row),
        }
    }

    fn resolve_scalar(
        &self,
        scalar: &ScalarExpression,
        row_index: RowIdentity,
        row: Option<&dyn RowData>,
    ) -> Result<Value, ResolveError> {
        match scalar {
            ScalarExpression::Column(ColumnReference::Index(0)) => Ok(Value::from(row_index)),
            ScalarExpression::Column(ColumnReference::Index(index)) => match row {
                Some(row) => Ok(row.field_by_index(*index)?.clone()),
                None => Ok(Value::Null),
            },
            ScalarExpression::Column(ColumnReference::Name(name)) if *name == self.row_position_name => {
                Ok(Value::from(row_index))
            }
            ScalarExpression::Column(ColumnReference::Name(name)) => match row {
                Some(row) => Ok(row.field_by_name(name)?.clone()),
                None => Ok(Value::Null),
            },
            ScalarExpression::Opaque(opaque) => self.engine.evaluate(opaque, &RowScope::new(row_index, row)),
        }
    }

    /// Every present sub-expression is resolved, left to right, before the
    /// operator runs. Failures are handed to the operator and surface only
    /// when it reads that value.
    fn resolve_conditional(
        &self,
        conditional: &ConditionalExpression,
        row_index: RowIdentity,
        row: Option<&dyn RowData>,
    ) -> Result<Value, ResolveError> {
        let expression = self.resolve(&conditional.expression, row_index, row);
        let operand1 = conditional.operand1.as_ref().map(|e| (e, self.resolve(e, row_index, row)));
        let operand2 = conditional.operand2.as_ref().map(|e| (e, self.resolve(e, row_index, row)));

        // a malformed sub-expression is never deferred
        let results = [Some(&expression), operand1.as_ref().map(|(_, r)| r), operand2.as_ref().map(|(_, r)| r)];
        if let Some(Err(fatal)) = results.into_iter().flatten().find(|r| matches!(r, Err(e) if !e.is_recoverable())) {
            return Err(fatal.clone());
        }

        self.conditions.evaluate(
            conditional.operator,
            &Operand::new(conditional.expression.text.as_str(), &expression),
            &Self::operand(&operand1),
            &Self::operand(&operand2),
        )
    }

    fn operand<'s>(side: &'s Option<(&'s BoundExpression, Result<Value, ResolveError>)>) -> Operand<'s> {
        match side {
            Some((e, result)) => Operand::new(e.text.as_str(), result),
            None => Operand::absent(),
        }
    }
}
