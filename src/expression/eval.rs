//! Expression evaluation
//!
//! Evaluation is side-effect free. Column values are read through the
//! context, so the same compiled tree evaluates against whatever rows the
//! cursors currently expose.

use crate::types::Value;

use super::ast::Expression;
use super::errors::{EvalError, EvalResult};

/// Source of column and parameter values during evaluation
pub trait EvalContext {
    /// Current value of `column` in range `range`
    fn column_value(&self, range: usize, column: usize) -> EvalResult<Value>;

    /// Value bound to dynamic parameter `index`
    fn parameter(&self, index: usize) -> EvalResult<Value>;
}

impl Expression {
    /// Evaluates the expression to a value
    pub fn evaluate(&self, ctx: &dyn EvalContext) -> EvalResult<Value> {
        match self {
            Expression::Literal(v) => Ok(v.clone()),
            Expression::Column(c) => ctx.column_value(c.range, c.column),
            Expression::Parameter { index, .. } => ctx.parameter(*index),
            Expression::Compare { op, left, right } => {
                let l = left.evaluate(ctx)?;
                let r = right.evaluate(ctx)?;
                if l.is_null() || r.is_null() {
                    return Ok(Value::Null);
                }
                match l.sql_cmp(&r) {
                    Some(ordering) => Ok(Value::Boolean(op.matches(ordering))),
                    None => Err(EvalError::TypeMismatch {
                        left: type_name(&l),
                        right: type_name(&r),
                    }),
                }
            }
            Expression::IsNull(e) => Ok(Value::Boolean(e.evaluate(ctx)?.is_null())),
            Expression::Not(e) => match truth(e.evaluate(ctx)?)? {
                Some(b) => Ok(Value::Boolean(!b)),
                None => Ok(Value::Null),
            },
            Expression::And(a, b) => {
                let left = truth(a.evaluate(ctx)?)?;
                if left == Some(false) {
                    return Ok(Value::Boolean(false));
                }
                let right = truth(b.evaluate(ctx)?)?;
                Ok(match (left, right) {
                    (_, Some(false)) => Value::Boolean(false),
                    (Some(true), Some(true)) => Value::Boolean(true),
                    _ => Value::Null,
                })
            }
            Expression::Or(a, b) => {
                let left = truth(a.evaluate(ctx)?)?;
                if left == Some(true) {
                    return Ok(Value::Boolean(true));
                }
                let right = truth(b.evaluate(ctx)?)?;
                Ok(match (left, right) {
                    (_, Some(true)) => Value::Boolean(true),
                    (Some(false), Some(false)) => Value::Boolean(false),
                    _ => Value::Null,
                })
            }
            Expression::Terminal(e) => e.evaluate(ctx),
        }
    }

    /// Evaluates a condition; NULL (unknown) counts as false
    pub fn test_condition(&self, ctx: &dyn EvalContext) -> EvalResult<bool> {
        Ok(truth(self.evaluate(ctx)?)? == Some(true))
    }
}

fn truth(v: Value) -> EvalResult<Option<bool>> {
    match v {
        Value::Null => Ok(None),
        Value::Boolean(b) => Ok(Some(b)),
        other => Err(EvalError::NotBoolean(other.to_string())),
    }
}

fn type_name(v: &Value) -> String {
    v.data_type()
        .map(|t| t.as_str().to_string())
        .unwrap_or_else(|| "NULL".to_string())
}
