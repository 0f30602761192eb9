//! Bound-tuple computation for positioned index scans
//!
//! Start bound values are evaluated when a scan opens. A value whose type
//! differs from the column type is coerced to the column type first:
//!
//! - a value outside the column type's range turns the scan into an empty
//!   scan or an unrestricted one, depending on its side of the range and
//!   the comparator
//! - a fractional value against an integral column is rounded towards the
//!   rows the comparator still admits
//!
//! Values exactly on a type's minimum or maximum are in range.

use crate::expression::{EvalContext, EvalResult};
use crate::index::Comparator;
use crate::planner::{AccessCondition, IndexBound};
use crate::types::{DataType, TypeRange, Value};

/// Where a scan over an index starts
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScanStart {
    /// No row can match
    Empty,
    /// Whole index in scan direction
    Unrestricted,
    /// Positioned by the first `prefix_len` values of `values`
    Positioned {
        values: Vec<Value>,
        prefix_len: usize,
        comparator: Comparator,
    },
}

enum Coerced {
    Value(Value),
    Comparator(Comparator),
    Empty,
}

/// Evaluates the start bounds of `condition` against `ctx`
pub(crate) fn resolve_start(condition: &AccessCondition, ctx: &dyn EvalContext) -> EvalResult<ScanStart> {
    let bounds = condition.start_bounds();
    if bounds.is_empty() {
        return Ok(ScanStart::Unrestricted);
    }

    let last = bounds.len() - 1;
    let mut values = Vec::with_capacity(bounds.len());
    let mut comparator = condition.op_type().unwrap_or(bounds[last].comparator);

    for (i, bound) in bounds.iter().enumerate() {
        let op = if i == last { comparator } else { bound.comparator };
        if matches!(op, Comparator::IsNull | Comparator::NotNull | Comparator::Max) {
            values.push(Value::Null);
            continue;
        }

        let value = bound.value.evaluate(ctx)?;
        if value.is_null() {
            // no comparison with NULL is ever true
            return Ok(ScanStart::Empty);
        }

        match coerce(bound, op, value)? {
            Coerced::Value(v) => values.push(v),
            Coerced::Comparator(replacement) if i == last => {
                comparator = replacement;
                values.push(Value::Null);
            }
            Coerced::Comparator(_) | Coerced::Empty => return Ok(ScanStart::Empty),
        }
    }

    Ok(ScanStart::Positioned {
        prefix_len: values.len(),
        values,
        comparator,
    })
}

fn coerce(bound: &IndexBound, op: Comparator, value: Value) -> EvalResult<Coerced> {
    let target = bound.column_type;
    if value.data_type() == Some(target) {
        return Ok(Coerced::Value(value));
    }

    match target.compare_to_type_range(&value) {
        TypeRange::Below => Ok(match op {
            Comparator::Greater | Comparator::GreaterEqual => Coerced::Comparator(Comparator::NotNull),
            _ => Coerced::Empty,
        }),
        TypeRange::Above => Ok(match op {
            Comparator::Smaller | Comparator::SmallerEqual => Coerced::Comparator(Comparator::Max),
            _ => Coerced::Empty,
        }),
        TypeRange::Within => {
            let value = match round_for(target, op, &value) {
                Some(rounded) => rounded,
                None => return Ok(Coerced::Empty),
            };
            Ok(Coerced::Value(target.convert(&value)?))
        }
    }
}

/// Rounds a fractional value aimed at an integral column. `None` means no
/// integral value can satisfy the comparison.
fn round_for(target: DataType, op: Comparator, value: &Value) -> Option<Value> {
    match value {
        Value::Double(d) if target.is_integral() && d.fract() != 0.0 => match op {
            Comparator::Greater | Comparator::SmallerEqual => Some(Value::Double(d.floor())),
            Comparator::GreaterEqual | Comparator::Smaller => Some(Value::Double(d.ceil())),
            _ => None,
        },
        other => Some(other.clone()),
    }
}
