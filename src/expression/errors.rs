//! Expression evaluation errors

use thiserror::Error;

/// Result type for expression evaluation
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors raised while evaluating an expression.
///
/// These are user-visible data errors. The executor propagates them
/// unchanged after releasing its scans.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Operands of incomparable types
    #[error("Type mismatch: cannot compare {left} with {right}")]
    TypeMismatch { left: String, right: String },

    /// A logical operator received a non-boolean operand
    #[error("Expected a boolean operand, found {0}")]
    NotBoolean(String),

    /// No value bound for a dynamic parameter
    #[error("Parameter ?{0} is not bound")]
    UnboundParameter(usize),

    /// A range slot was read before any cursor registered it
    #[error("Range {0} is not bound in this execution context")]
    RangeNotBound(usize),

    /// Column index beyond the row width
    #[error("Column {column} out of range for range {range}")]
    ColumnOutOfRange { range: usize, column: usize },

    /// Value cannot be represented in the target type
    #[error("Cannot convert {value} to {target}")]
    Conversion { value: String, target: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EvalError::TypeMismatch {
            left: "INTEGER".into(),
            right: "VARCHAR".into(),
        };
        assert_eq!(err.to_string(), "Type mismatch: cannot compare INTEGER with VARCHAR");
        assert_eq!(EvalError::UnboundParameter(2).to_string(), "Parameter ?2 is not bound");
    }
}
