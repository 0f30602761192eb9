//! Expression tree structures
//!
//! Built once per compilation and shared read-only by every execution of
//! the compiled statement.

use std::fmt;

use crate::types::{DataType, Value};

/// Binary comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Smaller,
    SmallerEqual,
}

impl CompareOp {
    /// Returns the SQL operator token
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Equal => "=",
            CompareOp::NotEqual => "<>",
            CompareOp::Greater => ">",
            CompareOp::GreaterEqual => ">=",
            CompareOp::Smaller => "<",
            CompareOp::SmallerEqual => "<=",
        }
    }

    /// Operator for the same comparison with operands exchanged
    pub fn swapped(&self) -> CompareOp {
        match self {
            CompareOp::Greater => CompareOp::Smaller,
            CompareOp::GreaterEqual => CompareOp::SmallerEqual,
            CompareOp::Smaller => CompareOp::Greater,
            CompareOp::SmallerEqual => CompareOp::GreaterEqual,
            other => *other,
        }
    }

    /// Tests an ordering against this operator
    pub fn matches(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CompareOp::Equal => ordering == Equal,
            CompareOp::NotEqual => ordering != Equal,
            CompareOp::Greater => ordering == Greater,
            CompareOp::GreaterEqual => ordering != Less,
            CompareOp::Smaller => ordering == Less,
            CompareOp::SmallerEqual => ordering != Greater,
        }
    }
}

/// Reference to a column of a range participating in the query
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    /// Position of the owning range in the join
    pub range: usize,
    /// Column index within the range's relation
    pub column: usize,
    /// Display name
    pub name: String,
    /// Declared column type
    pub data_type: DataType,
}

/// A compiled expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Constant value
    Literal(Value),
    /// Column of a range
    Column(ColumnRef),
    /// Dynamic parameter `?n`
    Parameter { index: usize, data_type: DataType },
    /// Binary comparison
    Compare {
        op: CompareOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// `expr IS NULL`
    IsNull(Box<Expression>),
    /// Logical negation
    Not(Box<Expression>),
    /// Logical conjunction
    And(Box<Expression>, Box<Expression>),
    /// Logical disjunction
    Or(Box<Expression>, Box<Expression>),
    /// Marks a condition that, once false, stays false for the rest of an
    /// index-ordered scan
    Terminal(Box<Expression>),
}

impl Expression {
    /// Create a literal
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    /// Create the NULL literal
    pub fn null() -> Self {
        Expression::Literal(Value::Null)
    }

    /// The TRUE literal
    pub fn true_literal() -> Self {
        Expression::Literal(Value::Boolean(true))
    }

    /// The FALSE literal
    pub fn false_literal() -> Self {
        Expression::Literal(Value::Boolean(false))
    }

    /// Create a column reference
    pub fn column(range: usize, column: usize, name: impl Into<String>, data_type: DataType) -> Self {
        Expression::Column(ColumnRef {
            range,
            column,
            name: name.into(),
            data_type,
        })
    }

    /// Create a dynamic parameter reference
    pub fn parameter(index: usize, data_type: DataType) -> Self {
        Expression::Parameter { index, data_type }
    }

    /// Create a comparison
    pub fn compare(op: CompareOp, left: Expression, right: Expression) -> Self {
        Expression::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eq(left: Expression, right: Expression) -> Self {
        Self::compare(CompareOp::Equal, left, right)
    }

    pub fn ne(left: Expression, right: Expression) -> Self {
        Self::compare(CompareOp::NotEqual, left, right)
    }

    pub fn gt(left: Expression, right: Expression) -> Self {
        Self::compare(CompareOp::Greater, left, right)
    }

    pub fn ge(left: Expression, right: Expression) -> Self {
        Self::compare(CompareOp::GreaterEqual, left, right)
    }

    pub fn lt(left: Expression, right: Expression) -> Self {
        Self::compare(CompareOp::Smaller, left, right)
    }

    pub fn le(left: Expression, right: Expression) -> Self {
        Self::compare(CompareOp::SmallerEqual, left, right)
    }

    /// Create `expr IS NULL`
    pub fn is_null(expr: Expression) -> Self {
        Expression::IsNull(Box::new(expr))
    }

    /// Create `expr IS NOT NULL`
    pub fn not_null(expr: Expression) -> Self {
        Expression::Not(Box::new(Expression::IsNull(Box::new(expr))))
    }

    /// Create a negation
    pub fn negate(expr: Expression) -> Self {
        Expression::Not(Box::new(expr))
    }

    /// Wrap a condition as terminal
    pub fn terminal(expr: Expression) -> Self {
        Expression::Terminal(Box::new(expr))
    }

    /// Create `left OR right` without simplification
    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::Or(Box::new(left), Box::new(right))
    }

    /// ANDs `e` onto an optional accumulated condition.
    ///
    /// A FALSE operand absorbs the conjunction and a TRUE operand is dropped,
    /// so a statically contradictory residual collapses to the FALSE literal.
    pub fn and_fold(acc: Option<Expression>, e: Expression) -> Expression {
        match acc {
            None => e,
            Some(a) => {
                if a.is_false_literal() || e.is_false_literal() {
                    Expression::false_literal()
                } else if a.is_true_literal() {
                    e
                } else if e.is_true_literal() {
                    a
                } else {
                    Expression::And(Box::new(a), Box::new(e))
                }
            }
        }
    }

    /// ORs `e` onto an optional accumulated condition, dropping FALSE operands
    pub fn or_fold(acc: Option<Expression>, e: Expression) -> Expression {
        match acc {
            None => e,
            Some(a) => {
                if a.is_false_literal() {
                    e
                } else if e.is_false_literal() {
                    a
                } else {
                    Expression::or(a, e)
                }
            }
        }
    }

    /// Returns true for the FALSE literal
    pub fn is_false_literal(&self) -> bool {
        matches!(self, Expression::Literal(Value::Boolean(false)))
    }

    /// Returns true for the TRUE literal
    pub fn is_true_literal(&self) -> bool {
        matches!(self, Expression::Literal(Value::Boolean(true)))
    }

    /// Returns true if this condition carries the terminal marker
    pub fn is_terminal(&self) -> bool {
        matches!(self, Expression::Terminal(_))
    }

    /// Strips a terminal marker
    pub fn unwrap_terminal(&self) -> &Expression {
        match self {
            Expression::Terminal(inner) => inner.unwrap_terminal(),
            other => other,
        }
    }

    /// Left operand of a comparison or IS NULL
    pub fn left_node(&self) -> Option<&Expression> {
        match self.unwrap_terminal() {
            Expression::Compare { left, .. } => Some(left),
            Expression::IsNull(inner) => Some(inner),
            _ => None,
        }
    }

    /// Right operand of a comparison
    pub fn right_node(&self) -> Option<&Expression> {
        match self.unwrap_terminal() {
            Expression::Compare { right, .. } => Some(right),
            _ => None,
        }
    }

    /// Returns the referenced column when this is a column expression
    pub fn as_column(&self) -> Option<&ColumnRef> {
        match self {
            Expression::Column(c) => Some(c),
            _ => None,
        }
    }

    /// Static type of the expression, `None` for an untyped NULL literal
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Expression::Literal(v) => v.data_type(),
            Expression::Column(c) => Some(c.data_type),
            Expression::Parameter { data_type, .. } => Some(*data_type),
            Expression::Terminal(inner) => inner.data_type(),
            _ => Some(DataType::Boolean),
        }
    }

    /// Returns true if any column of range `position` is referenced
    pub fn references_range(&self, position: usize) -> bool {
        match self {
            Expression::Literal(_) | Expression::Parameter { .. } => false,
            Expression::Column(c) => c.range == position,
            Expression::Compare { left, right, .. } => {
                left.references_range(position) || right.references_range(position)
            }
            Expression::IsNull(e) | Expression::Not(e) | Expression::Terminal(e) => {
                e.references_range(position)
            }
            Expression::And(a, b) | Expression::Or(a, b) => {
                a.references_range(position) || b.references_range(position)
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(v) => write!(f, "{}", v),
            Expression::Column(c) => write!(f, "{}", c.name),
            Expression::Parameter { index, .. } => write!(f, "?{}", index),
            Expression::Compare { op, left, right } => {
                write!(f, "({} {} {})", left, op.as_str(), right)
            }
            Expression::IsNull(e) => write!(f, "({} IS NULL)", e),
            Expression::Not(e) => match e.as_ref() {
                Expression::IsNull(inner) => write!(f, "({} IS NOT NULL)", inner),
                other => write!(f, "(NOT {})", other),
            },
            Expression::And(a, b) => write!(f, "({} AND {})", a, b),
            Expression::Or(a, b) => write!(f, "({} OR {})", a, b),
            Expression::Terminal(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col_a() -> Expression {
        Expression::column(0, 0, "T.A", DataType::Integer)
    }

    #[test]
    fn test_and_fold_absorbs_false() {
        let e = Expression::and_fold(Some(Expression::eq(col_a(), Expression::literal(1))), Expression::false_literal());
        assert!(e.is_false_literal());

        let e = Expression::and_fold(Some(Expression::true_literal()), Expression::eq(col_a(), Expression::literal(1)));
        assert_eq!(e, Expression::eq(col_a(), Expression::literal(1)));
    }

    #[test]
    fn test_or_fold_drops_false() {
        let e = Expression::or_fold(Some(Expression::false_literal()), Expression::gt(col_a(), Expression::literal(3)));
        assert_eq!(e, Expression::gt(col_a(), Expression::literal(3)));
    }

    #[test]
    fn test_references_range() {
        let e = Expression::eq(col_a(), Expression::column(1, 2, "U.C", DataType::Integer));
        assert!(e.references_range(0));
        assert!(e.references_range(1));
        assert!(!e.references_range(2));
    }

    #[test]
    fn test_terminal_is_transparent_for_operands() {
        let e = Expression::terminal(Expression::lt(col_a(), Expression::literal(10)));
        assert!(e.is_terminal());
        assert_eq!(e.left_node(), Some(&col_a()));
        assert_eq!(e.right_node(), Some(&Expression::literal(10)));
    }

    #[test]
    fn test_display() {
        let e = Expression::and_fold(
            Some(Expression::eq(col_a(), Expression::literal(5))),
            Expression::not_null(col_a()),
        );
        assert_eq!(e.to_string(), "((T.A = 5) AND (T.A IS NOT NULL))");
    }
}
