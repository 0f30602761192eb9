//! Comparators used to position a scan on an index

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::expression::CompareOp;

/// How a bound tuple positions an index scan.
///
/// Forward scans start with `Equal`, `IsNull`, `Greater`, `GreaterEqual`
/// or `NotNull`. Reversed scans start with `Smaller`, `SmallerEqual`,
/// `Equal` or `Max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Comparator {
    Equal,
    IsNull,
    /// Any non-null value
    NotNull,
    Greater,
    GreaterEqual,
    Smaller,
    SmallerEqual,
    /// Past the last key of the equality prefix
    Max,
}

impl Comparator {
    /// Maps a comparison operator to a comparator. `NotEqual` has none.
    pub fn from_op(op: CompareOp) -> Option<Self> {
        match op {
            CompareOp::Equal => Some(Comparator::Equal),
            CompareOp::Greater => Some(Comparator::Greater),
            CompareOp::GreaterEqual => Some(Comparator::GreaterEqual),
            CompareOp::Smaller => Some(Comparator::Smaller),
            CompareOp::SmallerEqual => Some(Comparator::SmallerEqual),
            CompareOp::NotEqual => None,
        }
    }

    /// Returns true for comparators that pin one value
    pub fn is_point(&self) -> bool {
        matches!(self, Comparator::Equal | Comparator::IsNull)
    }

    /// Returns true for `<` and `<=`
    pub fn is_upper(&self) -> bool {
        matches!(self, Comparator::Smaller | Comparator::SmallerEqual)
    }

    /// Returns true for `>` and `>=`
    pub fn is_lower(&self) -> bool {
        matches!(self, Comparator::Greater | Comparator::GreaterEqual)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Equal => "=",
            Comparator::IsNull => "IS NULL",
            Comparator::NotNull => "IS NOT NULL",
            Comparator::Greater => ">",
            Comparator::GreaterEqual => ">=",
            Comparator::Smaller => "<",
            Comparator::SmallerEqual => "<=",
            Comparator::Max => "MAX",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
