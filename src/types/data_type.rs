//! Declared column types

use std::fmt;

use serde::{Deserialize, Serialize};

use super::value::Value;
use crate::expression::EvalError;

/// Groups of mutually comparable types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonGroup {
    Boolean,
    Numeric,
    Text,
}

/// Position of a value relative to the representable range of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRange {
    /// Smaller than the type's minimum
    Below,
    /// Representable (boundary values included)
    Within,
    /// Larger than the type's maximum
    Above,
}

/// Declared type of a column or value expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Integer,
    BigInt,
    Double,
    Text,
}

// 2^63, the first double above i64::MAX
const BIGINT_CEILING: f64 = 9_223_372_036_854_775_808.0;

impl DataType {
    /// Returns the comparison group of this type
    pub fn comparison_group(&self) -> ComparisonGroup {
        match self {
            DataType::Boolean => ComparisonGroup::Boolean,
            DataType::Integer | DataType::BigInt | DataType::Double => ComparisonGroup::Numeric,
            DataType::Text => ComparisonGroup::Text,
        }
    }

    /// Returns true for Integer and BigInt
    pub fn is_integral(&self) -> bool {
        matches!(self, DataType::Integer | DataType::BigInt)
    }

    /// Returns the SQL name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Boolean => "BOOLEAN",
            DataType::Integer => "INTEGER",
            DataType::BigInt => "BIGINT",
            DataType::Double => "DOUBLE",
            DataType::Text => "VARCHAR",
        }
    }

    /// Compares a value against the representable range of this type.
    ///
    /// Only numeric narrowing can fall outside a range. A value exactly on
    /// the minimum or maximum is `Within`.
    pub fn compare_to_type_range(&self, value: &Value) -> TypeRange {
        match (self, value) {
            (DataType::Integer, Value::BigInt(v)) => {
                if *v < i32::MIN as i64 {
                    TypeRange::Below
                } else if *v > i32::MAX as i64 {
                    TypeRange::Above
                } else {
                    TypeRange::Within
                }
            }
            (DataType::Integer, Value::Double(v)) => {
                if v.is_nan() || *v > i32::MAX as f64 {
                    TypeRange::Above
                } else if *v < i32::MIN as f64 {
                    TypeRange::Below
                } else {
                    TypeRange::Within
                }
            }
            (DataType::BigInt, Value::Double(v)) => {
                if v.is_nan() || *v >= BIGINT_CEILING {
                    TypeRange::Above
                } else if *v < -BIGINT_CEILING {
                    TypeRange::Below
                } else {
                    TypeRange::Within
                }
            }
            _ => TypeRange::Within,
        }
    }

    /// Converts a value to this type.
    ///
    /// NULL converts to NULL. Doubles convert to integral types only when
    /// they carry no fraction; callers round first when they need to.
    pub fn convert(&self, value: &Value) -> Result<Value, EvalError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let converted = match (self, value) {
            (DataType::Boolean, Value::Boolean(b)) => Some(Value::Boolean(*b)),
            (DataType::Boolean, Value::Text(s)) => match s.to_ascii_lowercase().as_str() {
                "true" => Some(Value::Boolean(true)),
                "false" => Some(Value::Boolean(false)),
                _ => None,
            },
            (DataType::Integer, Value::Integer(v)) => Some(Value::Integer(*v)),
            (DataType::Integer, Value::BigInt(v)) => i32::try_from(*v).ok().map(Value::Integer),
            (DataType::Integer, Value::Double(v)) if v.fract() == 0.0 => {
                if self.compare_to_type_range(value) == TypeRange::Within {
                    Some(Value::Integer(*v as i32))
                } else {
                    None
                }
            }
            (DataType::Integer, Value::Text(s)) => s.trim().parse::<i32>().ok().map(Value::Integer),
            (DataType::BigInt, Value::Integer(v)) => Some(Value::BigInt(*v as i64)),
            (DataType::BigInt, Value::BigInt(v)) => Some(Value::BigInt(*v)),
            (DataType::BigInt, Value::Double(v)) if v.fract() == 0.0 => {
                if self.compare_to_type_range(value) == TypeRange::Within {
                    Some(Value::BigInt(*v as i64))
                } else {
                    None
                }
            }
            (DataType::BigInt, Value::Text(s)) => s.trim().parse::<i64>().ok().map(Value::BigInt),
            (DataType::Double, v) if v.as_f64().is_some() => v.as_f64().map(Value::Double),
            (DataType::Double, Value::Text(s)) => s.trim().parse::<f64>().ok().map(Value::Double),
            (DataType::Text, Value::Text(s)) => Some(Value::Text(s.clone())),
            (DataType::Text, Value::Boolean(b)) => Some(Value::Text(b.to_string())),
            (DataType::Text, v) if v.as_f64().is_some() => Some(Value::Text(match v {
                Value::Integer(i) => i.to_string(),
                Value::BigInt(i) => i.to_string(),
                Value::Double(d) => d.to_string(),
                _ => String::new(),
            })),
            _ => None,
        };

        converted.ok_or_else(|| EvalError::Conversion {
            value: value.to_string(),
            target: self.as_str(),
        })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_range() {
        let t = DataType::Integer;
        assert_eq!(t.compare_to_type_range(&Value::BigInt(i32::MAX as i64)), TypeRange::Within);
        assert_eq!(t.compare_to_type_range(&Value::BigInt(i32::MAX as i64 + 1)), TypeRange::Above);
        assert_eq!(t.compare_to_type_range(&Value::BigInt(i32::MIN as i64 - 1)), TypeRange::Below);
        assert_eq!(t.compare_to_type_range(&Value::Double(-1e12)), TypeRange::Below);
        assert_eq!(t.compare_to_type_range(&Value::Double(i32::MIN as f64)), TypeRange::Within);
    }

    #[test]
    fn test_bigint_range_ceiling() {
        let t = DataType::BigInt;
        assert_eq!(t.compare_to_type_range(&Value::Double(BIGINT_CEILING)), TypeRange::Above);
        assert_eq!(t.compare_to_type_range(&Value::Double(-BIGINT_CEILING)), TypeRange::Within);
        assert_eq!(t.compare_to_type_range(&Value::Double(f64::NAN)), TypeRange::Above);
    }

    #[test]
    fn test_convert() {
        assert_eq!(DataType::Integer.convert(&Value::BigInt(7)).unwrap(), Value::Integer(7));
        assert_eq!(DataType::BigInt.convert(&Value::text(" 12 ")).unwrap(), Value::BigInt(12));
        assert_eq!(DataType::Text.convert(&Value::Integer(3)).unwrap(), Value::text("3"));
        assert!(DataType::Integer.convert(&Value::Double(1.5)).is_err());
        assert!(DataType::Integer.convert(&Value::text("abc")).is_err());
        assert!(DataType::Integer.convert(&Value::Null).unwrap().is_null());
    }

    #[test]
    fn test_comparison_groups() {
        assert_eq!(DataType::Integer.comparison_group(), DataType::Double.comparison_group());
        assert_ne!(DataType::Integer.comparison_group(), DataType::Text.comparison_group());
    }
}
