//! Value and type system for keeldb
//!
//! Values are the cells of rows and the results of expression evaluation.
//! Declared types drive bound coercion when a predicate compares a column
//! against a value of a different type.
//!
//! # Ordering
//!
//! - NULL sorts before every non-null value
//! - Numeric values compare across Integer, BigInt and Double
//! - Values of unrelated comparison groups order by group (Boolean < Numeric < Text)

mod data_type;
mod value;

pub use data_type::{ComparisonGroup, DataType, TypeRange};
pub use value::Value;
