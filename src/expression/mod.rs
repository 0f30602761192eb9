//! Expression subsystem for keeldb
//!
//! Predicate and value expressions as produced by the query compiler.
//! Evaluation reads column values through an [`EvalContext`], which the
//! executor implements over the current row of every range.
//!
//! # Semantics
//!
//! - Three-valued logic: comparisons involving NULL yield NULL (unknown)
//! - `test_condition` is true only for a TRUE result
//! - Comparing values of different comparison groups is a type mismatch error

mod ast;
mod errors;
mod eval;

pub use ast::{ColumnRef, CompareOp, Expression};
pub use errors::{EvalError, EvalResult};
pub use eval::EvalContext;
