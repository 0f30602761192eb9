//! Access-path planning subsystem for keeldb
//!
//! Holds the compile-time descriptors of a query's relations. The choice of
//! index is made upstream; this module maps the compiled predicates onto the
//! chosen index and keeps what cannot be expressed as a bound for row-by-row
//! checking.
//!
//! # Access path rules
//!
//! - Bounds follow the index column order: a run of `Equal`/`IsNull` bounds,
//!   optionally closed by one range comparator
//! - A second range comparator on the same path is a residual predicate
//! - A statically false residual marks the path always-false; it is skipped
//!   without touching storage
//! - Point lookups have no direction and cannot be reversed

mod access;
mod errors;
mod explain;
mod range;

pub use access::{AccessCondition, IndexBound};
pub use errors::{PlannerError, PlannerErrorCode, PlannerResult};
pub use explain::{AccessExplain, PathExplain};
pub use range::{ConditionPhase, JoinKind, RangeKind, RangeVariable};
