//! keeldb - access-path execution for a relational engine
//!
//! Compiled queries arrive as an ordered list of range variables, one per
//! relation in join order. Each range carries the access conditions the
//! planner produced; the executor turns them into positioned index scans and
//! nested-loop joins with outer-join padding.

pub mod catalog;
pub mod config;
pub mod errors;
pub mod executor;
pub mod expression;
pub mod index;
pub mod observability;
pub mod planner;
pub mod storage;
pub mod types;

pub use catalog::Catalog;
pub use config::{ConfigError, EngineConfig};
pub use errors::{KeelError, KeelResult, Severity};
pub use executor::{open_cursor, ExecutionContext, ExecutionResult, QueryExecutor, RowCursor};
pub use planner::{AccessCondition, ConditionPhase, JoinKind, RangeVariable};
pub use types::{DataType, Value};
