//! Query executor subsystem for keeldb
//!
//! Consumes compiled range lists and produces composed rows.
//!
//! # Execution flow
//!
//! 1. Compute scan bounds from each alternative's start conditions
//! 2. Open a storage scan, positioned on the index when there is one
//! 3. Check the end condition, then the residual, then the exclusion
//! 4. Pad left-outer rows with nulls when nothing matched
//! 5. Replay unmatched rows of right-outer ranges in a second pass
//!
//! # Resource rules
//!
//! - A cursor holds at most one scan at a time
//! - Every error is returned after the cursor tree has released its scans
//! - Always-false alternatives never touch storage

mod bounds;
mod context;
mod cursor;
mod errors;
mod executor;
mod join;
mod result;

pub use context::ExecutionContext;
pub use cursor::{CursorState, RangeCursor, RowCursor};
pub use errors::{ExecutorError, ExecutorErrorCode, ExecutorResult};
pub use executor::QueryExecutor;
pub use join::{open_cursor, JoinCursor};
pub use result::ExecutionResult;
