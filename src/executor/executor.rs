//! Query executor for keeldb
//!
//! Drives a cursor tree to completion.
//!
//! Execution flow:
//! 1. Open the cursor tree (a single range bypasses the join layer)
//! 2. Collect composed rows until the tree is exhausted
//! 3. Release every scan
//! 4. For each right or full outer range, replay its unmatched rows with
//!    every other range null-padded

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::observability::{Event, MetricsRegistry, ObservationScope};
use crate::planner::RangeVariable;
use crate::types::Value;

use super::context::ExecutionContext;
use super::cursor::RowCursor;
use super::errors::ExecutorResult;
use super::join::open_cursor;
use super::result::ExecutionResult;

/// Executes compiled range lists against a catalog
#[derive(Debug)]
pub struct QueryExecutor {
    catalog: Arc<Catalog>,
    config: EngineConfig,
    metrics: Arc<MetricsRegistry>,
}

impl QueryExecutor {
    pub fn new(catalog: Arc<Catalog>, config: EngineConfig) -> Self {
        Self {
            catalog,
            config,
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    /// Counters accumulated over every execution of this executor
    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// A fresh context for one execution
    pub fn context(&self) -> ExecutionContext {
        ExecutionContext::with_metrics(
            Arc::clone(&self.catalog),
            self.config.clone(),
            Arc::clone(&self.metrics),
        )
    }

    /// Executes `ranges` in join order without parameters
    pub fn execute(&self, ranges: &[Arc<RangeVariable>]) -> ExecutorResult<ExecutionResult> {
        self.execute_in(&self.context(), ranges)
    }

    /// Executes `ranges` with dynamic parameters bound `?0` first
    pub fn execute_with_parameters(
        &self,
        ranges: &[Arc<RangeVariable>],
        parameters: Vec<Value>,
    ) -> ExecutorResult<ExecutionResult> {
        self.execute_in(&self.context().with_parameters(parameters), ranges)
    }

    /// Executes `ranges` within an existing context
    pub fn execute_in(
        &self,
        ctx: &ExecutionContext,
        ranges: &[Arc<RangeVariable>],
    ) -> ExecutorResult<ExecutionResult> {
        let execution_id = ctx.execution_id().to_string();
        let width = ranges.len().to_string();
        let scope = ObservationScope::with_fields(
            Event::QueryExecution.as_str(),
            &[("execution_id", execution_id.as_str()), ("ranges", width.as_str())],
            ctx.log_threshold(),
        );

        match run(ctx, ranges) {
            Ok(result) => {
                let rows = result.len().to_string();
                scope.complete_with_fields(&[("rows", rows.as_str())]);
                Ok(result)
            }
            Err(err) => {
                scope.fail(err.message(), err.is_fatal());
                Err(err)
            }
        }
    }
}

fn run(ctx: &ExecutionContext, ranges: &[Arc<RangeVariable>]) -> ExecutorResult<ExecutionResult> {
    let mut cursor = open_cursor(ranges, ctx)?;
    let mut rows = Vec::new();
    while cursor.next(ctx)? {
        rows.push(cursor.current());
    }
    cursor.release();

    let mut cursors = cursor.into_cursors();
    let mut right_outer_count = 0;
    for (k, range) in ranges.iter().enumerate() {
        if !range.is_right_join() {
            continue;
        }
        for (j, other) in ranges.iter().enumerate() {
            if j != k {
                ctx.bind_row(other.position(), other.table().empty_row_tuple());
            }
        }

        let outer = &mut cursors[k];
        outer.set_on_outer_rows()?;
        let result = collect_outer_rows(ctx, ranges, k, outer.as_mut(), &mut rows);
        outer.release();
        right_outer_count += result?;
    }

    Ok(ExecutionResult::new(ctx.execution_id(), rows, right_outer_count))
}

fn collect_outer_rows(
    ctx: &ExecutionContext,
    ranges: &[Arc<RangeVariable>],
    k: usize,
    cursor: &mut dyn RowCursor,
    rows: &mut Vec<Vec<Value>>,
) -> ExecutorResult<usize> {
    let mut count = 0;
    while cursor.next(ctx)? {
        let mut row = Vec::new();
        for (j, range) in ranges.iter().enumerate() {
            if j == k {
                row.extend(cursor.current());
            } else {
                row.extend(range.table().empty_row_tuple().iter().cloned());
            }
        }
        rows.push(row);
        count += 1;
    }
    Ok(count)
}
