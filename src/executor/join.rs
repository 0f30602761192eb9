//! Nested-loop join cursor
//!
//! Cursors are held in join order, outer range first. The innermost cursor
//! advances fastest; an exhausted cursor is reset and the one before it
//! advances.

use std::sync::Arc;

use crate::observability::Event;
use crate::planner::RangeVariable;
use crate::storage::RowId;
use crate::types::Value;

use super::context::{ExecutionContext, Telemetry};
use super::cursor::{RangeCursor, RowCursor};
use super::errors::{ExecutorError, ExecutorResult};

/// Drives a sequence of cursors as a nested loop
#[derive(Debug)]
pub struct JoinCursor {
    cursors: Vec<Box<dyn RowCursor>>,
    level: usize,
    exhausted: bool,
    telemetry: Telemetry,
}

impl JoinCursor {
    pub fn new(cursors: Vec<Box<dyn RowCursor>>, ctx: &ExecutionContext) -> Self {
        Self {
            exhausted: cursors.is_empty(),
            cursors,
            level: 0,
            telemetry: ctx.telemetry().clone(),
        }
    }

    /// Number of joined cursors
    pub fn width(&self) -> usize {
        self.cursors.len()
    }

    fn release_all(&mut self) {
        for cursor in self.cursors.iter_mut() {
            cursor.release();
        }
        self.exhausted = true;
    }
}

impl RowCursor for JoinCursor {
    fn next(&mut self, ctx: &ExecutionContext) -> ExecutorResult<bool> {
        if self.exhausted {
            return Ok(false);
        }

        let last = self.cursors.len() - 1;
        let mut level = self.level;
        loop {
            match self.cursors[level].next(ctx) {
                Ok(true) if level < last => level += 1,
                Ok(true) => {
                    self.level = level;
                    return Ok(true);
                }
                Ok(false) => {
                    self.cursors[level].reset();
                    if level == 0 {
                        break;
                    }
                    level -= 1;
                }
                Err(err) => {
                    self.release_all();
                    return Err(err);
                }
            }
        }

        for cursor in self.cursors.iter_mut() {
            cursor.reset();
        }
        self.level = 0;
        self.exhausted = true;
        let width = self.cursors.len().to_string();
        self.telemetry
            .log(Event::JoinExhausted, &[("ranges", width.as_str())]);
        Ok(false)
    }

    fn current(&self) -> Vec<Value> {
        self.cursors.iter().flat_map(|c| c.current()).collect()
    }

    /// Identifier of the innermost range's row
    fn current_row_id(&self) -> Option<RowId> {
        self.cursors.last().and_then(|c| c.current_row_id())
    }

    fn reset(&mut self) {
        for cursor in self.cursors.iter_mut() {
            cursor.reset();
        }
        self.level = 0;
        self.exhausted = self.cursors.is_empty();
    }

    fn release(&mut self) {
        self.release_all();
    }

    fn into_cursors(self: Box<Self>) -> Vec<Box<dyn RowCursor>> {
        self.cursors
    }
}

/// Opens the cursor tree for `ranges` in join order.
///
/// A single range is returned as its own cursor without a join layer.
pub fn open_cursor(
    ranges: &[Arc<RangeVariable>],
    ctx: &ExecutionContext,
) -> ExecutorResult<Box<dyn RowCursor>> {
    if ranges.is_empty() {
        return Err(ExecutorError::cursor_state("no ranges to scan"));
    }

    let width = ranges.len().to_string();
    ctx.log(Event::CursorOpened, &[("ranges", width.as_str())]);

    let mut cursors: Vec<Box<dyn RowCursor>> = ranges
        .iter()
        .map(|r| Box::new(RangeCursor::new(Arc::clone(r), ctx)) as Box<dyn RowCursor>)
        .collect();

    if cursors.len() == 1 {
        return Ok(cursors.remove(0));
    }
    Ok(Box::new(JoinCursor::new(cursors, ctx)))
}
