//! Range cursors
//!
//! A `RangeCursor` produces the rows of one range by scanning its access
//! path alternatives in turn. It pads unmatched rows of a left-outer range
//! with NULLs, records matched rows of a right-outer range, and replays the
//! unmatched ones in a second pass.
//!
//! # State machine
//!
//! ```text
//! BEFORE_FIRST -> SCANNING(alt i) -> SCANNING(alt i + 1) -> ... -> EXHAUSTED
//!       ^                                                           |
//!       +------------------------------ reset() --------------------+
//! ```
//!
//! Every error returned from `next` is returned after the cursor released
//! its scan. The cursor stays `EXHAUSTED` until `reset`.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::expression::Expression;
use crate::index::Comparator;
use crate::observability::Event;
use crate::planner::{AccessCondition, RangeVariable};
use crate::storage::{Row, RowId, RowScan};
use crate::types::Value;

use super::bounds::{resolve_start, ScanStart};
use super::context::{ExecutionContext, Telemetry};
use super::errors::{ExecutorError, ExecutorErrorCode, ExecutorResult};

/// Row iteration protocol shared by range and join cursors
pub trait RowCursor: fmt::Debug {
    /// Advances to the next row. Returns false once exhausted.
    fn next(&mut self, ctx: &ExecutionContext) -> ExecutorResult<bool>;

    /// Values of the current row; composed across ranges for a join
    fn current(&self) -> Vec<Value>;

    /// Identifier of the current stored row. `None` before the first row
    /// and for null-padded rows.
    fn current_row_id(&self) -> Option<RowId>;

    /// Releases the scan and rewinds to before the first row
    fn reset(&mut self);

    /// Releases the scan; `next` returns false until `reset`
    fn release(&mut self);

    /// Switches to the right-outer pass over rows not matched so far
    fn set_on_outer_rows(&mut self) -> ExecutorResult<()> {
        Err(ExecutorError::cursor_state(
            "right-outer pass requested on a cursor without a right join",
        ))
    }

    /// Splits the cursor into its per-range cursors, in join order
    fn into_cursors(self: Box<Self>) -> Vec<Box<dyn RowCursor>>;
}

/// Lifecycle state of a range cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    BeforeFirst,
    Scanning,
    Exhausted,
}

/// Cursor over the rows of one range
pub struct RangeCursor {
    range: Arc<RangeVariable>,
    where_driven: bool,
    state: CursorState,
    alternative: usize,
    scan: Option<RowScan>,
    current: Option<Row>,
    current_data: Arc<[Value]>,
    left_outer_pending: bool,
    on_outer_rows: bool,
    matched: Option<HashSet<RowId>>,
    materialized: bool,
    telemetry: Telemetry,
}

impl fmt::Debug for RangeCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeCursor")
            .field("table", &self.range.table().name())
            .field("position", &self.range.position())
            .field("state", &self.state)
            .field("alternative", &self.alternative)
            .field("on_outer_rows", &self.on_outer_rows)
            .finish()
    }
}

impl RangeCursor {
    pub fn new(range: Arc<RangeVariable>, ctx: &ExecutionContext) -> Self {
        let matched = range
            .is_right_join()
            .then(|| HashSet::with_capacity(ctx.config().right_outer_set_capacity));
        Self {
            where_driven: range.is_where_driven(),
            current_data: range.table().empty_row_tuple(),
            range,
            state: CursorState::BeforeFirst,
            alternative: 0,
            scan: None,
            current: None,
            left_outer_pending: false,
            on_outer_rows: false,
            matched,
            materialized: false,
            telemetry: ctx.telemetry().clone(),
        }
    }

    pub fn range(&self) -> &Arc<RangeVariable> {
        &self.range
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Alternative currently scanned
    pub fn alternative(&self) -> usize {
        self.alternative
    }

    pub fn is_on_outer_rows(&self) -> bool {
        self.on_outer_rows
    }

    /// Number of distinct rows matched so far on a right-outer range
    pub fn matched_count(&self) -> usize {
        self.matched.as_ref().map_or(0, HashSet::len)
    }

    /// Current row values, the relation-shaped NULL tuple when padded
    pub fn current_data(&self) -> &Arc<[Value]> {
        &self.current_data
    }

    fn alternative_count(&self) -> usize {
        if self.on_outer_rows || self.where_driven {
            self.range.where_conditions().len()
        } else {
            self.range.join_conditions().len()
        }
    }

    fn advance(&mut self, ctx: &ExecutionContext) -> ExecutorResult<bool> {
        if self.state == CursorState::Exhausted {
            return Ok(false);
        }

        while self.alternative < self.alternative_count() {
            if self.state == CursorState::BeforeFirst {
                self.open_alternative(ctx)?;
                self.state = CursorState::Scanning;
            }

            let found = if self.on_outer_rows {
                self.find_next_outer(ctx)?
            } else {
                self.find_next(ctx)?
            };
            if found {
                return Ok(true);
            }

            self.close_scan();
            self.state = CursorState::BeforeFirst;
            self.alternative += 1;
        }

        self.state = CursorState::Exhausted;
        self.alternative = 0;
        Ok(false)
    }

    fn open_alternative(&mut self, ctx: &ExecutionContext) -> ExecutorResult<()> {
        let range = Arc::clone(&self.range);
        let i = self.alternative;
        let join = &range.join_conditions()[i];
        let filter = &range.where_conditions()[i];

        if i == 0 && !self.on_outer_rows {
            self.left_outer_pending = range.is_left_join();
        }

        let always_false = if self.on_outer_rows {
            filter.is_always_false()
        } else {
            join.is_always_false() || filter.is_always_false()
        };
        if always_false {
            self.scan = Some(RowScan::empty());
            self.telemetry.metrics().increment_alternatives_skipped();
            let alternative = i.to_string();
            self.telemetry.log(
                Event::AlternativeSkipped,
                &[("alternative", alternative.as_str()), ("table", range.table().name())],
            );
            return Ok(());
        }

        let table = range.table();
        if !self.materialized || table.is_correlated() {
            table
                .materialize(ctx)
                .map_err(|e| ExecutorError::evaluation_failed(range.position(), e))?;
            self.materialized = true;
        }

        let driving = if self.on_outer_rows || self.where_driven {
            filter
        } else {
            join
        };
        // a where-driven scan cannot tell which skipped rows matched the join
        if self.where_driven && driving.has_index_condition() {
            self.left_outer_pending = false;
        }

        let scan = self.open_scan(ctx, driving)?;
        if scan.is_open() {
            self.telemetry.metrics().increment_scans_opened();
            let alternative = i.to_string();
            self.telemetry.log(
                Event::ScanOpened,
                &[("alternative", alternative.as_str()), ("table", range.table().name())],
            );
        }
        self.scan = Some(scan);
        Ok(())
    }

    fn open_scan(&self, ctx: &ExecutionContext, condition: &AccessCondition) -> ExecutorResult<RowScan> {
        let position = self.range.position();
        let table = self.range.table();
        let tracker = ctx.catalog().scan_tracker();
        let reversed = condition.is_reversed();
        let distinct = if self.on_outer_rows {
            0
        } else {
            self.range.distinct_len()
        };

        let Some(index_ref) = condition.index() else {
            return table
                .open_scan(tracker, reversed)
                .map_err(|e| ExecutorError::storage_failed(position, e));
        };
        let index = ctx
            .catalog()
            .index(index_ref.id)
            .map_err(|_| ExecutorError::index_missing(position, index_ref.id))?;

        let start = resolve_start(condition, ctx)
            .map_err(|e| ExecutorError::evaluation_failed(position, e))?;
        let scan = match start {
            ScanStart::Empty => Ok(index.empty_scan()),
            ScanStart::Unrestricted if distinct == 0 => {
                if reversed {
                    index.open_reversed(table, tracker)
                } else {
                    index.open_forward(table, tracker)
                }
            }
            ScanStart::Unrestricted => {
                let comparator = if reversed {
                    Comparator::SmallerEqual
                } else {
                    Comparator::GreaterEqual
                };
                index.open_from(table, tracker, &[], 0, distinct, comparator, reversed)
            }
            ScanStart::Positioned {
                values,
                prefix_len,
                comparator,
            } => index.open_from(table, tracker, &values, prefix_len, distinct, comparator, reversed),
        };
        scan.map_err(|e| ExecutorError::storage_failed(position, e))
    }

    fn find_next(&mut self, ctx: &ExecutionContext) -> ExecutorResult<bool> {
        let range = Arc::clone(&self.range);
        let i = self.alternative;
        let join = &range.join_conditions()[i];
        let filter = &range.where_conditions()[i];
        let (driving, join_check, where_check) = if self.where_driven {
            (filter, join.condition(), filter.residual())
        } else {
            (join, join.residual(), filter.condition())
        };

        while let Some(row) = self.scan.as_mut().and_then(RowScan::next_row) {
            self.set_current(ctx, row);

            if !self.holds(ctx, driving.terminal())? {
                break;
            }
            if !self.holds(ctx, driving.end_condition())? {
                if self.where_driven {
                    self.left_outer_pending = false;
                }
                break;
            }
            if !self.holds(ctx, join_check)? {
                self.telemetry.metrics().increment_rows_rejected();
                continue;
            }
            if !self.holds(ctx, where_check)? {
                // the row matched the join, so no padding for this outer row
                self.left_outer_pending = false;
                self.record_match();
                self.telemetry.metrics().increment_rows_rejected();
                continue;
            }
            if self.excluded(ctx, join, filter)? {
                self.telemetry.metrics().increment_rows_excluded();
                continue;
            }

            self.record_match();
            self.left_outer_pending = false;
            self.telemetry.metrics().increment_rows_emitted();
            return Ok(true);
        }

        self.close_scan();
        self.clear_current(ctx);

        let last = i + 1 == self.alternative_count();
        if self.left_outer_pending && last {
            self.left_outer_pending = false;
            if self.holds(ctx, filter.condition())? {
                self.telemetry.metrics().increment_left_outer_padded();
                self.telemetry.metrics().increment_rows_emitted();
                self.telemetry
                    .log(Event::LeftOuterPadded, &[("table", range.table().name())]);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn find_next_outer(&mut self, ctx: &ExecutionContext) -> ExecutorResult<bool> {
        let range = Arc::clone(&self.range);
        let filter = &range.where_conditions()[self.alternative];
        let check = if filter.has_index_condition() {
            filter.residual()
        } else {
            filter.condition()
        };

        while let Some(row) = self.scan.as_mut().and_then(RowScan::next_row) {
            let id = row.id();
            self.set_current(ctx, row);

            if !self.holds(ctx, filter.terminal())? || !self.holds(ctx, filter.end_condition())? {
                break;
            }
            if self.matched.as_ref().is_some_and(|m| m.contains(&id)) {
                continue;
            }
            if !self.holds(ctx, check)? {
                self.telemetry.metrics().increment_rows_rejected();
                continue;
            }
            if let Some(exclusion) = filter.exclusion() {
                if self.test(ctx, exclusion)? {
                    self.telemetry.metrics().increment_rows_excluded();
                    continue;
                }
            }

            self.telemetry.metrics().increment_right_outer_rows();
            self.telemetry.metrics().increment_rows_emitted();
            return Ok(true);
        }

        self.close_scan();
        self.clear_current(ctx);
        Ok(false)
    }

    fn set_current(&mut self, ctx: &ExecutionContext, row: Row) {
        self.current_data = Arc::clone(row.data());
        ctx.bind_row(self.range.position(), Arc::clone(&self.current_data));
        self.current = Some(row);
    }

    fn clear_current(&mut self, ctx: &ExecutionContext) {
        self.current = None;
        self.current_data = self.range.table().empty_row_tuple();
        ctx.bind_row(self.range.position(), Arc::clone(&self.current_data));
    }

    fn test(&self, ctx: &ExecutionContext, e: &Expression) -> ExecutorResult<bool> {
        e.test_condition(ctx)
            .map_err(|err| ExecutorError::evaluation_failed(self.range.position(), err))
    }

    /// An absent condition holds
    fn holds(&self, ctx: &ExecutionContext, e: Option<&Expression>) -> ExecutorResult<bool> {
        match e {
            Some(e) => self.test(ctx, e),
            None => Ok(true),
        }
    }

    fn excluded(
        &self,
        ctx: &ExecutionContext,
        join: &AccessCondition,
        filter: &AccessCondition,
    ) -> ExecutorResult<bool> {
        for exclusion in [join.exclusion(), filter.exclusion()].into_iter().flatten() {
            if self.test(ctx, exclusion)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn record_match(&mut self) {
        if let (Some(matched), Some(row)) = (self.matched.as_mut(), self.current.as_ref()) {
            matched.insert(row.id());
        }
    }

    fn close_scan(&mut self) {
        if let Some(mut scan) = self.scan.take() {
            if scan.release() {
                self.telemetry.metrics().increment_scans_released();
                self.telemetry
                    .log(Event::ScanReleased, &[("table", self.range.table().name())]);
            }
        }
    }

    fn fail(&mut self, err: &ExecutorError) {
        self.close_scan();
        self.state = CursorState::Exhausted;
        self.alternative = 0;
        self.current = None;
        self.left_outer_pending = false;
        if err.code() == ExecutorErrorCode::KeelEvaluationFailed {
            self.telemetry.metrics().increment_evaluation_failures();
        }
        self.telemetry.log(
            Event::CursorFailed,
            &[
                ("code", err.code().code()),
                ("reason", err.message()),
                ("table", self.range.table().name()),
            ],
        );
    }
}

impl RowCursor for RangeCursor {
    fn next(&mut self, ctx: &ExecutionContext) -> ExecutorResult<bool> {
        match self.advance(ctx) {
            Ok(found) => Ok(found),
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    fn current(&self) -> Vec<Value> {
        self.current_data.to_vec()
    }

    fn current_row_id(&self) -> Option<RowId> {
        self.current.as_ref().map(Row::id)
    }

    fn reset(&mut self) {
        self.close_scan();
        self.state = CursorState::BeforeFirst;
        self.alternative = 0;
        self.current = None;
        self.current_data = self.range.table().empty_row_tuple();
        self.left_outer_pending = false;
    }

    fn release(&mut self) {
        self.close_scan();
        self.state = CursorState::Exhausted;
    }

    fn set_on_outer_rows(&mut self) -> ExecutorResult<()> {
        if !self.range.is_right_join() {
            return Err(ExecutorError::cursor_state(format!(
                "range '{}' is not right-outer joined",
                self.range.table_alias()
            )));
        }
        self.reset();
        self.on_outer_rows = true;
        self.telemetry
            .log(Event::RightOuterPassBegin, &[("table", self.range.table().name())]);
        Ok(())
    }

    fn into_cursors(self: Box<Self>) -> Vec<Box<dyn RowCursor>> {
        vec![self]
    }
}

impl Drop for RangeCursor {
    fn drop(&mut self) {
        self.close_scan();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::EngineConfig;
    use crate::planner::ConditionPhase;
    use crate::storage::{ColumnDef, Table};
    use crate::types::DataType;

    fn setup() -> (Arc<Catalog>, Arc<Table>) {
        let catalog = Arc::new(Catalog::new());
        let table = catalog.create_table(
            "T",
            vec![
                ColumnDef::new("A", DataType::Integer),
                ColumnDef::new("B", DataType::Integer),
            ],
        );
        catalog
            .insert_all(
                table.id(),
                vec![
                    vec![Value::Integer(5), Value::Integer(10)],
                    vec![Value::Integer(5), Value::Integer(11)],
                    vec![Value::Integer(6), Value::Integer(12)],
                    vec![Value::Integer(5), Value::Integer(20)],
                ],
            )
            .unwrap();
        (catalog, table)
    }

    fn col(c: usize) -> Expression {
        Expression::column(0, c, ["T.A", "T.B"][c], DataType::Integer)
    }

    fn collect(cursor: &mut RangeCursor, ctx: &ExecutionContext) -> Vec<Vec<Value>> {
        let mut rows = Vec::new();
        while cursor.next(ctx).unwrap() {
            rows.push(cursor.current());
        }
        rows
    }

    #[test]
    fn test_composite_index_equal_then_greater() {
        let (catalog, table) = setup();
        let index = catalog.create_index(table.id(), "IDX_AB", vec![0, 1]).unwrap();
        let mut range = RangeVariable::new(&catalog, table, 0);
        range.set_sort_index(index, false);
        range.add_condition(ConditionPhase::Join, Expression::eq(col(0), Expression::literal(5)));
        range.add_condition(ConditionPhase::Join, Expression::gt(col(1), Expression::literal(10)));

        let ctx = ExecutionContext::new(Arc::clone(&catalog), EngineConfig::default());
        let mut cursor = RangeCursor::new(Arc::new(range), &ctx);
        let rows = collect(&mut cursor, &ctx);

        assert_eq!(
            rows,
            vec![
                vec![Value::Integer(5), Value::Integer(11)],
                vec![Value::Integer(5), Value::Integer(20)],
            ]
        );
        assert_eq!(cursor.state(), CursorState::Exhausted);
        assert_eq!(catalog.scan_tracker().open_scans(), 0);
    }

    #[test]
    fn test_full_scan_with_residual() {
        let (catalog, table) = setup();
        let mut range = RangeVariable::new(&catalog, table, 0);
        range.add_condition(ConditionPhase::Where, Expression::gt(col(1), Expression::literal(10)));

        let ctx = ExecutionContext::new(Arc::clone(&catalog), EngineConfig::default());
        let mut cursor = RangeCursor::new(Arc::new(range), &ctx);
        assert_eq!(collect(&mut cursor, &ctx).len(), 3);
        assert_eq!(ctx.metrics().snapshot().rows_rejected, 1);
    }

    #[test]
    fn test_always_false_opens_no_scan() {
        let (catalog, table) = setup();
        let mut range = RangeVariable::new(&catalog, table, 0);
        range.add_condition(ConditionPhase::Join, Expression::false_literal());

        let ctx = ExecutionContext::new(Arc::clone(&catalog), EngineConfig::default());
        let mut cursor = RangeCursor::new(Arc::new(range), &ctx);
        assert!(!cursor.next(&ctx).unwrap());
        assert_eq!(catalog.scan_tracker().total_opened(), 0);
        assert_eq!(ctx.metrics().snapshot().alternatives_skipped, 1);
    }

    #[test]
    fn test_exhausted_until_reset() {
        let (catalog, table) = setup();
        let range = RangeVariable::new(&catalog, table, 0);
        let ctx = ExecutionContext::new(Arc::clone(&catalog), EngineConfig::default());
        let mut cursor = RangeCursor::new(Arc::new(range), &ctx);

        let first = collect(&mut cursor, &ctx);
        assert!(!cursor.next(&ctx).unwrap());

        cursor.reset();
        assert_eq!(cursor.state(), CursorState::BeforeFirst);
        assert_eq!(collect(&mut cursor, &ctx), first);
    }

    #[test]
    fn test_release_returns_scan() {
        let (catalog, table) = setup();
        let range = RangeVariable::new(&catalog, table, 0);
        let ctx = ExecutionContext::new(Arc::clone(&catalog), EngineConfig::default());
        let mut cursor = RangeCursor::new(Arc::new(range), &ctx);

        assert!(cursor.next(&ctx).unwrap());
        assert_eq!(catalog.scan_tracker().open_scans(), 1);
        assert!(cursor.current_row_id().is_some());

        cursor.release();
        assert_eq!(catalog.scan_tracker().open_scans(), 0);
        assert!(!cursor.next(&ctx).unwrap());
    }

    #[test]
    fn test_outer_rows_requires_right_join() {
        let (catalog, table) = setup();
        let range = RangeVariable::new(&catalog, table, 0);
        let ctx = ExecutionContext::new(Arc::clone(&catalog), EngineConfig::default());
        let mut cursor = RangeCursor::new(Arc::new(range), &ctx);

        let err = cursor.set_on_outer_rows().unwrap_err();
        assert_eq!(err.code(), ExecutorErrorCode::KeelCursorState);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_dropped_index_is_fatal() {
        let (catalog, table) = setup();
        let index = catalog.create_index(table.id(), "IDX_A", vec![0]).unwrap();
        let mut range = RangeVariable::new(&catalog, table, 0);
        range.set_sort_index(index.clone(), false);
        catalog.drop_index(index.id).unwrap();

        let ctx = ExecutionContext::new(Arc::clone(&catalog), EngineConfig::default());
        let mut cursor = RangeCursor::new(Arc::new(range), &ctx);
        let err = cursor.next(&ctx).unwrap_err();
        assert_eq!(err.code(), ExecutorErrorCode::KeelIndexMissing);
        assert_eq!(cursor.state(), CursorState::Exhausted);
    }
}
