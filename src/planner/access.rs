//! Access conditions: one candidate access path for a range
//!
//! An access condition pairs an optional index with an ordered prefix of
//! bounds on the index columns, an end condition that stops the scan, and
//! the residual predicate checked row by row.
//!
//! # Invariants
//!
//! - `start.len() <= index column count`, and `end` is aligned with `start`
//! - Only the last start bound may carry a range comparator; every earlier
//!   one is `Equal` or `IsNull`
//! - A path without an index has no bounds

use crate::expression::{ColumnRef, Expression};
use crate::index::{Comparator, IndexRef};
use crate::types::DataType;

use super::errors::{PlannerError, PlannerResult};

/// A bound on one index column
#[derive(Debug, Clone, PartialEq)]
pub struct IndexBound {
    /// Table column position
    pub column: usize,
    pub column_type: DataType,
    pub comparator: Comparator,
    /// Value expression; the NULL literal for `IsNull`, `NotNull` and `Max`
    pub value: Expression,
    /// Condition the bound was derived from. `None` for `Max`.
    pub predicate: Option<Expression>,
}

impl IndexBound {
    fn not_null(column: &ColumnRef) -> Self {
        Self {
            column: column.column,
            column_type: column.data_type,
            comparator: Comparator::NotNull,
            value: Expression::null(),
            predicate: Some(Expression::not_null(Expression::Column(column.clone()))),
        }
    }
}

/// A condition on a column of this range, normalized with the column on the left
struct Indexable {
    column: ColumnRef,
    comparator: Comparator,
    value: Expression,
    predicate: Expression,
}

impl Indexable {
    fn into_bound(self) -> IndexBound {
        IndexBound {
            column: self.column.column,
            column_type: self.column.data_type,
            comparator: self.comparator,
            value: self.value,
            predicate: Some(self.predicate),
        }
    }
}

/// One candidate access path for a range
#[derive(Debug, Clone, PartialEq)]
pub struct AccessCondition {
    range: usize,
    is_join: bool,
    index: Option<IndexRef>,
    start: Vec<IndexBound>,
    end: Vec<Option<IndexBound>>,
    op_type: Option<Comparator>,
    op_type_end: Comparator,
    end_condition: Option<Expression>,
    residual: Option<Expression>,
    exclusion: Option<Expression>,
    terminal: Option<Expression>,
    condition: Option<Expression>,
    always_false: bool,
    reversed: bool,
}

impl AccessCondition {
    /// An unrestricted path for the range at `range`
    pub fn new(range: usize, is_join: bool) -> Self {
        Self {
            range,
            is_join,
            index: None,
            start: Vec::new(),
            end: Vec::new(),
            op_type: None,
            op_type_end: Comparator::Max,
            end_condition: None,
            residual: None,
            exclusion: None,
            terminal: None,
            condition: None,
            always_false: false,
            reversed: false,
        }
    }

    /// An unrestricted path scanning `index` in key order
    pub fn with_index(range: usize, is_join: bool, index: Option<IndexRef>) -> Self {
        Self {
            index,
            ..Self::new(range, is_join)
        }
    }

    /// An unindexed path checking the whole condition of `base`, bound
    /// predicates included, as a residual
    pub fn from_condition(base: &AccessCondition) -> Self {
        let mut copy = Self::new(base.range, base.is_join);
        if let Some(condition) = base.condition.clone() {
            copy.add_residual(condition.clone());
            copy.condition = Some(condition);
        }
        copy
    }

    pub fn range(&self) -> usize {
        self.range
    }

    pub fn is_join(&self) -> bool {
        self.is_join
    }

    pub fn index(&self) -> Option<&IndexRef> {
        self.index.as_ref()
    }

    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// Returns true if the path positions its scan by bounds
    pub fn has_index_condition(&self) -> bool {
        !self.start.is_empty()
    }

    pub fn indexed_column_count(&self) -> usize {
        self.start.len()
    }

    pub fn start_bounds(&self) -> &[IndexBound] {
        &self.start
    }

    /// End bounds aligned with the start bounds; `None` where open
    pub fn end_bounds(&self) -> &[Option<IndexBound>] {
        &self.end
    }

    /// Comparator positioning the scan
    pub fn op_type(&self) -> Option<Comparator> {
        self.op_type
    }

    /// Comparator of the last end bound, `Max` if the range is open
    pub fn op_type_end(&self) -> Comparator {
        self.op_type_end
    }

    /// Once false, no later row in scan order can match
    pub fn end_condition(&self) -> Option<&Expression> {
        self.end_condition.as_ref()
    }

    pub fn residual(&self) -> Option<&Expression> {
        self.residual.as_ref()
    }

    /// True for rows an earlier OR alternative already produced
    pub fn exclusion(&self) -> Option<&Expression> {
        self.exclusion.as_ref()
    }

    pub fn terminal(&self) -> Option<&Expression> {
        self.terminal.as_ref()
    }

    /// Conjunction of every condition added to the path, bounds included
    pub fn condition(&self) -> Option<&Expression> {
        self.condition.as_ref()
    }

    pub fn is_always_false(&self) -> bool {
        self.always_false
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn set_reversed(&mut self, reversed: bool) {
        self.reversed = reversed;
    }

    pub fn set_exclusion(&mut self, exclusion: Option<Expression>) {
        self.exclusion = exclusion;
    }

    /// Replaces the index of a path that has no bounds
    pub fn set_index(&mut self, index: Option<IndexRef>) {
        if self.start.is_empty() {
            self.index = index;
        }
    }

    /// Folds `e` into the bounds if it extends the index prefix, otherwise
    /// into the residual.
    pub fn add_condition(&mut self, e: Expression) {
        self.condition = Some(Expression::and_fold(self.condition.take(), e.clone()));

        if e.is_terminal() {
            self.terminal = Some(e.clone());
            self.add_residual(e);
            return;
        }

        if !self.try_add_bound(&e) {
            self.add_residual(e);
        }
    }

    /// Installs the leading bounds chosen for `index`.
    ///
    /// `exprs[..col_count]` must be indexable conditions on the leading
    /// index columns, in order. A leading `<`/`<=` becomes a not-null start
    /// with an end bound. Equality conditions are both start and end.
    pub fn add_index_condition(
        &mut self,
        exprs: Vec<Expression>,
        index: IndexRef,
        col_count: usize,
    ) -> PlannerResult<()> {
        if col_count == 0 || col_count > exprs.len() || col_count > index.column_count() {
            return Err(PlannerError::invalid_access_path(format!(
                "{} bound columns requested on index '{}' with {} columns from {} conditions",
                col_count,
                index.name,
                index.column_count(),
                exprs.len()
            )));
        }

        let mut bounds = Vec::with_capacity(col_count);
        for (i, e) in exprs.iter().take(col_count).enumerate() {
            let b = self.indexable(e, true).ok_or_else(|| {
                PlannerError::invalid_access_path(format!("condition {} is not indexable", e))
            })?;
            if index.columns[i] != b.column.column {
                return Err(PlannerError::invalid_access_path(format!(
                    "condition {} does not match column {} of index '{}'",
                    e, i, index.name
                )));
            }
            bounds.push(b);
        }

        let leading = bounds[0].comparator;
        if col_count > 1 && !bounds.iter().all(|b| b.comparator.is_point()) {
            return Err(PlannerError::invalid_access_path(format!(
                "non-monotonic bound sequence on index '{}'",
                index.name
            )));
        }

        self.index = Some(index);
        self.start.clear();
        self.end.clear();
        self.end_condition = None;

        match leading {
            Comparator::NotNull | Comparator::Greater | Comparator::GreaterEqual => {
                self.op_type = Some(leading);
                self.op_type_end = Comparator::Max;
                self.start.extend(bounds.into_iter().map(Indexable::into_bound));
                self.end.push(None);
            }
            Comparator::Smaller | Comparator::SmallerEqual => {
                let b = bounds.remove(0);
                self.start.push(IndexBound::not_null(&b.column));
                self.op_type = Some(Comparator::NotNull);
                self.op_type_end = leading;
                self.push_end(b.into_bound());
            }
            Comparator::Equal | Comparator::IsNull => {
                for b in bounds {
                    let bound = b.into_bound();
                    self.op_type = Some(bound.comparator);
                    self.start.push(bound.clone());
                    self.push_end(bound);
                }
                self.op_type_end = self.op_type.unwrap_or(Comparator::Max);
            }
            Comparator::Max => {
                return Err(PlannerError::invalid_access_path("MAX is not a start comparator"));
            }
        }

        for e in exprs {
            self.condition = Some(Expression::and_fold(self.condition.take(), e));
        }
        Ok(())
    }

    /// Swaps start and end bounds so the scan runs in descending key order
    pub fn reverse_access_path(&mut self) -> PlannerResult<()> {
        if self.start.is_empty() {
            self.reversed = true;
            return Ok(());
        }
        if self.op_type.is_some_and(|op| op.is_point()) {
            return Err(PlannerError::invalid_access_path(
                "point lookup cannot be reversed",
            ));
        }
        if self.reversed {
            return Err(PlannerError::invalid_access_path("access path is already reversed"));
        }

        self.end_condition = None;
        for i in 0..self.start.len() {
            let replacement = match self.end[i].take() {
                Some(end) => end,
                None => IndexBound {
                    comparator: Comparator::Max,
                    value: Expression::null(),
                    predicate: None,
                    ..self.start[i].clone()
                },
            };
            let old = std::mem::replace(&mut self.start[i], replacement);
            if let Some(p) = &old.predicate {
                self.end_condition = Some(Expression::and_fold(self.end_condition.take(), p.clone()));
            }
            self.end[i] = Some(old);
        }

        self.op_type = Some(self.op_type_end);
        self.reversed = true;
        Ok(())
    }

    /// Drops the index. Bound predicates move to the residual so the path
    /// still filters the same rows as a full scan.
    pub fn invalidate_index(&mut self) {
        let mut moved: Vec<Expression> = Vec::new();
        let bound_predicates = self
            .start
            .iter()
            .chain(self.end.iter().flatten())
            .filter_map(|b| b.predicate.clone());
        for p in bound_predicates {
            if !moved.contains(&p) {
                moved.push(p);
            }
        }
        for p in moved {
            self.add_residual(p);
        }

        self.index = None;
        self.start.clear();
        self.end.clear();
        self.end_condition = None;
        self.op_type = None;
        self.op_type_end = Comparator::Max;
    }

    fn add_residual(&mut self, e: Expression) {
        let residual = Expression::and_fold(self.residual.take(), e);
        if residual.is_false_literal() {
            self.always_false = true;
        }
        self.residual = Some(residual);
    }

    fn push_end(&mut self, bound: IndexBound) {
        if let Some(p) = &bound.predicate {
            self.end_condition = Some(Expression::and_fold(self.end_condition.take(), p.clone()));
        }
        self.end.push(Some(bound));
    }

    fn prefix_is_point(&self) -> bool {
        self.op_type.map_or(true, |op| op.is_point())
    }

    fn try_add_bound(&mut self, e: &Expression) -> bool {
        let Some(index) = self.index.clone() else {
            return false;
        };
        if index.column_count() == 0 || self.reversed {
            return false;
        }
        let Some(b) = self.indexable(e, false) else {
            return false;
        };
        let count = self.start.len();
        let on_last = count > 0 && index.columns[count - 1] == b.column.column;

        match b.comparator {
            Comparator::Greater | Comparator::GreaterEqual => {
                if self.op_type == Some(Comparator::NotNull) {
                    if !on_last {
                        return false;
                    }
                    self.op_type = Some(b.comparator);
                    let old = std::mem::replace(&mut self.start[count - 1], b.into_bound());
                    if let Some(p) = old.predicate {
                        self.add_residual(p);
                    }
                    return true;
                }
                self.push_start(&index, b)
            }
            Comparator::Smaller | Comparator::SmallerEqual => {
                if matches!(
                    self.op_type,
                    Some(Comparator::Greater | Comparator::GreaterEqual | Comparator::NotNull)
                ) {
                    if self.op_type_end != Comparator::Max || !on_last {
                        return false;
                    }
                    self.op_type_end = b.comparator;
                    let bound = b.into_bound();
                    if let Some(p) = &bound.predicate {
                        self.end_condition =
                            Some(Expression::and_fold(self.end_condition.take(), p.clone()));
                    }
                    self.end[count - 1] = Some(bound);
                    return true;
                }
                if !self.next_column_is(&index, &b) {
                    return false;
                }
                self.start.push(IndexBound::not_null(&b.column));
                self.op_type = Some(Comparator::NotNull);
                self.op_type_end = b.comparator;
                self.push_end(b.into_bound());
                true
            }
            Comparator::Equal | Comparator::IsNull => self.push_start(&index, b),
            _ => false,
        }
    }

    fn next_column_is(&self, index: &IndexRef, b: &Indexable) -> bool {
        let count = self.start.len();
        self.prefix_is_point() && count < index.column_count() && index.columns[count] == b.column.column
    }

    fn push_start(&mut self, index: &IndexRef, b: Indexable) -> bool {
        if !self.next_column_is(index, &b) {
            return false;
        }
        let bound = b.into_bound();
        self.op_type = Some(bound.comparator);
        self.start.push(bound.clone());
        if bound.comparator.is_point() {
            self.op_type_end = bound.comparator;
            self.push_end(bound);
        } else {
            self.op_type_end = Comparator::Max;
            self.end.push(None);
        }
        true
    }

    /// Normalizes a comparison between a column of this range and an
    /// expression independent of it. `NOT (c IS NULL)` is only accepted for
    /// planner-chosen leading bounds.
    fn indexable(&self, e: &Expression, allow_not_null: bool) -> Option<Indexable> {
        match e.unwrap_terminal() {
            Expression::Compare { op, left, right } => {
                let comparator = Comparator::from_op(*op)?;
                if let Some(column) = self.own_column(left) {
                    if right.references_range(self.range) {
                        return None;
                    }
                    return Some(Indexable {
                        column: column.clone(),
                        comparator,
                        value: (**right).clone(),
                        predicate: e.unwrap_terminal().clone(),
                    });
                }
                let column = self.own_column(right)?;
                if left.references_range(self.range) {
                    return None;
                }
                let swapped = op.swapped();
                Some(Indexable {
                    column: column.clone(),
                    comparator: Comparator::from_op(swapped)?,
                    value: (**left).clone(),
                    predicate: Expression::compare(swapped, (**right).clone(), (**left).clone()),
                })
            }
            Expression::IsNull(inner) => {
                let column = self.own_column(inner)?;
                Some(Indexable {
                    column: column.clone(),
                    comparator: Comparator::IsNull,
                    value: Expression::null(),
                    predicate: e.unwrap_terminal().clone(),
                })
            }
            Expression::Not(inner) if allow_not_null => match inner.as_ref() {
                Expression::IsNull(col) => {
                    let column = self.own_column(col)?;
                    Some(Indexable {
                        column: column.clone(),
                        comparator: Comparator::NotNull,
                        value: Expression::null(),
                        predicate: e.unwrap_terminal().clone(),
                    })
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn own_column<'e>(&self, e: &'e Expression) -> Option<&'e ColumnRef> {
        e.as_column().filter(|c| c.range == self.range)
    }

    /// Multi-line description used by `RangeVariable::describe`
    pub fn describe(&self, indent: usize) -> String {
        let pad = " ".repeat(indent);
        let mut out = String::new();

        if let Some(index) = &self.index {
            out.push_str(&format!("index={}\n", index.name));
        } else {
            out.push_str("index=NONE\n");
        }

        if self.has_index_condition() {
            let starts: Vec<String> = self
                .start
                .iter()
                .map(|b| match &b.predicate {
                    Some(p) => p.to_string(),
                    None => format!("({} {})", b.column, b.comparator),
                })
                .collect();
            out.push_str(&format!("{}start conditions=[{}]\n", pad, starts.join(", ")));

            if let Some(end) = &self.end_condition {
                out.push_str(&format!("{}end condition=[{}]\n", pad, end));
            }
        }

        if let Some(residual) = &self.residual {
            out.push_str(&format!("{}other condition=[{}]\n", pad, residual));
        }
        out
    }
}
