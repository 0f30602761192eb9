//! Range variables: compiled descriptors of the relations in a query
//!
//! A range variable owns the join-phase and where-phase access conditions
//! of one relation. Index 0 of each list is the primary path; further
//! entries are OR alternatives.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::catalog::Catalog;
use crate::expression::Expression;
use crate::index::IndexRef;
use crate::observability::{log_event, Event, Severity};
use crate::storage::{ColumnDef, Table, TableId};

use super::access::AccessCondition;
use super::errors::{PlannerError, PlannerResult};
use super::explain::AccessExplain;

/// Outer-join mode of a range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub fn from_flags(left: bool, right: bool) -> Self {
        match (left, right) {
            (false, false) => JoinKind::Inner,
            (true, false) => JoinKind::Left,
            (false, true) => JoinKind::Right,
            (true, true) => JoinKind::Full,
        }
    }

    /// Unmatched outer rows are null-padded on this range
    pub fn is_left(&self) -> bool {
        matches!(self, JoinKind::Left | JoinKind::Full)
    }

    /// Unmatched rows of this range are emitted in a second pass
    pub fn is_right(&self) -> bool {
        matches!(self, JoinKind::Right | JoinKind::Full)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT OUTER",
            JoinKind::Right => "RIGHT OUTER",
            JoinKind::Full => "FULL",
        }
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a range ranges over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RangeKind {
    Table,
    Variable,
    Parameter,
}

/// Which condition list an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionPhase {
    /// ON conditions, checked while joining
    Join,
    /// WHERE conditions, checked after the join condition matched
    Where,
}

/// Compiled descriptor of one relation participating in a query
#[derive(Debug, Clone)]
pub struct RangeVariable {
    kind: RangeKind,
    table: Arc<Table>,
    primary_index: Option<IndexRef>,
    table_alias: Option<String>,
    column_aliases: Option<Vec<String>>,
    position: usize,
    join_kind: JoinKind,
    join_conditions: Vec<AccessCondition>,
    where_conditions: Vec<AccessCondition>,
    distinct_len: usize,
    used_columns: Vec<bool>,
    named_join_columns: Option<Vec<String>>,
    named_join_expressions: HashMap<String, Expression>,
}

impl RangeVariable {
    /// Range over `table` at join position `position`
    pub fn new(catalog: &Catalog, table: Arc<Table>, position: usize) -> Self {
        let primary_index = primary_index_ref(catalog, &table);
        let used_columns = vec![false; table.column_count()];
        Self {
            kind: RangeKind::Table,
            join_conditions: vec![AccessCondition::with_index(position, true, primary_index.clone())],
            where_conditions: vec![AccessCondition::new(position, false)],
            table,
            primary_index,
            table_alias: None,
            column_aliases: None,
            position,
            join_kind: JoinKind::Inner,
            distinct_len: 0,
            used_columns,
            named_join_columns: None,
            named_join_expressions: HashMap::new(),
        }
    }

    /// Range with a correlation name and optional column aliases.
    ///
    /// The alias list must name every column of the relation.
    pub fn with_alias(
        catalog: &Catalog,
        table: Arc<Table>,
        alias: Option<String>,
        column_aliases: Option<Vec<String>>,
        position: usize,
    ) -> PlannerResult<Self> {
        if let Some(aliases) = &column_aliases {
            if aliases.len() != table.column_count() {
                return Err(PlannerError::column_alias(
                    table.name(),
                    aliases.len(),
                    table.column_count(),
                ));
            }
        }
        let mut range = Self::new(catalog, table, position);
        range.table_alias = alias;
        range.column_aliases = column_aliases;
        Ok(range)
    }

    /// Range over a variable or parameter list. Such ranges resolve names
    /// but hold no rows.
    pub fn for_variables(
        kind: RangeKind,
        alias: Option<String>,
        variables: Vec<ColumnDef>,
        position: usize,
    ) -> Self {
        let name = alias.clone().unwrap_or_default();
        let table = Arc::new(Table::new(TableId(0), "", name, variables, None, None));
        let used_columns = vec![false; table.column_count()];
        Self {
            kind,
            join_conditions: vec![AccessCondition::new(position, true)],
            where_conditions: vec![AccessCondition::new(position, false)],
            table,
            primary_index: None,
            table_alias: alias,
            column_aliases: None,
            position,
            join_kind: JoinKind::Inner,
            distinct_len: 0,
            used_columns,
            named_join_columns: None,
            named_join_expressions: HashMap::new(),
        }
    }

    /// Independent copy sharing the relation
    pub fn duplicate(&self) -> Self {
        Self {
            kind: self.kind,
            table: Arc::clone(&self.table),
            primary_index: self.primary_index.clone(),
            table_alias: self.table_alias.clone(),
            column_aliases: self.column_aliases.clone(),
            position: self.position,
            join_kind: self.join_kind,
            join_conditions: self.join_conditions.to_vec(),
            where_conditions: self.where_conditions.to_vec(),
            distinct_len: self.distinct_len,
            used_columns: self.used_columns.clone(),
            named_join_columns: self.named_join_columns.clone(),
            named_join_expressions: self.named_join_expressions.clone(),
        }
    }

    /// Replaces both condition lists with fresh single paths, keeping the
    /// join path's index
    pub fn reset_conditions(&mut self) {
        let index = self.join_conditions[0].index().cloned();
        self.join_conditions = vec![AccessCondition::with_index(self.position, true, index)];
        self.where_conditions = vec![AccessCondition::new(self.position, false)];
    }

    pub fn kind(&self) -> RangeKind {
        self.kind
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn join_kind(&self) -> JoinKind {
        self.join_kind
    }

    pub fn is_left_join(&self) -> bool {
        self.join_kind.is_left()
    }

    pub fn is_right_join(&self) -> bool {
        self.join_kind.is_right()
    }

    /// Sets the outer-join mode. A right or full join scans its where
    /// path over the primary index so the anti-join pass sees every row.
    pub fn set_join_type(&mut self, left: bool, right: bool) {
        self.join_kind = JoinKind::from_flags(left, right);
        if right {
            self.where_conditions[0].set_index(self.primary_index.clone());
        }
    }

    pub fn join_conditions(&self) -> &[AccessCondition] {
        &self.join_conditions
    }

    pub fn where_conditions(&self) -> &[AccessCondition] {
        &self.where_conditions
    }

    pub fn conditions(&self, phase: ConditionPhase) -> &[AccessCondition] {
        match phase {
            ConditionPhase::Join => &self.join_conditions,
            ConditionPhase::Where => &self.where_conditions,
        }
    }

    fn conditions_mut(&mut self, phase: ConditionPhase) -> &mut Vec<AccessCondition> {
        match phase {
            ConditionPhase::Join => &mut self.join_conditions,
            ConditionPhase::Where => &mut self.where_conditions,
        }
    }

    /// A fresh path for this range, for building OR alternatives
    pub fn new_condition(&self, phase: ConditionPhase, index: Option<IndexRef>) -> AccessCondition {
        AccessCondition::with_index(self.position, phase == ConditionPhase::Join, index)
    }

    /// Folds a predicate into the active (last) alternative of `phase`
    pub fn add_condition(&mut self, phase: ConditionPhase, e: Expression) {
        if let Some(active) = self.conditions_mut(phase).last_mut() {
            active.add_condition(e);
        }
    }

    /// Installs planner-chosen leading bounds on the first alternative
    pub fn add_index_condition(
        &mut self,
        phase: ConditionPhase,
        exprs: Vec<Expression>,
        index: IndexRef,
        col_count: usize,
    ) -> PlannerResult<()> {
        self.conditions_mut(phase)[0].add_index_condition(exprs, index, col_count)
    }

    /// Installs OR alternatives for `phase`.
    ///
    /// Alternative `j` excludes rows matched by any earlier alternative.
    /// The other phase is padded to the same length with copies of its
    /// first residual.
    pub fn set_alternatives(
        &mut self,
        phase: ConditionPhase,
        mut alternatives: Vec<AccessCondition>,
    ) -> PlannerResult<()> {
        if alternatives.is_empty() {
            return Err(PlannerError::invalid_access_path("empty alternative list"));
        }
        if alternatives.iter().any(|a| a.range() != self.position) {
            return Err(PlannerError::invalid_access_path(
                "alternative built for another range",
            ));
        }

        let mut exclusion: Option<Expression> = None;
        for alternative in alternatives.iter_mut() {
            alternative.set_exclusion(exclusion.clone());
            let predicate = alternative
                .condition()
                .cloned()
                .unwrap_or_else(Expression::true_literal);
            exclusion = Some(Expression::or_fold(exclusion, predicate));
        }

        *self.conditions_mut(phase) = alternatives;

        let len = self.join_conditions.len().max(self.where_conditions.len());
        for list in [&mut self.join_conditions, &mut self.where_conditions] {
            if list.len() < len {
                let filler = AccessCondition::from_condition(&list[0]);
                list.resize(len, filler);
            }
        }
        Ok(())
    }

    /// Returns true if the where-phase alternatives drive the scan: the
    /// first where path has bounds, or OR alternatives were installed on
    /// the where phase
    pub fn is_where_driven(&self) -> bool {
        self.where_conditions[0].has_index_condition()
            || self.where_conditions.iter().any(|c| c.exclusion().is_some())
    }

    /// Returns true if any primary path positions its scan by bounds
    pub fn has_any_index_condition(&self) -> bool {
        self.join_conditions[0].has_index_condition()
            || self.where_conditions[0].has_index_condition()
    }

    /// Returns true for a single join path with bounds
    pub fn has_single_index_condition(&self) -> bool {
        self.join_conditions.len() == 1 && self.join_conditions[0].has_index_condition()
    }

    /// Enables distinct-prefix scanning when the only used column is the
    /// first column of the join index
    pub fn set_distinct_columns_on_index(&mut self, column_map: &[usize]) -> bool {
        if self.join_conditions.len() != 1 {
            return false;
        }
        let Some(index) = self.join_conditions[0].index() else {
            return false;
        };
        let used = self.used_columns.iter().filter(|u| **u).count();
        if column_map.len() != used {
            return false;
        }
        if column_map.len() == 1 && index.columns.first() == Some(&column_map[0]) {
            self.distinct_len = 1;
            return true;
        }
        false
    }

    /// Leading index columns over which only the first row per value is read
    pub fn distinct_len(&self) -> usize {
        self.distinct_len
    }

    /// Index providing the scan order, if there is a single join path
    pub fn sort_index(&self) -> Option<&IndexRef> {
        if self.join_conditions.len() == 1 {
            self.join_conditions[0].index()
        } else {
            None
        }
    }

    /// Uses `index` for ordering when the join path has no bounds
    pub fn set_sort_index(&mut self, index: IndexRef, reversed: bool) -> bool {
        if self.join_conditions.len() == 1 && !self.join_conditions[0].has_index_condition() {
            self.join_conditions[0].set_index(Some(index));
            self.join_conditions[0].set_reversed(reversed);
            return true;
        }
        false
    }

    /// Reverses the primary join path for a descending order
    pub fn reverse_access_path(&mut self) -> PlannerResult<()> {
        self.join_conditions[0].reverse_access_path()
    }

    /// Drops index references from every path after the index was
    /// dropped or altered. The range keeps its position.
    pub fn invalidate_index(&mut self) {
        for condition in self
            .join_conditions
            .iter_mut()
            .chain(self.where_conditions.iter_mut())
        {
            condition.invalidate_index();
        }
        self.primary_index = None;
        log_event(
            Severity::Warn,
            Event::IndexInvalidated,
            &[("table", self.table.name())],
        );
    }

    /// Swaps a view relation for the table of its defining subquery
    pub fn reset_view_as_subquery(&mut self, catalog: &Catalog, subquery: Arc<Table>) {
        self.primary_index = primary_index_ref(catalog, &subquery);
        self.used_columns.resize(subquery.column_count(), false);
        self.table = subquery;
        self.join_conditions[0].set_index(self.primary_index.clone());
    }

    // Column bookkeeping

    /// Marks a column as read by the query
    pub fn add_column(&mut self, column: usize) {
        if let Some(used) = self.used_columns.get_mut(column) {
            *used = true;
        }
    }

    pub fn add_all_columns(&mut self) {
        self.used_columns.iter_mut().for_each(|u| *u = true);
    }

    pub fn used_columns(&self) -> &[bool] {
        &self.used_columns
    }

    /// Names of the used columns in column order
    pub fn column_names(&self) -> Vec<String> {
        self.table
            .columns()
            .iter()
            .zip(&self.used_columns)
            .filter(|(_, used)| **used)
            .map(|(c, _)| c.name.clone())
            .collect()
    }

    /// Exposed column names, failing on duplicates
    pub fn unique_column_names(&self) -> PlannerResult<Vec<String>> {
        if let Some(aliases) = &self.column_aliases {
            return Ok(aliases.clone());
        }
        let mut seen = HashSet::new();
        let mut names = Vec::with_capacity(self.table.column_count());
        for column in self.table.columns() {
            if !seen.insert(column.name.as_str()) {
                return Err(PlannerError::duplicate_column(&column.name));
            }
            names.push(column.name.clone());
        }
        Ok(names)
    }

    pub fn column(&self, i: usize) -> Option<&ColumnDef> {
        self.table.column(i)
    }

    /// Exposed name of column `i`
    pub fn column_alias(&self, i: usize) -> Option<&str> {
        match &self.column_aliases {
            Some(aliases) => aliases.get(i).map(String::as_str),
            None => self.table.column(i).map(|c| c.name.as_str()),
        }
    }

    pub fn has_column_alias(&self) -> bool {
        self.column_aliases.is_some()
    }

    /// Correlation name, or the relation name without one
    pub fn table_alias(&self) -> &str {
        self.table_alias.as_deref().unwrap_or_else(|| self.table.name())
    }

    /// Columns merged by a `USING` / natural join
    pub fn add_named_join_columns(&mut self, columns: Vec<String>) {
        self.named_join_columns = Some(columns);
    }

    pub fn named_join_columns(&self) -> Option<&[String]> {
        self.named_join_columns.as_deref()
    }

    pub fn add_named_join_column_expression(&mut self, name: impl Into<String>, e: Expression) {
        self.named_join_expressions.insert(name.into(), e);
    }

    /// Coalesced expression standing in for a named join column
    pub fn column_expression(&self, name: &str) -> Option<&Expression> {
        self.named_join_expressions.get(name)
    }

    // Resolution

    /// Column index for `name`, optionally qualified by a table name
    pub fn resolve(&self, name: &str, table: Option<&str>) -> Option<usize> {
        if !self.resolves_table_name(table) {
            return None;
        }
        self.find_column(name)
    }

    /// Column index for `schema.table.name`; absent parts match anything
    pub fn resolve_qualified(&self, schema: Option<&str>, table: Option<&str>, name: &str) -> Option<usize> {
        if self.resolves_schema_name(schema) && self.resolves_table_name(table) {
            return self.find_column(name);
        }
        None
    }

    /// This range, if `name` designates it
    pub fn range_for_table_name(&self, name: &str) -> Option<&Self> {
        self.resolves_table_name(Some(name)).then_some(self)
    }

    fn find_column(&self, name: &str) -> Option<usize> {
        if self.named_join_expressions.contains_key(name) {
            return None;
        }
        match (&self.kind, &self.column_aliases) {
            (RangeKind::Variable | RangeKind::Parameter, _) => self.table.find_column(name),
            (RangeKind::Table, Some(aliases)) => aliases.iter().position(|a| a == name),
            (RangeKind::Table, None) => self.table.find_column(name),
        }
    }

    fn resolves_table_name(&self, name: Option<&str>) -> bool {
        let Some(name) = name else {
            return true;
        };
        match (&self.kind, &self.table_alias) {
            (RangeKind::Variable | RangeKind::Parameter, alias) => alias.as_deref() == Some(name),
            (RangeKind::Table, Some(alias)) => alias == name,
            (RangeKind::Table, None) => self.table.name() == name,
        }
    }

    fn resolves_schema_name(&self, name: Option<&str>) -> bool {
        let Some(name) = name else {
            return true;
        };
        if self.kind != RangeKind::Table || self.table_alias.is_some() {
            return false;
        }
        self.table.schema() == name
    }

    /// Structured access-path description
    pub fn explain(&self) -> AccessExplain {
        AccessExplain::from_range(self)
    }

    /// Multi-line access-path description
    pub fn describe(&self, indent: usize) -> String {
        let b = " ".repeat(indent);
        let mut out = String::new();

        out.push_str(&format!("{}join type={}\n", b, self.join_kind));
        out.push_str(&format!("{}table={}\n", b, self.table.name()));
        if let Some(alias) = &self.table_alias {
            out.push_str(&format!("{}alias={}\n", b, alias));
        }

        let where_driven = self.is_where_driven();
        let conditions = if where_driven {
            &self.where_conditions
        } else {
            &self.join_conditions
        };
        let full_scan = !conditions[0].has_index_condition();

        if where_driven {
            if let Some(join) = self.join_conditions[0].residual() {
                out.push_str(&format!("{}join condition = [{}]\n", b, join));
            }
        }

        out.push_str(&format!(
            "{}access={}\n",
            b,
            if full_scan { "FULL SCAN" } else { "INDEX PRED" }
        ));

        for (i, condition) in conditions.iter().enumerate() {
            let label = if i > 0 {
                "OR condition"
            } else if where_driven {
                "where condition"
            } else {
                "join condition"
            };
            out.push_str(&format!(
                "{}{} = [{}{}]\n",
                b,
                label,
                condition.describe(indent + 2),
                b
            ));
        }

        if !where_driven {
            if let Some(residual) = self.where_conditions[0].residual() {
                out.push_str(&format!("{}where condition = [{}]\n", b, residual));
            }
        }
        out
    }
}

fn primary_index_ref(catalog: &Catalog, table: &Table) -> Option<IndexRef> {
    table
        .primary_index()
        .and_then(|id| catalog.index(id).ok())
        .map(|index| index.reference())
}
