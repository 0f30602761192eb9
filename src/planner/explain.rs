//! Access-path explain output
//!
//! Structured counterpart of `RangeVariable::describe`, serializable for
//! tooling and deterministic when rendered.

use std::fmt;

use serde::Serialize;

use super::access::AccessCondition;
use super::range::{JoinKind, RangeVariable};

/// One alternative of a range's access path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathExplain {
    /// Index name, `None` for a full scan
    pub index: Option<String>,
    pub reversed: bool,
    pub always_false: bool,
    pub start_conditions: Vec<String>,
    pub end_condition: Option<String>,
    pub other_condition: Option<String>,
}

impl PathExplain {
    fn from_condition(condition: &AccessCondition) -> Self {
        let start_conditions = condition
            .start_bounds()
            .iter()
            .map(|b| match &b.predicate {
                Some(p) => p.to_string(),
                None => format!("({} {})", b.column, b.comparator),
            })
            .collect();

        Self {
            index: condition.index().map(|i| i.name.clone()),
            reversed: condition.is_reversed(),
            always_false: condition.is_always_false(),
            start_conditions,
            end_condition: condition.end_condition().map(|e| e.to_string()),
            other_condition: condition.residual().map(|e| e.to_string()),
        }
    }
}

/// Explain output for one range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessExplain {
    pub join_type: JoinKind,
    pub table: String,
    pub alias: Option<String>,
    /// `FULL SCAN` or `INDEX PRED`
    pub access: &'static str,
    /// Phase whose alternatives drive the scan, `JOIN` or `WHERE`
    pub driving_phase: &'static str,
    pub alternatives: Vec<PathExplain>,
    /// Residual of the non-driving phase
    pub filter: Option<String>,
}

impl AccessExplain {
    pub fn from_range(range: &RangeVariable) -> Self {
        let where_driven = range.is_where_driven();
        let (driving, other) = if where_driven {
            (range.where_conditions(), range.join_conditions())
        } else {
            (range.join_conditions(), range.where_conditions())
        };
        let alias = (range.table_alias() != range.table().name())
            .then(|| range.table_alias().to_string());

        Self {
            join_type: range.join_kind(),
            table: range.table().name().to_string(),
            alias,
            access: if driving[0].has_index_condition() {
                "INDEX PRED"
            } else {
                "FULL SCAN"
            },
            driving_phase: if where_driven { "WHERE" } else { "JOIN" },
            alternatives: driving.iter().map(PathExplain::from_condition).collect(),
            filter: other[0].residual().map(|e| e.to_string()),
        }
    }

    /// Serializes to a JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl fmt::Display for AccessExplain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== ACCESS PATH ===")?;
        writeln!(f, "Table: {}", self.table)?;
        if let Some(alias) = &self.alias {
            writeln!(f, "Alias: {}", alias)?;
        }
        writeln!(f, "Join: {}", self.join_type)?;
        writeln!(f, "Access: {}", self.access)?;

        for (i, path) in self.alternatives.iter().enumerate() {
            if i == 0 {
                writeln!(f, "Path ({}):", self.driving_phase)?;
            } else {
                writeln!(f, "OR Path {}:", i)?;
            }
            writeln!(f, "  Index: {}", path.index.as_deref().unwrap_or("NONE"))?;
            if path.always_false {
                writeln!(f, "  Always false")?;
            }
            if path.reversed {
                writeln!(f, "  Reversed")?;
            }
            for start in &path.start_conditions {
                writeln!(f, "  Start: {}", start)?;
            }
            if let Some(end) = &path.end_condition {
                writeln!(f, "  End: {}", end)?;
            }
            if let Some(other) = &path.other_condition {
                writeln!(f, "  Other: {}", other)?;
            }
        }

        if let Some(filter) = &self.filter {
            writeln!(f, "Filter: {}", filter)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::expression::Expression;
    use crate::planner::ConditionPhase;
    use crate::storage::ColumnDef;
    use crate::types::DataType;

    fn col(c: usize) -> Expression {
        Expression::column(0, c, ["T.A", "T.B"][c], DataType::Integer)
    }

    fn range() -> RangeVariable {
        let catalog = Catalog::new();
        let table = catalog.create_table(
            "T",
            vec![
                ColumnDef::new("A", DataType::Integer),
                ColumnDef::new("B", DataType::Integer),
            ],
        );
        let index = catalog.create_index(table.id(), "IDX_AB", vec![0, 1]).unwrap();
        let mut range = RangeVariable::new(&catalog, table, 0);
        range.set_sort_index(index, false);
        range
    }

    #[test]
    fn test_explain_index_path() {
        let mut range = range();
        range.add_condition(ConditionPhase::Join, Expression::eq(col(0), Expression::literal(5)));
        range.add_condition(ConditionPhase::Join, Expression::gt(col(1), Expression::literal(10)));

        let explain = range.explain();
        assert_eq!(explain.access, "INDEX PRED");
        assert_eq!(explain.driving_phase, "JOIN");
        assert_eq!(explain.alternatives[0].index.as_deref(), Some("IDX_AB"));
        assert_eq!(
            explain.alternatives[0].start_conditions,
            vec!["(T.A = 5)".to_string(), "(T.B > 10)".to_string()]
        );
        assert_eq!(explain.alternatives[0].end_condition.as_deref(), Some("(T.A = 5)"));
    }

    #[test]
    fn test_explain_display_and_json() {
        let mut range = range();
        range.add_condition(ConditionPhase::Where, Expression::ne(col(1), Expression::literal(0)));

        let explain = range.explain();
        let text = explain.to_string();
        assert!(text.contains("Access: FULL SCAN"));
        assert!(text.contains("Filter: (T.B <> 0)"));

        let json: serde_json::Value = serde_json::from_str(&explain.to_json()).unwrap();
        assert_eq!(json["join_type"], "INNER");
        assert_eq!(json["table"], "T");
    }
}
