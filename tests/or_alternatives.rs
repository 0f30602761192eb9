//! OR Alternative Tests
//!
//! Tests for disjunctive access paths:
//! - Each alternative is scanned in turn
//! - A row matched by an earlier alternative is never emitted again
//! - Always-false alternatives are skipped without a scan
//! - Alternatives on an inner join range keep the join predicate

mod common;

use std::sync::Arc;

use common::{col, context, drain, int, ints, pairs, shop};
use keeldb::executor::open_cursor;
use keeldb::expression::Expression;
use keeldb::index::IndexRef;
use keeldb::storage::{ColumnDef, Table};
use keeldb::{AccessCondition, Catalog, ConditionPhase, DataType, RangeVariable, Value};

// =============================================================================
// Helper Functions
// =============================================================================

const ROWS: &[(i32, i32)] = &[(5, 10), (5, 11), (6, 12), (5, 20), (4, 99), (3, 1), (9, 9), (7, 7)];

fn setup() -> (Arc<Catalog>, Arc<Table>, IndexRef) {
    let catalog = Arc::new(Catalog::new());
    let table = pairs(&catalog, ROWS);
    let index = catalog.create_index(table.id(), "IDX_A", vec![0]).unwrap();
    (catalog, table, index)
}

fn alternative(range: &RangeVariable, index: Option<IndexRef>, e: Expression) -> AccessCondition {
    let mut path = range.new_condition(ConditionPhase::Where, index);
    path.add_condition(e);
    path
}

fn run(catalog: &Arc<Catalog>, range: RangeVariable) -> Vec<Vec<Value>> {
    let ctx = context(catalog);
    let mut cursor = open_cursor(&[Arc::new(range)], &ctx).unwrap();
    drain(cursor.as_mut(), &ctx)
}

// =============================================================================
// Alternative Scan Tests
// =============================================================================

/// `A = 5 OR A = 7 OR B >= 9`: index lookups first, then a full scan that
/// skips rows the lookups already produced.
#[test]
fn test_or_alternatives_without_duplicates() {
    let (catalog, t, index) = setup();
    let mut range = RangeVariable::new(&catalog, Arc::clone(&t), 0);
    let alternatives = vec![
        alternative(&range, Some(index.clone()), Expression::eq(col(0, &t, "A"), int(5))),
        alternative(&range, Some(index), Expression::eq(col(0, &t, "A"), int(7))),
        alternative(&range, None, Expression::ge(col(0, &t, "B"), int(9))),
    ];
    range.set_alternatives(ConditionPhase::Where, alternatives).unwrap();

    assert!(range.is_where_driven());
    assert_eq!(range.join_conditions().len(), 3);
    assert!(range.where_conditions()[0].exclusion().is_none());
    assert!(range.where_conditions()[2].exclusion().is_some());

    let rows = run(&catalog, range);
    assert_eq!(
        rows,
        vec![
            ints(&[5, 10]),
            ints(&[5, 11]),
            ints(&[5, 20]),
            ints(&[7, 7]),
            ints(&[6, 12]),
            ints(&[4, 99]),
            ints(&[9, 9]),
        ]
    );
    assert_eq!(catalog.scan_tracker().open_scans(), 0);
}

/// Overlapping alternatives still yield each row once.
#[test]
fn test_overlapping_alternatives() {
    let (catalog, t, index) = setup();
    let mut range = RangeVariable::new(&catalog, Arc::clone(&t), 0);
    let alternatives = vec![
        alternative(&range, Some(index.clone()), Expression::ge(col(0, &t, "A"), int(6))),
        alternative(&range, Some(index), Expression::ge(col(0, &t, "A"), int(5))),
    ];
    range.set_alternatives(ConditionPhase::Where, alternatives).unwrap();

    let ctx = context(&catalog);
    let mut cursor = open_cursor(&[Arc::new(range)], &ctx).unwrap();
    let rows = drain(cursor.as_mut(), &ctx);

    let firsts: Vec<Value> = rows.into_iter().map(|r| r[0].clone()).collect();
    assert_eq!(firsts, ints(&[6, 7, 9, 5, 5, 5]));
    assert_eq!(ctx.metrics().snapshot().rows_excluded, 3);
}

/// An always-false alternative issues no scan.
#[test]
fn test_always_false_alternative_skipped() {
    let (catalog, t, index) = setup();
    let mut range = RangeVariable::new(&catalog, Arc::clone(&t), 0);
    let alternatives = vec![
        alternative(&range, Some(index.clone()), Expression::eq(col(0, &t, "A"), int(3))),
        alternative(&range, None, Expression::false_literal()),
        alternative(&range, Some(index), Expression::eq(col(0, &t, "A"), int(4))),
    ];
    range.set_alternatives(ConditionPhase::Where, alternatives).unwrap();
    assert!(range.where_conditions()[1].is_always_false());

    let ctx = context(&catalog);
    let mut cursor = open_cursor(&[Arc::new(range)], &ctx).unwrap();
    let rows = drain(cursor.as_mut(), &ctx);

    assert_eq!(rows, vec![ints(&[3, 1]), ints(&[4, 99])]);
    assert_eq!(catalog.scan_tracker().total_opened(), 2);
    assert_eq!(ctx.metrics().snapshot().alternatives_skipped, 1);
}

/// A range whose only path is always false never touches storage.
#[test]
fn test_always_false_range() {
    let (catalog, t, _) = setup();
    let mut range = RangeVariable::new(&catalog, Arc::clone(&t), 0);
    range.add_condition(
        ConditionPhase::Where,
        Expression::and_fold(
            Some(Expression::gt(col(0, &t, "A"), int(1))),
            Expression::false_literal(),
        ),
    );

    assert!(run(&catalog, range).is_empty());
    assert_eq!(catalog.scan_tracker().total_opened(), 0);
}

// =============================================================================
// Join Alternative Tests
// =============================================================================

/// `CUSTOMERS c JOIN PAYMENTS p ON p.ID = c.ID WHERE p.AMOUNT = 50 OR
/// p.AMOUNT = 90`: every alternative still checks the key-bound join
/// predicate against the current customer.
#[test]
fn test_where_alternatives_on_joined_range() {
    let catalog = shop();
    let customers = catalog.table_by_name("CUSTOMERS").unwrap();
    let payments = catalog
        .create_table_with_key(
            "PAYMENTS",
            vec![
                ColumnDef::new("ID", DataType::Integer),
                ColumnDef::new("AMOUNT", DataType::Integer),
            ],
            vec![0],
        )
        .unwrap();
    catalog
        .insert_all(
            payments.id(),
            [(1, 50), (2, 90), (3, 50), (4, 90), (5, 50), (6, 70)]
                .iter()
                .map(|&(id, amount)| ints(&[id, amount])),
        )
        .unwrap();

    let mut p = RangeVariable::new(&catalog, Arc::clone(&payments), 1);
    p.add_condition(
        ConditionPhase::Join,
        Expression::eq(col(1, &payments, "ID"), col(0, &customers, "ID")),
    );
    assert!(p.join_conditions()[0].has_index_condition());
    let alternatives = vec![
        alternative(&p, None, Expression::eq(col(1, &payments, "AMOUNT"), int(50))),
        alternative(&p, None, Expression::eq(col(1, &payments, "AMOUNT"), int(90))),
    ];
    p.set_alternatives(ConditionPhase::Where, alternatives).unwrap();
    assert_eq!(p.join_conditions().len(), 2);
    assert!(p.join_conditions()[1].condition().is_some());

    let c = RangeVariable::new(&catalog, customers, 0);
    let ctx = context(&catalog);
    let mut cursor = open_cursor(&[Arc::new(c), Arc::new(p)], &ctx).unwrap();
    let rows = drain(cursor.as_mut(), &ctx);

    assert_eq!(
        rows,
        vec![
            vec![Value::Integer(1), Value::text("ada"), Value::Integer(1), Value::Integer(50)],
            vec![Value::Integer(2), Value::text("bob"), Value::Integer(2), Value::Integer(90)],
            vec![Value::Integer(3), Value::text("cyd"), Value::Integer(3), Value::Integer(50)],
        ]
    );
    assert_eq!(catalog.scan_tracker().open_scans(), 0);
}

// =============================================================================
// Planning Tests
// =============================================================================

/// The explain output lists every driving alternative.
#[test]
fn test_explain_lists_alternatives() {
    let (catalog, t, index) = setup();
    let mut range = RangeVariable::new(&catalog, Arc::clone(&t), 0);
    let alternatives = vec![
        alternative(&range, Some(index.clone()), Expression::eq(col(0, &t, "A"), int(5))),
        alternative(&range, Some(index), Expression::eq(col(0, &t, "A"), int(7))),
    ];
    range.set_alternatives(ConditionPhase::Where, alternatives).unwrap();

    let explain = range.explain();
    assert_eq!(explain.driving_phase, "WHERE");
    assert_eq!(explain.alternatives.len(), 2);
    assert_eq!(explain.alternatives[1].index.as_deref(), Some("IDX_A"));

    let json: serde_json::Value = serde_json::from_str(&explain.to_json()).unwrap();
    assert_eq!(json["access"], "INDEX PRED");
    assert!(explain.to_string().contains("OR Path 1:"));
}

/// Alternatives must be built for the range they are installed on.
#[test]
fn test_alternatives_for_other_range_rejected() {
    let (catalog, t, _) = setup();
    let mut range = RangeVariable::new(&catalog, Arc::clone(&t), 0);
    let other = RangeVariable::new(&catalog, t, 1);
    let foreign = vec![other.new_condition(ConditionPhase::Where, None)];

    assert!(range.set_alternatives(ConditionPhase::Where, foreign).is_err());
    assert!(range.set_alternatives(ConditionPhase::Where, Vec::new()).is_err());
}
