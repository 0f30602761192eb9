//! Outer Join Tests
//!
//! Tests for outer-join row production:
//! - LEFT joins pad unmatched outer rows with NULLs, once after the last
//!   OR alternative
//! - RIGHT joins replay unmatched inner rows in a second pass
//! - FULL joins do both, each unmatched row exactly once

mod common;

use std::sync::Arc;

use common::{col, context, drain, shop};
use keeldb::executor::{open_cursor, ExecutorErrorCode, QueryExecutor};
use keeldb::expression::Expression;
use keeldb::index::IndexRef;
use keeldb::{AccessCondition, Catalog, ConditionPhase, EngineConfig, JoinKind, RangeVariable, Value};

// =============================================================================
// Helper Functions
// =============================================================================

/// `CUSTOMERS c <kind> JOIN ORDERS o ON o.CUSTOMER = c.ID`
fn customer_orders(catalog: &Catalog, left: bool, right: bool) -> (RangeVariable, RangeVariable) {
    let customers = catalog.table_by_name("CUSTOMERS").unwrap();
    let orders = catalog.table_by_name("ORDERS").unwrap();

    let c = RangeVariable::new(catalog, Arc::clone(&customers), 0);
    let mut o = RangeVariable::new(catalog, Arc::clone(&orders), 1);
    o.set_join_type(left, right);
    o.add_condition(
        ConditionPhase::Join,
        Expression::eq(col(1, &orders, "CUSTOMER"), col(0, &customers, "ID")),
    );
    (c, o)
}

fn row(customer: Option<(i32, &str)>, order: Option<(i32, i32, i32)>) -> Vec<Value> {
    let mut values = match customer {
        Some((id, name)) => vec![Value::Integer(id), Value::text(name)],
        None => vec![Value::Null, Value::Null],
    };
    match order {
        Some((id, c, amount)) => {
            values.extend([Value::Integer(id), Value::Integer(c), Value::Integer(amount)])
        }
        None => values.extend([Value::Null, Value::Null, Value::Null]),
    }
    values
}

fn join_alternative(range: &RangeVariable, index: Option<IndexRef>, e: Expression) -> AccessCondition {
    let mut path = range.new_condition(ConditionPhase::Join, index);
    path.add_condition(e);
    path
}

fn execute(catalog: &Arc<Catalog>, ranges: Vec<RangeVariable>) -> keeldb::ExecutionResult {
    let ranges: Vec<Arc<RangeVariable>> = ranges.into_iter().map(Arc::new).collect();
    let executor = QueryExecutor::new(Arc::clone(catalog), EngineConfig::default());
    executor.execute(&ranges).unwrap()
}

// =============================================================================
// Inner Join Tests
// =============================================================================

/// Unmatched rows on either side are dropped.
#[test]
fn test_inner_join() {
    let catalog = shop();
    let (c, o) = customer_orders(&catalog, false, false);
    let result = execute(&catalog, vec![c, o]);

    assert_eq!(
        result.rows,
        vec![
            row(Some((1, "ada")), Some((10, 1, 50))),
            row(Some((1, "ada")), Some((11, 1, 70))),
            row(Some((2, "bob")), Some((12, 2, 20))),
        ]
    );
    assert_eq!(result.right_outer_count, 0);
}

// =============================================================================
// Left Outer Join Tests
// =============================================================================

/// An outer row without a join match is emitted once with NULLs.
#[test]
fn test_left_join_pads_unmatched() {
    let catalog = shop();
    let (c, o) = customer_orders(&catalog, true, false);
    assert_eq!(o.join_kind(), JoinKind::Left);

    let ctx = context(&catalog);
    let ranges = vec![Arc::new(c), Arc::new(o)];
    let mut cursor = open_cursor(&ranges, &ctx).unwrap();
    let rows = drain(cursor.as_mut(), &ctx);

    assert_eq!(rows.len(), 4);
    assert_eq!(rows[3], row(Some((3, "cyd")), None));
    assert_eq!(ctx.metrics().snapshot().left_outer_padded, 1);
    assert_eq!(catalog.scan_tracker().open_scans(), 0);
}

/// A where condition on the inner range also applies to padded rows, and a
/// row that matched the join suppresses padding even when filtered out.
#[test]
fn test_left_join_where_filters_padding() {
    let catalog = shop();
    let orders = catalog.table_by_name("ORDERS").unwrap();
    let (c, mut o) = customer_orders(&catalog, true, false);
    o.add_condition(
        ConditionPhase::Where,
        Expression::gt(col(1, &orders, "AMOUNT"), Expression::literal(60)),
    );

    let result = execute(&catalog, vec![c, o]);
    assert_eq!(result.rows, vec![row(Some((1, "ada")), Some((11, 1, 70)))]);
}

/// `WHERE o.ID IS NULL` on a left join finds outer rows without matches.
#[test]
fn test_left_anti_join() {
    let catalog = shop();
    let orders = catalog.table_by_name("ORDERS").unwrap();
    let (c, mut o) = customer_orders(&catalog, true, false);
    o.add_condition(ConditionPhase::Where, Expression::is_null(col(1, &orders, "ID")));

    let result = execute(&catalog, vec![c, o]);
    assert_eq!(result.rows, vec![row(Some((3, "cyd")), None)]);
}

/// `CUSTOMERS c LEFT JOIN ORDERS o ON o.CUSTOMER = c.ID OR o.ID = c.ID`:
/// an outer row matched by neither alternative is padded once, after the
/// last one; a row matched only by the last alternative is not padded.
#[test]
fn test_left_join_pads_after_last_alternative() {
    let catalog = shop();
    let customers = catalog.table_by_name("CUSTOMERS").unwrap();
    let orders = catalog.table_by_name("ORDERS").unwrap();
    catalog
        .insert(customers.id(), vec![Value::Integer(13), Value::text("dee")])
        .unwrap();
    let primary = catalog.index(orders.primary_index().unwrap()).unwrap().reference();

    let c = RangeVariable::new(&catalog, Arc::clone(&customers), 0);
    let mut o = RangeVariable::new(&catalog, Arc::clone(&orders), 1);
    o.set_join_type(true, false);
    let alternatives = vec![
        join_alternative(
            &o,
            None,
            Expression::eq(col(1, &orders, "CUSTOMER"), col(0, &customers, "ID")),
        ),
        join_alternative(
            &o,
            Some(primary),
            Expression::eq(col(1, &orders, "ID"), col(0, &customers, "ID")),
        ),
    ];
    o.set_alternatives(ConditionPhase::Join, alternatives).unwrap();
    assert!(!o.is_where_driven());
    assert!(o.join_conditions()[1].has_index_condition());

    let ctx = context(&catalog);
    let ranges = vec![Arc::new(c), Arc::new(o)];
    let mut cursor = open_cursor(&ranges, &ctx).unwrap();
    let rows = drain(cursor.as_mut(), &ctx);

    assert_eq!(
        rows,
        vec![
            row(Some((1, "ada")), Some((10, 1, 50))),
            row(Some((1, "ada")), Some((11, 1, 70))),
            row(Some((2, "bob")), Some((12, 2, 20))),
            row(Some((3, "cyd")), None),
            row(Some((13, "dee")), Some((13, 9, 90))),
        ]
    );
    assert_eq!(ctx.metrics().snapshot().left_outer_padded, 1);
    assert_eq!(catalog.scan_tracker().open_scans(), 0);
}

// =============================================================================
// Right Outer Join Tests
// =============================================================================

/// Inner rows never matched are replayed with the outer range null-padded.
#[test]
fn test_right_join_second_pass() {
    let catalog = shop();
    let (c, o) = customer_orders(&catalog, false, true);
    let result = execute(&catalog, vec![c, o]);

    assert_eq!(
        result.rows,
        vec![
            row(Some((1, "ada")), Some((10, 1, 50))),
            row(Some((1, "ada")), Some((11, 1, 70))),
            row(Some((2, "bob")), Some((12, 2, 20))),
            row(None, Some((13, 9, 90))),
        ]
    );
    assert_eq!(result.right_outer_count, 1);
}

/// With no overlap at all, the second pass emits every inner row.
#[test]
fn test_right_join_without_overlap() {
    let catalog = shop();
    let customers = catalog.table_by_name("CUSTOMERS").unwrap();
    let (c, mut o) = customer_orders(&catalog, false, true);
    o.add_condition(
        ConditionPhase::Join,
        Expression::eq(col(0, &customers, "NAME"), Expression::literal("zed")),
    );

    let result = execute(&catalog, vec![c, o]);
    assert_eq!(result.len(), 4);
    assert_eq!(result.right_outer_count, 4);
    assert!(result.iter().all(|r| r[0].is_null() && r[1].is_null()));
}

/// Where conditions of the right range still filter the second pass.
#[test]
fn test_right_join_where_applies_to_outer_rows() {
    let catalog = shop();
    let orders = catalog.table_by_name("ORDERS").unwrap();
    let (c, mut o) = customer_orders(&catalog, false, true);
    o.add_condition(
        ConditionPhase::Where,
        Expression::lt(col(1, &orders, "AMOUNT"), Expression::literal(60)),
    );

    let result = execute(&catalog, vec![c, o]);
    assert_eq!(
        result.rows,
        vec![
            row(Some((1, "ada")), Some((10, 1, 50))),
            row(Some((2, "bob")), Some((12, 2, 20))),
        ]
    );
    assert_eq!(result.right_outer_count, 0);
}

/// The second pass is refused on a range that is not right joined.
#[test]
fn test_outer_rows_rejected_on_inner_range() {
    let catalog = shop();
    let (c, o) = customer_orders(&catalog, false, false);
    let ctx = context(&catalog);
    let mut cursor = open_cursor(&[Arc::new(c), Arc::new(o)], &ctx).unwrap();

    let err = cursor.set_on_outer_rows().unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::KeelCursorState);
}

// =============================================================================
// Full Outer Join Tests
// =============================================================================

/// Both sides' unmatched rows appear exactly once.
#[test]
fn test_full_join() {
    let catalog = shop();
    let (c, o) = customer_orders(&catalog, true, true);
    assert_eq!(o.join_kind(), JoinKind::Full);

    let ranges: Vec<Arc<RangeVariable>> = vec![Arc::new(c), Arc::new(o)];
    let executor = QueryExecutor::new(Arc::clone(&catalog), EngineConfig::default());
    let result = executor.execute(&ranges).unwrap();

    assert_eq!(
        result.rows,
        vec![
            row(Some((1, "ada")), Some((10, 1, 50))),
            row(Some((1, "ada")), Some((11, 1, 70))),
            row(Some((2, "bob")), Some((12, 2, 20))),
            row(Some((3, "cyd")), None),
            row(None, Some((13, 9, 90))),
        ]
    );
    assert_eq!(result.right_outer_count, 1);

    let metrics = executor.metrics().snapshot();
    assert_eq!(metrics.left_outer_padded, 1);
    assert_eq!(metrics.right_outer_rows, 1);
    assert_eq!(metrics.rows_emitted as usize, result.len() + 3);
    assert_eq!(catalog.scan_tracker().open_scans(), 0);
}
