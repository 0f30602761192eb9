//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use keeldb::expression::Expression;
use keeldb::executor::{ExecutionContext, RowCursor};
use keeldb::storage::{ColumnDef, Table};
use keeldb::{Catalog, DataType, EngineConfig, Value};

/// Catalog with `ORDERS(ID, CUSTOMER, AMOUNT)` keyed on ID and
/// `CUSTOMERS(ID, NAME)` keyed on ID
pub fn shop() -> Arc<Catalog> {
    let catalog = Arc::new(Catalog::new());
    let customers = catalog
        .create_table_with_key(
            "CUSTOMERS",
            vec![
                ColumnDef::new("ID", DataType::Integer),
                ColumnDef::new("NAME", DataType::Text),
            ],
            vec![0],
        )
        .unwrap();
    let orders = catalog
        .create_table_with_key(
            "ORDERS",
            vec![
                ColumnDef::new("ID", DataType::Integer),
                ColumnDef::new("CUSTOMER", DataType::Integer),
                ColumnDef::new("AMOUNT", DataType::Integer),
            ],
            vec![0],
        )
        .unwrap();

    catalog
        .insert_all(
            customers.id(),
            vec![
                vec![Value::Integer(1), Value::text("ada")],
                vec![Value::Integer(2), Value::text("bob")],
                vec![Value::Integer(3), Value::text("cyd")],
            ],
        )
        .unwrap();
    catalog
        .insert_all(
            orders.id(),
            vec![
                vec![Value::Integer(10), Value::Integer(1), Value::Integer(50)],
                vec![Value::Integer(11), Value::Integer(1), Value::Integer(70)],
                vec![Value::Integer(12), Value::Integer(2), Value::Integer(20)],
                vec![Value::Integer(13), Value::Integer(9), Value::Integer(90)],
            ],
        )
        .unwrap();
    catalog
}

/// Table `T(A, B)` with no primary key, rows inserted in the given order
pub fn pairs(catalog: &Catalog, rows: &[(i32, i32)]) -> Arc<Table> {
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
            rows.iter().map(|&(a, b)| vec![Value::Integer(a), Value::Integer(b)]),
        )
        .unwrap();
    table
}

/// Column reference into `table` at join position `range`
pub fn col(range: usize, table: &Table, name: &str) -> Expression {
    let column = table.find_column(name).unwrap();
    let data_type = table.columns()[column].data_type;
    Expression::column(range, column, format!("{}.{}", table.name(), name), data_type)
}

pub fn int(v: i32) -> Expression {
    Expression::literal(v)
}

pub fn context(catalog: &Arc<Catalog>) -> ExecutionContext {
    ExecutionContext::new(Arc::clone(catalog), EngineConfig::default())
}

/// Drains `cursor`, collecting composed rows
pub fn drain(cursor: &mut dyn RowCursor, ctx: &ExecutionContext) -> Vec<Vec<Value>> {
    let mut rows = Vec::new();
    while cursor.next(ctx).unwrap() {
        rows.push(cursor.current());
    }
    rows
}

pub fn ints(values: &[i32]) -> Vec<Value> {
    values.iter().map(|&v| Value::Integer(v)).collect()
}
