//! Relations and their in-memory row store

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::expression::{EvalContext, EvalResult};
use crate::index::IndexId;
use crate::types::{DataType, Value};

use super::errors::{StorageError, StorageResult};
use super::row::{Row, RowId, RowPos};
use super::scan::{RowScan, ScanTracker};

/// Identifier of a relation within a catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

/// Column metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Producer of rows for a derived relation (view or subquery)
pub trait DerivedSource: fmt::Debug + Send + Sync {
    /// A correlated source depends on outer rows and is re-materialized
    /// before every scan
    fn is_correlated(&self) -> bool;

    /// Computes the relation's rows against the current execution context
    fn materialize(&self, ctx: &dyn EvalContext) -> EvalResult<Vec<Vec<Value>>>;
}

#[derive(Debug, Default)]
struct RowStore {
    rows: BTreeMap<RowPos, Row>,
    next_pos: RowPos,
}

/// A relation: base table, derived table or parameter list.
///
/// Owned by the catalog and shared with every range that reads it.
#[derive(Debug)]
pub struct Table {
    id: TableId,
    schema: String,
    name: String,
    columns: Vec<ColumnDef>,
    primary_index: Option<IndexId>,
    empty_row: Arc<[Value]>,
    store: RwLock<RowStore>,
    derived: Option<Arc<dyn DerivedSource>>,
}

impl Table {
    pub(crate) fn new(
        id: TableId,
        schema: impl Into<String>,
        name: impl Into<String>,
        columns: Vec<ColumnDef>,
        primary_index: Option<IndexId>,
        derived: Option<Arc<dyn DerivedSource>>,
    ) -> Self {
        let empty_row: Arc<[Value]> = vec![Value::Null; columns.len()].into();
        Self {
            id,
            schema: schema.into(),
            name: name.into(),
            columns,
            primary_index,
            empty_row,
            store: RwLock::new(RowStore::default()),
            derived,
        }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, i: usize) -> Option<&ColumnDef> {
        self.columns.get(i)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Index of the named column
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Index ordering rows by primary key, if the relation has one
    pub fn primary_index(&self) -> Option<IndexId> {
        self.primary_index
    }

    /// A relation-shaped tuple of NULLs, used for outer-join padding
    pub fn empty_row_tuple(&self) -> Arc<[Value]> {
        Arc::clone(&self.empty_row)
    }

    /// Returns true if the relation is recomputed per outer row
    pub fn is_correlated(&self) -> bool {
        self.derived.as_ref().is_some_and(|d| d.is_correlated())
    }

    /// Number of stored rows
    pub fn row_count(&self) -> usize {
        self.read_store().rows.len()
    }

    /// Fetches the row at `pos`
    pub fn row(&self, pos: RowPos) -> Option<Row> {
        self.read_store().rows.get(&pos).cloned()
    }

    /// All row positions in storage order
    pub fn positions(&self, reversed: bool) -> Vec<RowPos> {
        let store = self.read_store();
        if reversed {
            store.rows.keys().rev().copied().collect()
        } else {
            store.rows.keys().copied().collect()
        }
    }

    /// Opens a scan over every row in storage order
    pub fn open_scan(self: &Arc<Self>, tracker: &Arc<ScanTracker>, reversed: bool) -> StorageResult<RowScan> {
        let lease = tracker.acquire()?;
        Ok(RowScan::new(Arc::clone(self), self.positions(reversed), lease))
    }

    /// Appends a row, returning the stored row
    pub(crate) fn insert(&self, values: Vec<Value>) -> StorageResult<Row> {
        if values.len() != self.columns.len() {
            return Err(StorageError::row_shape(&self.name, self.columns.len(), values.len()));
        }
        let mut store = self.write_store();
        let pos = store.next_pos;
        store.next_pos += 1;
        let row = Row::new(RowId::new(self.id.0, pos), values.into());
        store.rows.insert(pos, row.clone());
        Ok(row)
    }

    /// Recomputes a derived relation's rows.
    ///
    /// Returns false without touching the store for base tables.
    /// Positions keep increasing so identifiers are never reused.
    pub fn materialize(&self, ctx: &dyn EvalContext) -> EvalResult<bool> {
        let Some(source) = &self.derived else {
            return Ok(false);
        };
        let rows = source.materialize(ctx)?;

        let mut store = self.write_store();
        store.rows.clear();
        for values in rows {
            let pos = store.next_pos;
            store.next_pos += 1;
            let mut values = values;
            values.resize(self.columns.len(), Value::Null);
            store.rows.insert(pos, Row::new(RowId::new(self.id.0, pos), values.into()));
        }
        Ok(true)
    }

    fn read_store(&self) -> std::sync::RwLockReadGuard<'_, RowStore> {
        self.store.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_store(&self) -> std::sync::RwLockWriteGuard<'_, RowStore> {
        self.store.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_table() -> Table {
        Table::new(
            TableId(3),
            "PUBLIC",
            "T",
            vec![
                ColumnDef::new("A", DataType::Integer),
                ColumnDef::new("B", DataType::Text),
            ],
            None,
            None,
        )
    }

    #[test]
    fn test_insert_assigns_positions() {
        let table = make_table();
        let r0 = table.insert(vec![Value::Integer(1), Value::text("x")]).unwrap();
        let r1 = table.insert(vec![Value::Integer(2), Value::Null]).unwrap();

        assert_eq!(r0.pos(), 0);
        assert_eq!(r1.pos(), 1);
        assert_eq!(r1.id().table_id(), 3);
        assert_eq!(table.positions(false), vec![0, 1]);
        assert_eq!(table.positions(true), vec![1, 0]);
    }

    #[test]
    fn test_insert_rejects_wrong_width() {
        let table = make_table();
        assert!(table.insert(vec![Value::Integer(1)]).is_err());
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_empty_row_tuple() {
        let table = make_table();
        let empty = table.empty_row_tuple();
        assert_eq!(empty.len(), 2);
        assert!(empty.iter().all(Value::is_null));
    }

    #[test]
    fn test_open_scan_counts_lease() {
        let table = Arc::new(make_table());
        table.insert(vec![Value::Integer(1), Value::Null]).unwrap();
        let tracker = Arc::new(ScanTracker::new(1));

        let mut scan = table.open_scan(&tracker, true).unwrap();
        assert!(table.open_scan(&tracker, false).is_err());
        assert!(scan.next_row().is_some());
        assert!(scan.release());
        assert_eq!(tracker.open_scans(), 0);
    }

    #[test]
    fn test_find_column() {
        let table = make_table();
        assert_eq!(table.find_column("B"), Some(1));
        assert_eq!(table.find_column("C"), None);
    }
}
