//! Schema-owned registry of relations and indexes
//!
//! The catalog owns every `Table` and `Index`. Compiled access paths hold
//! `Arc<Table>` for their relation and an `IndexRef` for their index, which
//! is resolved through [`Catalog::index`] when a scan opens.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use crate::config::EngineConfig;
use crate::errors::KeelResult;
use crate::index::{Index, IndexError, IndexId, IndexRef, IndexRegistry, IndexResult};
use crate::observability::{log_event, Event, Severity};
use crate::storage::{ColumnDef, DerivedSource, RowId, ScanTracker, StorageError, StorageResult, Table, TableId};
use crate::types::Value;

pub const DEFAULT_SCHEMA: &str = "PUBLIC";

#[derive(Debug, Default)]
struct TableMap {
    by_id: BTreeMap<TableId, Arc<Table>>,
    by_name: HashMap<String, TableId>,
}

/// Registry of tables and indexes with a shared scan tracker
#[derive(Debug)]
pub struct Catalog {
    tables: RwLock<TableMap>,
    indexes: IndexRegistry,
    scans: Arc<ScanTracker>,
    next_table: AtomicU32,
    next_index: AtomicU32,
    log_threshold: Severity,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::with_config(&EngineConfig::default())
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog whose scan tracker enforces `config.max_open_scans`
    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            tables: RwLock::new(TableMap::default()),
            indexes: IndexRegistry::new(),
            scans: Arc::new(ScanTracker::new(config.max_open_scans)),
            next_table: AtomicU32::new(1),
            next_index: AtomicU32::new(1),
            log_threshold: config.log_threshold(),
        }
    }

    /// Creates a base table without a primary key
    pub fn create_table(&self, name: &str, columns: Vec<ColumnDef>) -> Arc<Table> {
        let id = self.allocate_table_id();
        self.register_table(Table::new(id, DEFAULT_SCHEMA, name, columns, None, None))
    }

    /// Creates a base table whose primary index covers `key_columns`
    pub fn create_table_with_key(
        &self,
        name: &str,
        columns: Vec<ColumnDef>,
        key_columns: Vec<usize>,
    ) -> IndexResult<Arc<Table>> {
        let index_name = format!("SYS_PK_{}", name);
        check_columns(&index_name, &key_columns, columns.len())?;

        let id = self.allocate_table_id();
        let index_id = self.allocate_index_id();
        let table = self.register_table(Table::new(
            id,
            DEFAULT_SCHEMA,
            name,
            columns,
            Some(index_id),
            None,
        ));
        self.indexes
            .register(Arc::new(Index::new(index_id, index_name, id, key_columns)));
        Ok(table)
    }

    /// Creates a derived relation backed by `source`
    pub fn create_derived_table(
        &self,
        name: &str,
        columns: Vec<ColumnDef>,
        source: Arc<dyn DerivedSource>,
    ) -> Arc<Table> {
        let id = self.allocate_table_id();
        self.register_table(Table::new(id, DEFAULT_SCHEMA, name, columns, None, Some(source)))
    }

    /// Creates a secondary index and fills it from the table's current rows
    pub fn create_index(&self, table: TableId, name: &str, columns: Vec<usize>) -> KeelResult<IndexRef> {
        let relation = self.table(table)?;
        check_columns(name, &columns, relation.column_count())?;

        let index = Arc::new(Index::new(self.allocate_index_id(), name, table, columns));
        for pos in relation.positions(false) {
            if let Some(row) = relation.row(pos) {
                index.insert_row(row.data(), pos);
            }
        }
        let reference = index.reference();
        self.indexes.register(index);
        Ok(reference)
    }

    /// Removes an index. Access paths still holding its reference fail when
    /// they next open a scan unless invalidated first.
    pub fn drop_index(&self, id: IndexId) -> IndexResult<()> {
        let index = self.indexes.remove(id)?;
        log_event(
            self.log_threshold,
            Event::IndexDropped,
            &[("index", index.name())],
        );
        Ok(())
    }

    /// Appends a row and maintains every index over the table
    pub fn insert(&self, table: TableId, values: Vec<Value>) -> StorageResult<RowId> {
        let relation = self.table(table)?;
        let row = relation.insert(values)?;
        for index in self.indexes.for_table(table) {
            index.insert_row(row.data(), row.pos());
        }
        Ok(row.id())
    }

    /// Appends several rows
    pub fn insert_all<I>(&self, table: TableId, rows: I) -> StorageResult<Vec<RowId>>
    where
        I: IntoIterator<Item = Vec<Value>>,
    {
        rows.into_iter().map(|values| self.insert(table, values)).collect()
    }

    pub fn table(&self, id: TableId) -> StorageResult<Arc<Table>> {
        self.read_tables()
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::unknown_table(format!("{}", id.0)))
    }

    /// Looks up a table by name; the most recently created table wins
    pub fn table_by_name(&self, name: &str) -> StorageResult<Arc<Table>> {
        let tables = self.read_tables();
        tables
            .by_name
            .get(name)
            .and_then(|id| tables.by_id.get(id))
            .cloned()
            .ok_or_else(|| StorageError::unknown_table(name))
    }

    pub fn index(&self, id: IndexId) -> IndexResult<Arc<Index>> {
        self.indexes.get(id)
    }

    pub fn indexes(&self) -> &IndexRegistry {
        &self.indexes
    }

    /// Tracker shared by every scan over this catalog
    pub fn scan_tracker(&self) -> &Arc<ScanTracker> {
        &self.scans
    }

    fn register_table(&self, table: Table) -> Arc<Table> {
        let table = Arc::new(table);
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        tables.by_name.insert(table.name().to_string(), table.id());
        tables.by_id.insert(table.id(), Arc::clone(&table));
        table
    }

    fn read_tables(&self) -> std::sync::RwLockReadGuard<'_, TableMap> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn allocate_table_id(&self) -> TableId {
        TableId(self.next_table.fetch_add(1, Ordering::Relaxed))
    }

    fn allocate_index_id(&self) -> IndexId {
        IndexId(self.next_index.fetch_add(1, Ordering::Relaxed))
    }
}

fn check_columns(index: &str, columns: &[usize], column_count: usize) -> IndexResult<()> {
    match columns.iter().find(|&&c| c >= column_count) {
        Some(&bad) => Err(IndexError::bad_column(index, bad, column_count)),
        None => Ok(()),
    }
}
