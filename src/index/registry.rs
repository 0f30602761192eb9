//! Index registry and positioned index scans

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::storage::{PositionSource, RowPos, RowScan, ScanTracker, StorageResult, Table, TableId};
use crate::types::Value;

use super::btree::{IndexKey, IndexTree, KeyScan};
use super::comparator::Comparator;
use super::errors::{IndexError, IndexResult};

/// Identifier of an index within a catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexId(pub u32);

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Non-owning reference to an index, as held by compiled access paths.
///
/// Resolved against the registry when a cursor opens its scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRef {
    pub id: IndexId,
    pub name: String,
    /// Table column positions, in index order
    pub columns: Vec<usize>,
}

impl IndexRef {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Position of `column` within the index, if indexed
    pub fn position_of(&self, column: usize) -> Option<usize> {
        self.columns.iter().position(|&c| c == column)
    }
}

/// A composite index over one table
#[derive(Debug)]
pub struct Index {
    id: IndexId,
    name: String,
    table: TableId,
    columns: Vec<usize>,
    tree: RwLock<IndexTree>,
}

impl Index {
    pub(crate) fn new(id: IndexId, name: impl Into<String>, table: TableId, columns: Vec<usize>) -> Self {
        Self {
            id,
            name: name.into(),
            table,
            columns,
            tree: RwLock::new(IndexTree::new()),
        }
    }

    pub fn id(&self) -> IndexId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> TableId {
        self.table
    }

    /// Indexed table column positions
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Reference for compiled access paths
    pub fn reference(&self) -> IndexRef {
        IndexRef {
            id: self.id,
            name: self.name.clone(),
            columns: self.columns.clone(),
        }
    }

    /// Adds a row to the index
    pub(crate) fn insert_row(&self, row: &[Value], pos: RowPos) {
        let key = IndexKey::from_row(row, &self.columns);
        self.write_tree().insert(key, pos);
    }

    /// Removes a row from the index
    pub(crate) fn remove_row(&self, row: &[Value], pos: RowPos) {
        let key = IndexKey::from_row(row, &self.columns);
        self.write_tree().remove(&key, pos);
    }

    /// Full scan in key order
    pub fn open_forward(
        self: &Arc<Self>,
        table: &Arc<Table>,
        tracker: &Arc<ScanTracker>,
    ) -> StorageResult<RowScan> {
        self.open_walk(table, tracker, KeyScan::unbounded(false))
    }

    /// Full scan in reverse key order
    pub fn open_reversed(
        self: &Arc<Self>,
        table: &Arc<Table>,
        tracker: &Arc<ScanTracker>,
    ) -> StorageResult<RowScan> {
        self.open_walk(table, tracker, KeyScan::unbounded(true))
    }

    /// Scan positioned by `bound[..prefix_len]` under `comparator`
    #[allow(clippy::too_many_arguments)]
    pub fn open_from(
        self: &Arc<Self>,
        table: &Arc<Table>,
        tracker: &Arc<ScanTracker>,
        bound: &[Value],
        prefix_len: usize,
        distinct_len: usize,
        comparator: Comparator,
        reversed: bool,
    ) -> StorageResult<RowScan> {
        let keys = KeyScan::new(bound, prefix_len, distinct_len, comparator, reversed);
        self.open_walk(table, tracker, keys)
    }

    fn open_walk(
        self: &Arc<Self>,
        table: &Arc<Table>,
        tracker: &Arc<ScanTracker>,
        keys: KeyScan,
    ) -> StorageResult<RowScan> {
        let lease = tracker.acquire()?;
        let source = IndexScan {
            index: Arc::clone(self),
            keys,
        };
        Ok(RowScan::streaming(Arc::clone(table), Box::new(source), lease))
    }

    /// A scan that yields nothing and holds no storage handle
    pub fn empty_scan(&self) -> RowScan {
        RowScan::empty()
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        self.read_tree().key_count()
    }

    fn read_tree(&self) -> std::sync::RwLockReadGuard<'_, IndexTree> {
        self.tree.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_tree(&self) -> std::sync::RwLockWriteGuard<'_, IndexTree> {
        self.tree.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Positions of an open index scan, read under a short tree lock per key
#[derive(Debug)]
struct IndexScan {
    index: Arc<Index>,
    keys: KeyScan,
}

impl PositionSource for IndexScan {
    fn next_position(&mut self) -> Option<RowPos> {
        self.index.read_tree().advance(&mut self.keys)
    }
}

/// Registry of all indexes in a catalog
#[derive(Debug, Default)]
pub struct IndexRegistry {
    indexes: RwLock<BTreeMap<IndexId, Arc<Index>>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, index: Arc<Index>) {
        self.write_map().insert(index.id(), index);
    }

    /// Looks up an index
    pub fn get(&self, id: IndexId) -> IndexResult<Arc<Index>> {
        self.read_map()
            .get(&id)
            .cloned()
            .ok_or_else(|| IndexError::unknown_index(id))
    }

    /// Returns true if the index is registered
    pub fn contains(&self, id: IndexId) -> bool {
        self.read_map().contains_key(&id)
    }

    /// Removes an index. Scans already open keep their positions.
    pub fn remove(&self, id: IndexId) -> IndexResult<Arc<Index>> {
        self.write_map()
            .remove(&id)
            .ok_or_else(|| IndexError::unknown_index(id))
    }

    /// All indexes over `table`, in id order
    pub fn for_table(&self, table: TableId) -> Vec<Arc<Index>> {
        self.read_map()
            .values()
            .filter(|i| i.table() == table)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_map(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<IndexId, Arc<Index>>> {
        self.indexes.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_map(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<IndexId, Arc<Index>>> {
        self.indexes.write().unwrap_or_else(|e| e.into_inner())
    }
}
