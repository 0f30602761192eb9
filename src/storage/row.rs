//! Rows and row identifiers

use std::fmt;
use std::sync::Arc;

use crate::types::Value;

/// Position of a row inside its relation's store
pub type RowPos = u32;

/// Identifier of a row, unique across the relations of one catalog.
///
/// The table id occupies the high 32 bits and the row position the low 32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(u64);

impl RowId {
    /// Builds the identifier of row `pos` in table `table_id`
    pub fn new(table_id: u32, pos: RowPos) -> Self {
        RowId(((table_id as u64) << 32) | pos as u64)
    }

    /// Raw 64-bit value
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Table part of the identifier
    pub fn table_id(&self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Position part of the identifier
    pub fn pos(&self) -> RowPos {
        self.0 as u32
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table_id(), self.pos())
    }
}

/// A stored row. Cloning shares the value tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    id: RowId,
    data: Arc<[Value]>,
}

impl Row {
    pub(crate) fn new(id: RowId, data: Arc<[Value]>) -> Self {
        Self { id, data }
    }

    /// Row identifier
    pub fn id(&self) -> RowId {
        self.id
    }

    /// Row position within its relation
    pub fn pos(&self) -> RowPos {
        self.id.pos()
    }

    /// Column values
    pub fn data(&self) -> &Arc<[Value]> {
        &self.data
    }
}
