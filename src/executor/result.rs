//! Result types for query execution

use serde::Serialize;
use uuid::Uuid;

use crate::types::Value;

/// Rows produced by one execution, in emission order
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Execution the rows belong to
    pub execution_id: Uuid,
    /// Composed rows, one value per column of every range
    pub rows: Vec<Vec<Value>>,
    /// Rows emitted by right-outer second passes, included in `rows`
    pub right_outer_count: usize,
}

impl ExecutionResult {
    pub fn new(execution_id: Uuid, rows: Vec<Vec<Value>>, right_outer_count: usize) -> Self {
        Self {
            execution_id,
            rows,
            right_outer_count,
        }
    }

    /// Returns true if no rows were produced
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns an iterator over the rows
    pub fn iter(&self) -> impl Iterator<Item = &Vec<Value>> {
        self.rows.iter()
    }
}
