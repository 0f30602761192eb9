//! Index error types
//!
//! Error codes:
//! - KEEL_UNKNOWN_INDEX (ERROR)
//! - KEEL_INDEX_COLUMN (ERROR)

use std::fmt;

use crate::errors::Severity;

/// Index-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorCode {
    /// Index id not present in the registry
    KeelUnknownIndex,
    /// Index declared over a column the table does not have
    KeelIndexColumn,
}

impl IndexErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            IndexErrorCode::KeelUnknownIndex => "KEEL_UNKNOWN_INDEX",
            IndexErrorCode::KeelIndexColumn => "KEEL_INDEX_COLUMN",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for IndexErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Index error type with full context
#[derive(Debug, Clone)]
pub struct IndexError {
    code: IndexErrorCode,
    message: String,
}

impl IndexError {
    /// Index not registered
    pub fn unknown_index(id: impl fmt::Display) -> Self {
        Self {
            code: IndexErrorCode::KeelUnknownIndex,
            message: format!("Index {} not found", id),
        }
    }

    /// Column position outside the table
    pub fn bad_column(index: &str, column: usize, column_count: usize) -> Self {
        Self {
            code: IndexErrorCode::KeelIndexColumn,
            message: format!(
                "Index '{}' references column {} but the table has {} columns",
                index, column, column_count
            ),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> IndexErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for IndexError {}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;
