//! Storage error types
//!
//! Error codes:
//! - KEEL_SCAN_LIMIT (ERROR) - open scan ceiling reached
//! - KEEL_ROW_SHAPE (ERROR) - row width does not match the relation
//! - KEEL_UNKNOWN_TABLE (ERROR)

use std::fmt;

use crate::errors::Severity;

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// No scan handle available
    KeelScanLimit,
    /// Row width mismatch
    KeelRowShape,
    /// Table id not registered
    KeelUnknownTable,
}

impl StorageErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::KeelScanLimit => "KEEL_SCAN_LIMIT",
            StorageErrorCode::KeelRowShape => "KEEL_ROW_SHAPE",
            StorageErrorCode::KeelUnknownTable => "KEEL_UNKNOWN_TABLE",
        }
    }

    /// All storage errors leave the engine healthy
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with context
#[derive(Debug, Clone)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
}

impl StorageError {
    /// Scan open refused because `limit` scans are already open
    pub fn scan_limit(limit: usize) -> Self {
        Self {
            code: StorageErrorCode::KeelScanLimit,
            message: format!("Open scan limit of {} reached", limit),
        }
    }

    /// Row has the wrong number of values
    pub fn row_shape(table: &str, expected: usize, actual: usize) -> Self {
        Self {
            code: StorageErrorCode::KeelRowShape,
            message: format!(
                "Table '{}' expects {} values, row has {}",
                table, expected, actual
            ),
        }
    }

    /// Unknown table
    pub fn unknown_table(name: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::KeelUnknownTable,
            message: format!("Table '{}' not found", name.into()),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> StorageErrorCode {
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

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for StorageError {}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
