//! Planner error types
//!
//! Error codes:
//! - KEEL_PLAN_INVALID_ACCESS_PATH (FATAL)
//! - KEEL_PLAN_COLUMN_ALIAS (ERROR)
//! - KEEL_PLAN_DUPLICATE_COLUMN (ERROR)

use std::fmt;

use crate::errors::Severity;

/// Planner-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerErrorCode {
    /// Access path cannot be built as requested; indicates a planner bug
    KeelPlanInvalidAccessPath,
    /// Column alias list does not match the relation
    KeelPlanColumnAlias,
    /// Relation exposes the same column name twice
    KeelPlanDuplicateColumn,
}

impl PlannerErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::KeelPlanInvalidAccessPath => "KEEL_PLAN_INVALID_ACCESS_PATH",
            PlannerErrorCode::KeelPlanColumnAlias => "KEEL_PLAN_COLUMN_ALIAS",
            PlannerErrorCode::KeelPlanDuplicateColumn => "KEEL_PLAN_DUPLICATE_COLUMN",
        }
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        match self {
            PlannerErrorCode::KeelPlanInvalidAccessPath => Severity::Fatal,
            PlannerErrorCode::KeelPlanColumnAlias | PlannerErrorCode::KeelPlanDuplicateColumn => {
                Severity::Error
            }
        }
    }
}

impl fmt::Display for PlannerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Planner error with context
#[derive(Debug, Clone)]
pub struct PlannerError {
    code: PlannerErrorCode,
    message: String,
}

impl PlannerError {
    /// Malformed access path
    pub fn invalid_access_path(reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::KeelPlanInvalidAccessPath,
            message: reason.into(),
        }
    }

    /// Alias count differs from column count
    pub fn column_alias(table: &str, aliases: usize, columns: usize) -> Self {
        Self {
            code: PlannerErrorCode::KeelPlanColumnAlias,
            message: format!(
                "Table '{}' has {} columns but {} aliases were given",
                table, columns, aliases
            ),
        }
    }

    /// Duplicate column name
    pub fn duplicate_column(name: &str) -> Self {
        Self {
            code: PlannerErrorCode::KeelPlanDuplicateColumn,
            message: format!("Column '{}' appears more than once", name),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> PlannerErrorCode {
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

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for PlannerError {}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
