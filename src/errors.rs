//! Crate-level error types
//!
//! Each subsystem owns a coded error type. `KeelError` unifies them for
//! callers that drive several subsystems at once.

use std::fmt;

use crate::config::ConfigError;
use crate::executor::ExecutorError;
use crate::index::IndexError;
use crate::planner::PlannerError;
use crate::storage::StorageError;

/// Severity levels shared by all coded errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation failed but the engine is healthy
    Error,
    /// Engine invariant broken; indicates a planner or engine bug
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Unified keeldb error
#[derive(Debug, thiserror::Error)]
pub enum KeelError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Planner(#[from] PlannerError),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl KeelError {
    /// Returns true if the error indicates a broken engine invariant
    pub fn is_fatal(&self) -> bool {
        match self {
            KeelError::Storage(e) => e.severity() == Severity::Fatal,
            KeelError::Index(e) => e.severity() == Severity::Fatal,
            KeelError::Planner(e) => e.severity() == Severity::Fatal,
            KeelError::Executor(e) => e.severity() == Severity::Fatal,
            KeelError::Config(_) => false,
        }
    }
}

/// Result type spanning subsystems
pub type KeelResult<T> = Result<T, KeelError>;
