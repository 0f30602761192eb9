//! Executor error types
//!
//! Error codes:
//! - KEEL_EVALUATION_FAILED (ERROR) - predicate or bound evaluation failed
//! - KEEL_INDEX_MISSING (FATAL) - a compiled path references a dropped index
//! - KEEL_STORAGE_FAILED (ERROR) - scan open refused by storage
//! - KEEL_CURSOR_STATE (FATAL) - cursor protocol misuse

use std::fmt;

use crate::errors::Severity;
use crate::expression::EvalError;
use crate::index::IndexId;
use crate::storage::StorageError;

/// Executor-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorErrorCode {
    /// Expression evaluator reported an error
    KeelEvaluationFailed,
    /// Index removed while a cursor still references it
    KeelIndexMissing,
    /// Storage refused a scan
    KeelStorageFailed,
    /// Cursor driven outside its protocol
    KeelCursorState,
}

impl ExecutorErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorErrorCode::KeelEvaluationFailed => "KEEL_EVALUATION_FAILED",
            ExecutorErrorCode::KeelIndexMissing => "KEEL_INDEX_MISSING",
            ExecutorErrorCode::KeelStorageFailed => "KEEL_STORAGE_FAILED",
            ExecutorErrorCode::KeelCursorState => "KEEL_CURSOR_STATE",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            ExecutorErrorCode::KeelIndexMissing | ExecutorErrorCode::KeelCursorState => {
                Severity::Fatal
            }
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ExecutorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug)]
enum Cause {
    Eval(EvalError),
    Storage(StorageError),
}

/// Executor error type with full context
#[derive(Debug)]
pub struct ExecutorError {
    code: ExecutorErrorCode,
    message: String,
    /// Range position the failing cursor serves
    range: Option<usize>,
    cause: Option<Cause>,
}

impl ExecutorError {
    /// Evaluation failure; the evaluator error is kept verbatim as the source
    pub fn evaluation_failed(range: usize, source: EvalError) -> Self {
        Self {
            code: ExecutorErrorCode::KeelEvaluationFailed,
            message: source.to_string(),
            range: Some(range),
            cause: Some(Cause::Eval(source)),
        }
    }

    /// Referenced index no longer registered (FATAL)
    pub fn index_missing(range: usize, index: IndexId) -> Self {
        Self {
            code: ExecutorErrorCode::KeelIndexMissing,
            message: format!("Index {} referenced by range {} was dropped", index, range),
            range: Some(range),
            cause: None,
        }
    }

    /// Scan open refused by storage
    pub fn storage_failed(range: usize, source: StorageError) -> Self {
        Self {
            code: ExecutorErrorCode::KeelStorageFailed,
            message: source.message().to_string(),
            range: Some(range),
            cause: Some(Cause::Storage(source)),
        }
    }

    /// Cursor protocol misuse (FATAL)
    pub fn cursor_state(reason: impl Into<String>) -> Self {
        Self {
            code: ExecutorErrorCode::KeelCursorState,
            message: reason.into(),
            range: None,
            cause: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> ExecutorErrorCode {
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

    /// Range position of the failing cursor, if known
    pub fn range(&self) -> Option<usize> {
        self.range
    }

    /// The evaluator error behind a `KEEL_EVALUATION_FAILED`
    pub fn eval_error(&self) -> Option<&EvalError> {
        match &self.cause {
            Some(Cause::Eval(e)) => Some(e),
            _ => None,
        }
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for ExecutorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            Some(Cause::Eval(e)) => Some(e),
            Some(Cause::Storage(e)) => Some(e),
            None => None,
        }
    }
}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;
