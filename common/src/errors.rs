// Error handling framework
// Per-payload failures, run-level cancellation and configuration validation

use thiserror::Error;

/// Failure of a single payload execution.
///
/// These never escape the execution runner: they are logged and folded into
/// the run's aggregate status.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Database connection failed: {0}")]
    DatabaseConnectionFailed(String),

    #[error("Database query failed: {0}")]
    DatabaseQueryFailed(String),

    #[error("Failed to read SQL script '{path}': {reason}")]
    ScriptReadFailed { path: String, reason: String },

    #[error("CSV write failed: {0}")]
    CsvWriteFailed(String),

    #[error("Backend not available in this build: {0}")]
    BackendUnavailable(String),
}

/// Coarse grouping of execution failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Connection,
    Execution,
    Io,
}

impl ExecutionError {
    pub fn category(&self) -> FailureCategory {
        match self {
            ExecutionError::DatabaseConnectionFailed(_) | ExecutionError::BackendUnavailable(_) => {
                FailureCategory::Connection
            }
            ExecutionError::DatabaseQueryFailed(_) => FailureCategory::Execution,
            ExecutionError::ScriptReadFailed { .. } | ExecutionError::CsvWriteFailed(_) => {
                FailureCategory::Io
            }
        }
    }
}

/// Errors that abort a whole task run
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TaskError {
    #[error("Task run cancelled")]
    Cancelled,
}

/// Validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Unknown database type: {0}")]
    UnknownDbKind(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field value for {field}: {reason}")]
    InvalidFieldValue { field: String, reason: String },
}

impl From<sqlx::Error> for ExecutionError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(_)
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut => ExecutionError::DatabaseConnectionFailed(err.to_string()),
            _ => ExecutionError::DatabaseQueryFailed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_read_error_display() {
        let err = ExecutionError::ScriptReadFailed {
            path: "/data/report.sql".to_string(),
            reason: "No such file or directory".to_string(),
        };
        assert!(err.to_string().contains("/data/report.sql"));
        assert_eq!(err.category(), FailureCategory::Io);
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            ExecutionError::DatabaseConnectionFailed("refused".into()).category(),
            FailureCategory::Connection
        );
        assert_eq!(
            ExecutionError::DatabaseQueryFailed("syntax error".into()).category(),
            FailureCategory::Execution
        );
        assert_eq!(
            ExecutionError::CsvWriteFailed("disk full".into()).category(),
            FailureCategory::Io
        );
    }

    #[test]
    fn test_sqlx_configuration_error_is_connection_failure() {
        let err: ExecutionError =
            sqlx::Error::Configuration("bad url".to_string().into()).into();
        assert!(matches!(err, ExecutionError::DatabaseConnectionFailed(_)));
    }

    #[test]
    fn test_cancelled_display() {
        assert_eq!(TaskError::Cancelled.to_string(), "Task run cancelled");
    }
}
