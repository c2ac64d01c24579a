//! Structured error types for API responses.

use serde::Serialize;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    InvalidDate,
    InvalidField,

    // Lookup errors
    NotFound,

    // Conflict errors
    DuplicateName,

    // Access
    Unauthorized,

    // Transient and internal errors
    StoreContention,
    InternalError,
}

impl ErrorCode {
    /// HTTP status the dashboard API answers with for this code.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCode::InvalidDate | ErrorCode::InvalidField => 400,
            ErrorCode::Unauthorized => 401,
            ErrorCode::NotFound => 404,
            ErrorCode::DuplicateName => 409,
            ErrorCode::StoreContention => 503,
            ErrorCode::InternalError => 500,
        }
    }
}

/// Failure of a single tracker operation. Never fatal to the process.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Template name already exists: {0}")]
    DuplicateName(String),

    #[error("Invalid date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Admin access denied")]
    Unauthorized,

    #[error("Store is busy, try again: {0}")]
    StoreContention(String),

    #[error("{0}")]
    Internal(String),
}

impl TrackerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TrackerError::NotFound { .. } => ErrorCode::NotFound,
            TrackerError::DuplicateName(_) => ErrorCode::DuplicateName,
            TrackerError::InvalidDate(_) => ErrorCode::InvalidDate,
            TrackerError::InvalidField { .. } => ErrorCode::InvalidField,
            TrackerError::Unauthorized => ErrorCode::Unauthorized,
            TrackerError::StoreContention(_) => ErrorCode::StoreContention,
            TrackerError::Internal(_) => ErrorCode::InternalError,
        }
    }

    // Convenience constructors

    pub fn task_not_found(task_id: i64) -> Self {
        TrackerError::NotFound {
            kind: "Task",
            id: task_id.to_string(),
        }
    }

    pub fn template_not_found(template_id: i64) -> Self {
        TrackerError::NotFound {
            kind: "Template",
            id: template_id.to_string(),
        }
    }

    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        TrackerError::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Body returned to API clients.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            success: false,
            code: self.code(),
            error: self.to_string(),
        }
    }
}

/// JSON error payload.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub code: ErrorCode,
    pub error: String,
}

/// True when SQLite reported lock contention (SQLITE_BUSY / SQLITE_LOCKED).
pub fn is_contention(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked)
    )
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for TrackerError {
    fn from(err: anyhow::Error) -> Self {
        // Try to downcast to TrackerError first
        match err.downcast::<TrackerError>() {
            Ok(tracker_err) => tracker_err,
            Err(err) => match err.downcast_ref::<rusqlite::Error>() {
                Some(sql_err) if is_contention(sql_err) => {
                    TrackerError::StoreContention(sql_err.to_string())
                }
                _ => TrackerError::Internal(err.to_string()),
            },
        }
    }
}

/// Result type for tracker operations at the API boundary.
pub type TrackerResult<T> = std::result::Result<T, TrackerError>;
