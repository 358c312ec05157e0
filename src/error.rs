use axum::http::StatusCode;
use thiserror::Error;

use crate::entity::ValueError;

// ── ServiceError ────────────────────────────────────────────────────

/// Failure inside the collection service: persistence, validation or lookup.
///
/// Only `NotFound` has its own HTTP status. Everything else is reported as 500
/// with the cause in the `details` field of the error body.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No row with the requested id. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Body failed to decode or a required field is missing. HTTP 500.
    #[error("{0}")]
    Validation(String),

    /// SQLite failure. HTTP 500.
    #[error("{0}")]
    Storage(String),

    /// Unexpected internal error. HTTP 500.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(kind: &str, id: &str) -> Self {
        ServiceError::NotFound(format!("{kind} '{id}' not found"))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Validation(_)
            | ServiceError::Storage(_)
            | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(e: rusqlite::Error) -> Self {
        ServiceError::Storage(e.to_string())
    }
}

impl From<ValueError> for ServiceError {
    fn from(e: ValueError) -> Self {
        ServiceError::Validation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldError;

    #[test]
    fn only_not_found_is_distinguished() {
        assert_eq!(
            ServiceError::not_found("task", "abc").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::Validation("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::Storage("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn display_is_just_the_message() {
        assert_eq!(ServiceError::not_found("task", "abc").to_string(), "task 'abc' not found");
        let e: ServiceError = ValueError::Field(FieldError::UnknownStatus("done".into())).into();
        assert!(matches!(e, ServiceError::Validation(ref m) if m.contains("done")));
    }
}
