use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Errors raised by the attendance ledger, the roster and the reconciler.
///
/// "Already checked in" is not an error: it is reported through
/// [`crate::service::ledger::MarkOutcome`].
#[derive(Debug, Display)]
pub enum AttendanceError {
    /// Store unreachable or corrupt. Surfaced as-is, never retried.
    #[display(fmt = "storage error: {}", _0)]
    Storage(sqlx::Error),

    /// An attendance row points at a student that no longer exists.
    #[display(fmt = "orphaned reference: student {} no longer exists", student_id)]
    OrphanedReference { student_id: String },

    /// Purge requested for a student that is still on the roster.
    #[display(fmt = "student {} is still enrolled", _0)]
    StillEnrolled(String),

    #[display(fmt = "{} not found", _0)]
    NotFound(String),

    #[display(fmt = "invalid input: {}", _0)]
    InvalidInput(String),

    #[display(fmt = "io error: {}", _0)]
    Io(std::io::Error),
}

impl std::error::Error for AttendanceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AttendanceError {
    fn from(value: sqlx::Error) -> Self {
        Self::Storage(value)
    }
}

impl From<std::io::Error> for AttendanceError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Storage(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::OrphanedReference { .. } | Self::StillEnrolled(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // storage details stay in the log
        let message = match self {
            Self::Storage(_) | Self::Io(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orphaned_reference_maps_to_conflict() {
        let err = AttendanceError::OrphanedReference {
            student_id: "S-1".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            err.to_string(),
            "orphaned reference: student S-1 no longer exists"
        );
    }

    #[test]
    fn storage_errors_hide_details() {
        let err = AttendanceError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().starts_with("storage error"));
    }
}
