use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use examcell_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`]; storage faults already arrive as
/// [`CoreError::Storage`]. Implements [`IntoResponse`] to produce consistent
/// JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `examcell_core`.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Core(CoreError::Validation(errors.to_string()))
    }
}

fn internal(message: &str) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %message, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Publish rejections carry the conflict list for the conflict view.
        if let AppError::Core(CoreError::UnresolvedConflicts { conflicts }) = &self {
            let body = json!({
                "error": self.to_string(),
                "code": "UNRESOLVED_CONFLICTS",
                "conflicts": conflicts,
            });
            return (StatusCode::CONFLICT, axum::Json(body)).into_response();
        }

        let AppError::Core(core) = &self;
        let (status, code, message) = match core {
            CoreError::NotFound { entity, id } => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{entity} with id {id} not found"),
            ),
            CoreError::UnknownSubject(_) => {
                (StatusCode::NOT_FOUND, "UNKNOWN_SUBJECT", core.to_string())
            }
            CoreError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            CoreError::SlotNotInRange { .. } => {
                (StatusCode::BAD_REQUEST, "SLOT_NOT_IN_RANGE", core.to_string())
            }
            CoreError::DuplicateId { .. } => {
                (StatusCode::CONFLICT, "DUPLICATE_ID", core.to_string())
            }
            CoreError::InvalidTransition { .. } => {
                (StatusCode::CONFLICT, "INVALID_TRANSITION", core.to_string())
            }
            CoreError::UnresolvedConflicts { .. } => {
                (StatusCode::CONFLICT, "UNRESOLVED_CONFLICTS", core.to_string())
            }
            CoreError::StaleDraft { .. } => {
                (StatusCode::CONFLICT, "STALE_DRAFT", core.to_string())
            }
            CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            CoreError::Storage(msg) | CoreError::Internal(msg) => internal(msg),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
