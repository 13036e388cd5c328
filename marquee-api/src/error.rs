use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marquee_core::LedgerError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    CapacityError { message: String, available: i64 },
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::CapacityError { message, available } => {
                let body = Json(json!({
                    "error": message,
                    "available": available,
                }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidRequest(msg) => AppError::ValidationError(msg),
            LedgerError::NotFound(_) => AppError::NotFoundError(err.to_string()),
            LedgerError::CapacityExceeded { available, .. } => AppError::CapacityError {
                message: err.to_string(),
                available,
            },
            LedgerError::Unauthorized(_) => AppError::AuthorizationError(err.to_string()),
            LedgerError::AlreadyCancelled
            | LedgerError::PastEvent
            | LedgerError::TooCloseToEvent
            | LedgerError::EventNotActive => AppError::ValidationError(err.to_string()),
            LedgerError::Conflict(msg) => AppError::ConflictError(msg),
            LedgerError::Storage(source) => AppError::InternalServerError(source.to_string()),
        }
    }
}
