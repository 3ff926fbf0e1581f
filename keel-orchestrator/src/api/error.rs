//! API Error Handling
//!
//! Error types and conversion for requests that never reach the orchestrator.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use keel_core::dto::deploy::ErrorBody;

use crate::service::upload_service::ValidationError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(err) => {
                tracing::info!("Rejected upload: {}", err);
                let status = match err {
                    ValidationError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, err.to_string())
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
