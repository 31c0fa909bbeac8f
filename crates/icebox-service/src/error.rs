//! API error mapping
//!
//! Every failure leaves the service as `{"error": "..."}` with a status
//! chosen by remedy class: precondition failures are the caller's to
//! fix (400), missing or invalid sessions are 401, everything else is a
//! 500 whose message tells the operator which stage gave out.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use icebox_pipeline::PipelineError;
use icebox_store::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Http { status: StatusCode, message: String },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub(crate) fn unauthorized() -> Self {
        Self::Http {
            status: StatusCode::UNAUTHORIZED,
            message: "authentication required".to_string(),
        }
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::Http {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::Http {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Http { status, message } => (status, message),
            ApiError::Pipeline(err) if err.is_precondition() => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Pipeline(err) if err.is_retryable() => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{err}; try generating again"),
            ),
            ApiError::Pipeline(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Store(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
