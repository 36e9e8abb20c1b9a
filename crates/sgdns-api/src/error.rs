use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::BAD_REQUEST, message: msg.into() }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::UNAUTHORIZED, message: msg.into() }
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::UNPROCESSABLE_ENTITY, message: msg.into() }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::CONFLICT, message: msg.into() }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::INTERNAL_SERVER_ERROR, message: msg.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<sgdns_pipeline::PipelineError> for ApiError {
    fn from(e: sgdns_pipeline::PipelineError) -> Self {
        use sgdns_pipeline::PipelineError;
        match e {
            PipelineError::Config(_) | PipelineError::NoConfiguration(_) => {
                ApiError::unprocessable(e.to_string())
            }
            PipelineError::Domain(_) => ApiError::bad_request(e.to_string()),
            PipelineError::LockUnavailable(_) => ApiError::conflict(e.to_string()),
            _ => ApiError::internal(e.to_string()),
        }
    }
}

impl From<sgdns_store::StoreError> for ApiError {
    fn from(e: sgdns_store::StoreError) -> Self {
        ApiError::internal(e.to_string())
    }
}
