//! # API Errors
//!
//! Every failure the HTTP API reports is a 500 with a `{"message": ...}`
//! body. The message is the underlying error text, passed through as is.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{Event, Logger};
use crate::store::StoreError;

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// HTTP API errors
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The backend call failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The relational client was never established
    #[error("relational store is not initialized")]
    RelationalStoreUninitialized,
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RelationalStoreUninitialized => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log the failure against the request that hit it
    pub fn logged(self, request_id: &str) -> Self {
        Logger::event(
            Event::RequestFailed,
            &[("message", self.to_string().as_str()), ("request_id", request_id)],
        );
        self
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorResponse::from(&self))).into_response()
    }
}
