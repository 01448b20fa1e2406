//! Server error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use docanchor_store::{ContextError, StoreError};
use thiserror::Error;

use crate::routes::StoreResponse;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Store failed: {0}")]
    Store(#[from] StoreError),

    #[error("Startup failed: {0}")]
    Context(#[from] ContextError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Store(e) if e.is_invalid_input() => StatusCode::BAD_REQUEST,
            ServerError::Store(StoreError::Timeout { .. } | StoreError::DeadlineExceeded { .. }) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ServerError::Store(_) => StatusCode::BAD_GATEWAY,
            ServerError::Context(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors keep the `{"status": "Error"}` body clients already parse
impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(StoreResponse::error(self.to_string()))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
