//! Client error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Rejected ({status}): {reason}")]
    Rejected { status: u16, reason: String },
}

pub type Result<T> = std::result::Result<T, ClientError>;
