//! docanchor-client: HTTP client for the document hash service

pub mod client;
pub mod error;
pub mod hashing;

pub use client::{DocAnchorClient, FetchResponse, HealthResponse, StoreResponse};
pub use error::{ClientError, Result};
pub use hashing::{sha256_file, sha256_hex};
