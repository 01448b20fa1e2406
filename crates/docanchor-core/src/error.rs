//! Error types for docanchor-core

use thiserror::Error;

/// Input violates the record layout
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Hospital id out of range: {0} (expected 0..=255)")]
    HospitalIdOutOfRange(i64),

    #[error("Report id out of range: {0} (expected 0..=255)")]
    ReportIdOutOfRange(i64),

    #[error("Record too large: {len} bytes exceeds slot capacity of {capacity}")]
    CapacityExceeded { len: usize, capacity: usize },

    #[error("Document hash contains a NUL byte at offset {0}")]
    EmbeddedNul(usize),
}

/// Slot bytes do not hold a well-formed record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodingError {
    #[error("Record too short: {0} bytes")]
    TooShort(usize),

    #[error("Document hash is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Document hash is empty")]
    EmptyHash,

    #[error("Record ids {actual_hospital}_{actual_report} do not match key {expected}")]
    KeyMismatch {
        expected: String,
        actual_hospital: u8,
        actual_report: u8,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot derive slot address for seed {seed}: {reason}")]
pub struct DerivationError {
    pub seed: String,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
