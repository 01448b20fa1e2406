//! Store error types

use std::path::PathBuf;
use std::time::Duration;

use docanchor_core::{ConfigError, DecodingError, DerivationError, EncodingError, Pubkey};
use solana_sdk::signature::Signature;
use thiserror::Error;

/// Failure reported by, or while talking to, the ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        logs: Vec<String>,
    },

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(Pubkey),

    #[error("Account not found: {0}")]
    AccountNotFound(Pubkey),

    #[error("Insufficient funds: {available} lamports available, {required} required")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("Instruction rejected: {0}")]
    Rejected(String),

    #[error("Transaction {signature} failed: {reason}")]
    TransactionFailed { signature: Signature, reason: String },
}

impl LedgerError {
    /// True if the error text or program logs contain `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        match self {
            LedgerError::Rpc { message, logs, .. } => {
                message.contains(needle) || logs.iter().any(|l| l.contains(needle))
            }
            other => other.to_string().contains(needle),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Derivation error: {0}")]
    Derivation(#[from] DerivationError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Timed out after {after:?} waiting for {signature} to commit")]
    Timeout { signature: Signature, after: Duration },

    /// Nothing was submitted for the step that would have run past the deadline
    #[error("Deadline of {after:?} passed before {step}")]
    DeadlineExceeded { step: &'static str, after: Duration },
}

impl StoreError {
    /// Errors caused by the request itself rather than the ledger
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, StoreError::Encoding(_) | StoreError::Derivation(_))
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("No record stored at {0}")]
    NotFound(Pubkey),

    #[error("Decoding error: {0}")]
    Decoding(#[from] DecodingError),

    #[error("Derivation error: {0}")]
    Derivation(#[from] DerivationError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }
}

/// Startup failures; these abort the process
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Key file {path}: {reason}")]
    KeyFile { path: PathBuf, reason: String },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Funding of {lamports} lamports not confirmed after {after:?}")]
    FundingTimeout { lamports: u64, after: Duration },
}
