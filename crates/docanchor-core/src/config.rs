//! Service configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::LAMPORTS_PER_SOL;
use crate::error::ConfigError;
use crate::record::{DEFAULT_SLOT_CAPACITY, RECORD_HEADER_LEN};

/// Public devnet endpoint
pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

/// Startup airdrop for a freshly generated identity
pub const DEFAULT_AIRDROP_LAMPORTS: u64 = 5 * LAMPORTS_PER_SOL;

/// Configuration for the document hash service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Ledger JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Commitment level used for reads and confirmations
    #[serde(default = "default_commitment")]
    pub commitment: String,
    /// Keypair (or base58 pubkey) file of the program owning the slots
    pub program_keypair: PathBuf,
    /// Keypair file for the service identity; generated at startup if absent
    #[serde(default)]
    pub identity_keypair: Option<PathBuf>,
    /// Slot size in bytes
    #[serde(default = "default_slot_capacity")]
    pub slot_capacity: usize,
    /// Lamports deposited into each new slot; rent-exempt minimum when unset
    #[serde(default)]
    pub slot_lamports: Option<u64>,
    /// Airdrop requested at startup when the identity balance is below it
    #[serde(default = "default_airdrop_lamports")]
    pub airdrop_lamports: u64,
    /// Upper bound on waiting for a transaction to commit
    #[serde(default = "default_confirm_timeout_ms")]
    pub confirm_timeout_ms: u64,
    /// Interval between signature status polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// HTTP bind host
    #[serde(default = "default_host")]
    pub host: String,
    /// HTTP bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn default_slot_capacity() -> usize {
    DEFAULT_SLOT_CAPACITY
}

fn default_airdrop_lamports() -> u64 {
    DEFAULT_AIRDROP_LAMPORTS
}

fn default_confirm_timeout_ms() -> u64 {
    60_000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl ServiceConfig {
    /// Configuration pointing at a program keypair, defaults elsewhere
    pub fn new(program_keypair: impl Into<PathBuf>) -> Self {
        Self {
            rpc_url: default_rpc_url(),
            commitment: default_commitment(),
            program_keypair: program_keypair.into(),
            identity_keypair: None,
            slot_capacity: default_slot_capacity(),
            slot_lamports: None,
            airdrop_lamports: default_airdrop_lamports(),
            confirm_timeout_ms: default_confirm_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            host: default_host(),
            port: default_port(),
        }
    }

    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = url.into();
        self
    }

    pub fn with_identity(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_keypair = Some(path.into());
        self
    }

    pub fn with_slot_capacity(mut self, capacity: usize) -> Self {
        self.slot_capacity = capacity;
        self
    }

    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slot_capacity <= RECORD_HEADER_LEN {
            return Err(ConfigError::Invalid(format!(
                "slot_capacity must exceed {} bytes, got {}",
                RECORD_HEADER_LEN, self.slot_capacity
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be non-zero".into()));
        }
        match self.commitment.as_str() {
            "processed" | "confirmed" | "finalized" => Ok(()),
            other => Err(ConfigError::Invalid(format!("unknown commitment: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::new("program.json");
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.slot_capacity, DEFAULT_SLOT_CAPACITY);
        assert_eq!(config.airdrop_lamports, 5 * LAMPORTS_PER_SOL);
        assert_eq!(config.confirm_timeout(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = ServiceConfig::new("/keys/program.json")
            .with_rpc_url("http://localhost:8899")
            .with_slot_capacity(64)
            .with_confirm_timeout(Duration::from_secs(5));
        config.save(&path).unwrap();

        let loaded = ServiceConfig::load(&path).unwrap();
        assert_eq!(loaded.rpc_url, "http://localhost:8899");
        assert_eq!(loaded.slot_capacity, 64);
        assert_eq!(loaded.confirm_timeout_ms, 5_000);
        assert_eq!(loaded.program_keypair, PathBuf::from("/keys/program.json"));
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config: ServiceConfig =
            serde_json::from_str(r#"{"program_keypair": "p.json"}"#).unwrap();
        assert_eq!(config.commitment, "confirmed");
        assert_eq!(config.port, 3000);
        assert!(config.identity_keypair.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ServiceConfig::new("p").with_slot_capacity(2).validate().is_err());

        let mut config = ServiceConfig::new("p");
        config.commitment = "eventually".into();
        assert!(config.validate().is_err());
    }
}
