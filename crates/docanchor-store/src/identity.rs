//! Key material: service identity and program id

use std::path::{Path, PathBuf};
use std::str::FromStr;

use docanchor_core::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::signer::keypair::{read_keypair, read_keypair_file, write_keypair_file};

use crate::error::ContextError;

fn key_file_error(path: &Path, reason: impl ToString) -> ContextError {
    ContextError::KeyFile {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Where the operating keypair came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySource {
    /// Fresh keypair; slots created under it become unwritable after restart
    Generated,
    File(PathBuf),
}

/// Keypair that pays for slots and signs writes
pub struct ServiceIdentity {
    keypair: Keypair,
    source: IdentitySource,
}

impl ServiceIdentity {
    pub fn generate() -> Self {
        Self {
            keypair: Keypair::new(),
            source: IdentitySource::Generated,
        }
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair,
            source: IdentitySource::Generated,
        }
    }

    /// Load a Solana CLI keypair file (JSON array of 64 bytes)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContextError> {
        let path = path.as_ref();
        let keypair = read_keypair_file(path).map_err(|e| key_file_error(path, e))?;
        Ok(Self {
            keypair,
            source: IdentitySource::File(path.to_path_buf()),
        })
    }

    /// Load `path` if it exists; otherwise generate and persist there
    ///
    /// With no path the identity lives for the process only.
    pub fn load_or_generate(path: Option<&Path>) -> Result<Self, ContextError> {
        let Some(path) = path else {
            return Ok(Self::generate());
        };

        if path.exists() {
            return Self::load(path);
        }

        let keypair = Keypair::new();
        write_keypair_file(&keypair, path).map_err(|e| key_file_error(path, e))?;
        tracing::info!(path = %path.display(), pubkey = %keypair.pubkey(), "Generated new identity keypair");

        Ok(Self {
            keypair,
            source: IdentitySource::File(path.to_path_buf()),
        })
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn source(&self) -> &IdentitySource {
        &self.source
    }
}

impl std::fmt::Debug for ServiceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceIdentity")
            .field("pubkey", &self.pubkey())
            .field("source", &self.source)
            .finish()
    }
}

/// Read the program id from a keypair file or a file holding a base58 pubkey
pub fn load_program_id(path: impl AsRef<Path>) -> Result<Pubkey, ContextError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| key_file_error(path, e))?;
    let trimmed = content.trim();

    if trimmed.starts_with('[') {
        let keypair = read_keypair(&mut trimmed.as_bytes()).map_err(|e| key_file_error(path, e))?;
        return Ok(keypair.pubkey());
    }

    Pubkey::from_str(trimmed).map_err(|e| key_file_error(path, e))
}
