//! docanchor-core: record layout and slot addressing for ledger-anchored document hashes
//!
//! A document hash is stored per `(hospitalId, reportId)` pair in a ledger
//! account whose address is derived from the service identity, a textual
//! seed and the owning program:
//!
//! ```text
//! seed    = "{hospitalId}_{reportId}"
//! address = create_with_seed(identity, seed, program_id)
//! data    = [hospitalId, reportId, documentHash utf-8..., 0x00 padding]
//! ```
//!
//! Any external reader that reproduces the seed format can locate a record
//! without consulting this service.
//!
//! This crate has no network I/O. The ledger client and the store facade
//! live in `docanchor-store`.

mod config;
mod error;
mod record;
mod slot;

pub use config::{ServiceConfig, DEFAULT_AIRDROP_LAMPORTS, DEFAULT_RPC_URL};
pub use error::{ConfigError, DecodingError, DerivationError, EncodingError};
pub use record::{HashRecord, RecordCodec, DEFAULT_SLOT_CAPACITY, OBSERVED_SLOT_CAPACITY, RECORD_HEADER_LEN};
pub use slot::{derive_slot, slot_seed, RecordKey, SlotAddress};

/// Re-export of the ledger public key type used for addresses
pub use solana_sdk::pubkey::Pubkey;

/// Constants shared by the service and its clients
pub mod constants {
    /// Length of a hex-encoded SHA-256 digest
    pub const SHA256_HEX_LEN: usize = 64;

    /// Lamports in one SOL
    pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

    /// Largest id that fits the single-byte record fields
    pub const MAX_RECORD_ID: i64 = u8::MAX as i64;
}
