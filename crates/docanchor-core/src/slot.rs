//! Slot addressing: record key -> seed -> ledger address

use std::fmt;

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::error::DerivationError;

/// Caller-supplied identity of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordKey {
    pub hospital_id: i64,
    pub report_id: i64,
}

impl RecordKey {
    pub fn new(hospital_id: i64, report_id: i64) -> Self {
        Self {
            hospital_id,
            report_id,
        }
    }

    /// Seed string used to derive the slot address
    pub fn seed(&self) -> String {
        slot_seed(self)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.hospital_id, self.report_id)
    }
}

/// `"{hospitalId}_{reportId}"`
///
/// Part of the addressing contract: readers outside this service rebuild
/// the same string to find a record.
pub fn slot_seed(key: &RecordKey) -> String {
    format!("{}_{}", key.hospital_id, key.report_id)
}

/// A derived storage slot and the inputs it was derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAddress {
    /// Identity the address is derived from (and that pays for the slot)
    pub base: Pubkey,
    pub seed: String,
    /// Program that owns the slot account
    pub program_id: Pubkey,
    pub address: Pubkey,
}

impl fmt::Display for SlotAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (seed {})", self.address, self.seed)
    }
}

/// Derive the slot address for a key
pub fn derive_slot(
    owner: &Pubkey,
    program_id: &Pubkey,
    key: &RecordKey,
) -> Result<SlotAddress, DerivationError> {
    let seed = slot_seed(key);
    let address = Pubkey::create_with_seed(owner, &seed, program_id).map_err(|e| {
        DerivationError {
            seed: seed.clone(),
            reason: e.to_string(),
        }
    })?;

    Ok(SlotAddress {
        base: *owner,
        seed,
        program_id: *program_id,
        address,
    })
}
