//! Ledger client abstraction

use std::time::Duration;

use async_trait::async_trait;
use docanchor_core::{Pubkey, SlotAddress};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::sysvar;

use crate::error::LedgerError;

/// Commitment state of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// Unknown to the cluster or below the configured commitment
    Pending,
    Committed,
    Failed(String),
}

/// Operations the record store needs from a ledger
///
/// Submitting methods return as soon as the transaction is accepted; use
/// [`wait_for_commit`] to wait for it to land.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Lamports needed to keep an account of `space` bytes rent exempt
    async fn minimum_balance(&self, space: usize) -> Result<u64, LedgerError>;

    async fn balance(&self, pubkey: &Pubkey) -> Result<u64, LedgerError>;

    /// Raw account data, `None` if the account does not exist
    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Allocate the slot account, owned by `slot.program_id` and funded by `payer`
    async fn create_slot(
        &self,
        payer: &Keypair,
        slot: &SlotAddress,
        space: usize,
        lamports: u64,
    ) -> Result<Signature, LedgerError>;

    /// Send `image` to the owning program to be written into the slot
    async fn write_slot(
        &self,
        authority: &Keypair,
        slot: &SlotAddress,
        image: &[u8],
    ) -> Result<Signature, LedgerError>;

    async fn request_funding(&self, pubkey: &Pubkey, lamports: u64)
        -> Result<Signature, LedgerError>;

    async fn signature_status(&self, signature: &Signature) -> Result<TxStatus, LedgerError>;
}

/// Instruction writing a slot image through the owning program
///
/// Accounts: slot (writable), rent sysvar, authority (signer).
pub fn write_instruction(slot: &SlotAddress, authority: &Pubkey, image: &[u8]) -> Instruction {
    Instruction::new_with_bytes(
        slot.program_id,
        image,
        vec![
            AccountMeta::new(slot.address, false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
            AccountMeta::new_readonly(*authority, true),
        ],
    )
}

/// Poll until `signature` is committed or has failed
///
/// Never gives up on its own; callers bound it with a timeout.
pub async fn wait_for_commit(
    ledger: &dyn Ledger,
    signature: &Signature,
    poll_interval: Duration,
) -> Result<(), LedgerError> {
    loop {
        match ledger.signature_status(signature).await? {
            TxStatus::Committed => return Ok(()),
            TxStatus::Failed(reason) => {
                return Err(LedgerError::TransactionFailed {
                    signature: *signature,
                    reason,
                })
            }
            TxStatus::Pending => tokio::time::sleep(poll_interval).await,
        }
    }
}
