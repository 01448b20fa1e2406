//! In-process ledger
//!
//! Models the parts of the cluster the store touches: lamport balances,
//! seed-derived account creation, and the hash program's write rules
//! (program-owned slot, signing authority, slot address re-derived from
//! the record's id bytes). Transactions are applied on submission.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use docanchor_core::{Pubkey, RecordKey, SlotAddress, RECORD_HEADER_LEN};
use solana_sdk::signature::{Keypair, Signature, Signer};
use tokio::sync::Mutex;

use crate::error::LedgerError;
use crate::ledger::{Ledger, TxStatus};

/// Rent parameters of mainnet/devnet
const LAMPORTS_PER_BYTE_YEAR: u64 = 3480;
const EXEMPTION_YEARS: u64 = 2;
const ACCOUNT_STORAGE_OVERHEAD: u64 = 128;

#[derive(Debug, Clone)]
struct Account {
    owner: Pubkey,
    lamports: u64,
    data: Vec<u8>,
}

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<Pubkey, Account>,
    balances: HashMap<Pubkey, u64>,
    statuses: HashMap<Signature, TxStatus>,
}

/// Ledger kept in memory, scoped to a single hash program
pub struct InMemoryLedger {
    program_id: Pubkey,
    state: Mutex<LedgerState>,
    /// Signs synthetic transaction ids
    signer: Keypair,
    tx_counter: AtomicU64,
    create_calls: AtomicU64,
    hold_confirmations: AtomicBool,
}

impl InMemoryLedger {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            state: Mutex::new(LedgerState::default()),
            signer: Keypair::new(),
            tx_counter: AtomicU64::new(0),
            create_calls: AtomicU64::new(0),
            hold_confirmations: AtomicBool::new(false),
        }
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// Leave new transactions pending until [`release_pending`](Self::release_pending)
    pub fn hold_confirmations(&self, hold: bool) {
        self.hold_confirmations.store(hold, Ordering::SeqCst);
    }

    /// Commit every pending transaction
    pub async fn release_pending(&self) {
        let mut state = self.state.lock().await;
        for status in state.statuses.values_mut() {
            if *status == TxStatus::Pending {
                *status = TxStatus::Committed;
            }
        }
    }

    /// Number of `create_slot` submissions seen, successful or not
    pub fn create_calls(&self) -> u64 {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of accounts owned by the hash program
    pub async fn slot_count(&self) -> usize {
        let state = self.state.lock().await;
        state
            .accounts
            .values()
            .filter(|a| a.owner == self.program_id)
            .count()
    }

    /// Lamports held by a slot account
    pub async fn slot_lamports(&self, address: &Pubkey) -> Option<u64> {
        let state = self.state.lock().await;
        state.accounts.get(address).map(|a| a.lamports)
    }

    /// Insert an account directly, bypassing the program rules
    pub async fn insert_account(&self, address: Pubkey, owner: Pubkey, data: Vec<u8>) {
        let mut state = self.state.lock().await;
        state.accounts.insert(
            address,
            Account {
                owner,
                lamports: 0,
                data,
            },
        );
    }

    fn next_signature(&self, tag: &[u8]) -> Signature {
        let n = self.tx_counter.fetch_add(1, Ordering::SeqCst);
        let mut message = n.to_le_bytes().to_vec();
        message.extend_from_slice(tag);
        self.signer.sign_message(&message)
    }

    fn record(&self, state: &mut LedgerState, signature: Signature) {
        let status = if self.hold_confirmations.load(Ordering::SeqCst) {
            TxStatus::Pending
        } else {
            TxStatus::Committed
        };
        state.statuses.insert(signature, status);
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn minimum_balance(&self, space: usize) -> Result<u64, LedgerError> {
        Ok((ACCOUNT_STORAGE_OVERHEAD + space as u64) * LAMPORTS_PER_BYTE_YEAR * EXEMPTION_YEARS)
    }

    async fn balance(&self, pubkey: &Pubkey) -> Result<u64, LedgerError> {
        let state = self.state.lock().await;
        Ok(state.balances.get(pubkey).copied().unwrap_or(0))
    }

    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state.accounts.get(address).map(|a| a.data.clone()))
    }

    async fn create_slot(
        &self,
        payer: &Keypair,
        slot: &SlotAddress,
        space: usize,
        lamports: u64,
    ) -> Result<Signature, LedgerError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let payer_key = payer.pubkey();

        let expected = Pubkey::create_with_seed(&slot.base, &slot.seed, &slot.program_id)
            .map_err(|e| LedgerError::Rejected(e.to_string()))?;
        if expected != slot.address || slot.base != payer_key {
            return Err(LedgerError::Rejected(
                "address does not match base and seed".into(),
            ));
        }

        let mut state = self.state.lock().await;
        if state.accounts.contains_key(&slot.address) {
            return Err(LedgerError::AccountAlreadyExists(slot.address));
        }

        let available = state.balances.get(&payer_key).copied().unwrap_or(0);
        if available < lamports {
            return Err(LedgerError::InsufficientFunds {
                available,
                required: lamports,
            });
        }

        state.balances.insert(payer_key, available - lamports);
        state.accounts.insert(
            slot.address,
            Account {
                owner: slot.program_id,
                lamports,
                data: vec![0; space],
            },
        );

        let signature = self.next_signature(slot.address.as_ref());
        self.record(&mut state, signature);
        Ok(signature)
    }

    async fn write_slot(
        &self,
        authority: &Keypair,
        slot: &SlotAddress,
        image: &[u8],
    ) -> Result<Signature, LedgerError> {
        if slot.program_id != self.program_id {
            return Err(LedgerError::Rejected(format!(
                "unknown program {}",
                slot.program_id
            )));
        }
        if image.len() < RECORD_HEADER_LEN {
            return Err(LedgerError::Rejected("instruction data too short".into()));
        }

        let key = RecordKey::new(image[0].into(), image[1].into());
        let expected = Pubkey::create_with_seed(&authority.pubkey(), &key.seed(), &self.program_id)
            .map_err(|e| LedgerError::Rejected(e.to_string()))?;
        if expected != slot.address {
            return Err(LedgerError::Rejected(
                "account is not the hash account for this record".into(),
            ));
        }

        let mut state = self.state.lock().await;
        let account = state
            .accounts
            .get_mut(&slot.address)
            .ok_or(LedgerError::AccountNotFound(slot.address))?;

        if account.owner != self.program_id {
            return Err(LedgerError::Rejected("slot not owned by program".into()));
        }
        if image.len() > account.data.len() {
            return Err(LedgerError::Rejected(format!(
                "record of {} bytes does not fit slot of {}",
                image.len(),
                account.data.len()
            )));
        }

        account.data[..image.len()].copy_from_slice(image);
        account.data[image.len()..].fill(0);

        let signature = self.next_signature(slot.address.as_ref());
        self.record(&mut state, signature);
        Ok(signature)
    }

    async fn request_funding(
        &self,
        pubkey: &Pubkey,
        lamports: u64,
    ) -> Result<Signature, LedgerError> {
        let mut state = self.state.lock().await;
        *state.balances.entry(*pubkey).or_insert(0) += lamports;

        let signature = self.next_signature(pubkey.as_ref());
        self.record(&mut state, signature);
        Ok(signature)
    }

    async fn signature_status(&self, signature: &Signature) -> Result<TxStatus, LedgerError> {
        let state = self.state.lock().await;
        Ok(state
            .statuses
            .get(signature)
            .cloned()
            .unwrap_or(TxStatus::Pending))
    }
}
