//! Record store facade
//!
//! A key is either Absent (no slot account) or Present. `store` moves a key
//! from Absent to Present by creating the slot, then writes the record;
//! on a Present key it only overwrites. `fetch` reads and decodes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use docanchor_core::{
    derive_slot, DerivationError, EncodingError, HashRecord, Pubkey, RecordCodec, RecordKey,
    SlotAddress,
};
use metrics::counter;
use solana_sdk::signature::Signature;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::context::ServiceContext;
use crate::error::{FetchError, LedgerError, StoreError};
use crate::ledger::wait_for_commit;
use crate::locks::KeyLocks;

/// Outcome of a committed `store`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreReceipt {
    pub address: Pubkey,
    /// Set when this call created the slot
    pub created: Option<Signature>,
    pub written: Signature,
}

fn record_tx(kind: &'static str, outcome: &'static str) {
    counter!("docanchor_ledger_transactions_total", "kind" => kind, "outcome" => outcome).increment(1);
}

fn record_submit_failure(kind: &'static str, error: &StoreError) {
    let outcome = match error {
        StoreError::DeadlineExceeded { .. } => "deadline",
        _ => "rejected",
    };
    record_tx(kind, outcome);
}

/// Per-call time budget
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    fn exceeded(&self, step: &'static str) -> StoreError {
        StoreError::DeadlineExceeded {
            step,
            after: self.budget,
        }
    }

    fn check(&self, step: &'static str) -> Result<(), StoreError> {
        if Instant::now() >= self.at {
            return Err(self.exceeded(step));
        }
        Ok(())
    }

    /// Run `call` only if the deadline has not passed, and cut it off when it does
    async fn run<T>(
        &self,
        step: &'static str,
        call: impl Future<Output = Result<T, LedgerError>>,
    ) -> Result<T, StoreError> {
        self.check(step)?;
        match tokio::time::timeout_at(self.at, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(self.exceeded(step)),
        }
    }
}

pub struct RecordStore {
    context: Arc<ServiceContext>,
    codec: RecordCodec,
    locks: KeyLocks,
}

impl RecordStore {
    pub fn new(context: Arc<ServiceContext>) -> Self {
        let codec = RecordCodec::new(context.config().slot_capacity);
        Self {
            context,
            codec,
            locks: KeyLocks::new(),
        }
    }

    pub fn context(&self) -> &ServiceContext {
        &self.context
    }

    pub fn codec(&self) -> &RecordCodec {
        &self.codec
    }

    /// Slot address for a key under the current identity and program
    pub fn slot_address(&self, key: &RecordKey) -> Result<SlotAddress, DerivationError> {
        derive_slot(
            &self.context.identity().pubkey(),
            &self.context.program_id(),
            key,
        )
    }

    /// Store with the configured confirmation timeout
    pub async fn store(&self, key: RecordKey, document_hash: &str) -> Result<StoreReceipt, StoreError> {
        self.store_with_timeout(key, document_hash, self.context.config().confirm_timeout())
            .await
    }

    /// Create the slot if absent, write the record, and wait for both to commit
    ///
    /// `timeout` bounds the whole call, including the wait for the key lock.
    /// No transaction is submitted once it has passed. A transaction already
    /// submitted when it passes may still land.
    pub async fn store_with_timeout(
        &self,
        key: RecordKey,
        document_hash: &str,
        timeout: Duration,
    ) -> Result<StoreReceipt, StoreError> {
        let record = self.codec.encode_for(&key, document_hash)?;
        let slot = self.slot_address(&key)?;
        let deadline = Deadline::after(timeout);

        let _guard = tokio::time::timeout_at(deadline.at, self.locks.lock(key))
            .await
            .map_err(|_| deadline.exceeded("slot lock"))?;

        let (created, space) = self.ensure_slot(&slot, deadline).await?;

        // an existing slot keeps the size it was created with
        if record.len() > space {
            return Err(EncodingError::CapacityExceeded {
                len: record.len(),
                capacity: space,
            }
            .into());
        }
        let mut image = record;
        image.resize(space, 0);

        let identity = self.context.identity().keypair();
        let written = match deadline
            .run("write", self.context.ledger().write_slot(identity, &slot, &image))
            .await
        {
            Ok(sig) => sig,
            Err(e) => {
                record_submit_failure("write", &e);
                return Err(e);
            }
        };
        self.confirm(&written, "write", deadline).await?;

        info!(
            key = %key,
            address = %slot.address,
            created = created.is_some(),
            signature = %written,
            "Record stored"
        );

        Ok(StoreReceipt {
            address: slot.address,
            created,
            written,
        })
    }

    /// Create the slot account unless it already exists
    ///
    /// Returns the creating signature, if any, and the slot's data length.
    async fn ensure_slot(
        &self,
        slot: &SlotAddress,
        deadline: Deadline,
    ) -> Result<(Option<Signature>, usize), StoreError> {
        let ledger = self.context.ledger();

        if let Some(data) = deadline
            .run("slot lookup", ledger.account_data(&slot.address))
            .await?
        {
            debug!(address = %slot.address, len = data.len(), "Slot present, overwriting");
            return Ok((None, data.len()));
        }

        let capacity = self.codec.capacity();
        let lamports = match self.context.config().slot_lamports {
            Some(lamports) => lamports,
            None => {
                deadline
                    .run("rent lookup", ledger.minimum_balance(capacity))
                    .await?
            }
        };

        let identity = self.context.identity().keypair();
        let submitted = deadline
            .run(
                "slot creation",
                ledger.create_slot(identity, slot, capacity, lamports),
            )
            .await;

        let outcome = match submitted {
            Ok(signature) => self
                .confirm(&signature, "create", deadline)
                .await
                .map(|()| Some(signature)),
            Err(e) => {
                record_submit_failure("create", &e);
                Err(e)
            }
        };

        match outcome {
            Err(StoreError::Ledger(
                e @ (LedgerError::AccountAlreadyExists(_) | LedgerError::TransactionFailed { .. }),
            )) => {
                // another writer may have created it first
                match deadline
                    .run("slot lookup", ledger.account_data(&slot.address))
                    .await?
                {
                    Some(data) => {
                        warn!(address = %slot.address, error = %e, "Slot created concurrently, continuing");
                        Ok((None, data.len()))
                    }
                    None => Err(e.into()),
                }
            }
            Ok(signature) => {
                info!(address = %slot.address, seed = %slot.seed, lamports, "Slot created");
                Ok((signature, capacity))
            }
            Err(e) => Err(e),
        }
    }

    async fn confirm(
        &self,
        signature: &Signature,
        kind: &'static str,
        deadline: Deadline,
    ) -> Result<(), StoreError> {
        let ledger = self.context.ledger();
        let poll = self.context.config().poll_interval();

        match tokio::time::timeout_at(deadline.at, wait_for_commit(ledger, signature, poll)).await {
            Ok(Ok(())) => {
                record_tx(kind, "committed");
                Ok(())
            }
            Ok(Err(e)) => {
                record_tx(kind, "failed");
                Err(e.into())
            }
            Err(_) => {
                record_tx(kind, "timeout");
                Err(StoreError::Timeout {
                    signature: *signature,
                    after: deadline.budget,
                })
            }
        }
    }

    /// Read and decode the record for a key
    pub async fn fetch(&self, key: RecordKey) -> Result<HashRecord, FetchError> {
        let slot = self.slot_address(&key)?;

        let data = self
            .context
            .ledger()
            .account_data(&slot.address)
            .await?
            .ok_or(FetchError::NotFound(slot.address))?;

        // allocated but never written
        if RecordCodec::is_blank(&data) {
            return Err(FetchError::NotFound(slot.address));
        }

        Ok(self.codec.decode_for(&key, &data)?)
    }
}
