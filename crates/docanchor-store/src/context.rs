//! Process-wide service context
//!
//! Built once at startup and shared by `Arc`: the ledger handle, the
//! operating identity and the program that owns the slots.

use std::sync::Arc;

use docanchor_core::{Pubkey, ServiceConfig};
use tracing::{info, warn};

use crate::error::ContextError;
use crate::identity::{load_program_id, IdentitySource, ServiceIdentity};
use crate::ledger::{wait_for_commit, Ledger};

pub struct ServiceContext {
    config: ServiceConfig,
    ledger: Arc<dyn Ledger>,
    identity: ServiceIdentity,
    program_id: Pubkey,
}

impl ServiceContext {
    /// Load key material and fund the identity if needed
    ///
    /// Any failure here is fatal to startup.
    pub async fn init(config: ServiceConfig, ledger: Arc<dyn Ledger>) -> Result<Self, ContextError> {
        config.validate()?;

        let program_id = load_program_id(&config.program_keypair)?;
        let identity = ServiceIdentity::load_or_generate(config.identity_keypair.as_deref())?;

        info!(
            identity = %identity.pubkey(),
            program_id = %program_id,
            rpc = %config.rpc_url,
            "Service context initialized"
        );
        if *identity.source() == IdentitySource::Generated {
            warn!("Using an ephemeral identity; slots become read-only after restart");
        }

        let context = Self::from_parts(config, ledger, identity, program_id);
        context.ensure_funded().await?;
        Ok(context)
    }

    /// Assemble a context without touching the ledger
    pub fn from_parts(
        config: ServiceConfig,
        ledger: Arc<dyn Ledger>,
        identity: ServiceIdentity,
        program_id: Pubkey,
    ) -> Self {
        Self {
            config,
            ledger,
            identity,
            program_id,
        }
    }

    /// Request an airdrop when the identity holds less than the configured amount
    ///
    /// Returns the balance afterwards.
    pub async fn ensure_funded(&self) -> Result<u64, ContextError> {
        let target = self.config.airdrop_lamports;
        let pubkey = self.identity.pubkey();
        let balance = self.ledger.balance(&pubkey).await?;

        if target == 0 || balance >= target {
            info!(balance, "Identity already funded");
            return Ok(balance);
        }

        info!(balance, lamports = target, "Requesting airdrop");
        let signature = self.ledger.request_funding(&pubkey, target).await?;

        let timeout = self.config.confirm_timeout();
        tokio::time::timeout(
            timeout,
            wait_for_commit(self.ledger.as_ref(), &signature, self.config.poll_interval()),
        )
        .await
        .map_err(|_| ContextError::FundingTimeout {
            lamports: target,
            after: timeout,
        })??;

        let balance = self.ledger.balance(&pubkey).await?;
        info!(balance, signature = %signature, "Airdrop confirmed");
        Ok(balance)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn ledger(&self) -> &dyn Ledger {
        self.ledger.as_ref()
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// Called once the server has stopped accepting requests
    pub fn shutdown(&self) {
        info!(identity = %self.identity.pubkey(), "Service context closed");
    }
}
