//! docanchor-store: ledger-backed record store
//!
//! - [`Ledger`]: the operations the store needs from a ledger client
//! - [`SolanaRpcLedger`]: JSON-RPC implementation against a Solana cluster
//! - [`InMemoryLedger`]: in-process ledger for tests and local development
//! - [`ServiceContext`]: operating identity, program id and ledger handle
//! - [`RecordStore`]: store/fetch facade over a context
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use docanchor_core::{RecordKey, ServiceConfig};
//! use docanchor_store::{RecordStore, ServiceContext, SolanaRpcLedger};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServiceConfig::new("program-keypair.json");
//!     let ledger = Arc::new(SolanaRpcLedger::new(&config.rpc_url, &config.commitment)?);
//!     let context = ServiceContext::init(config, ledger).await?;
//!     let store = RecordStore::new(Arc::new(context));
//!
//!     store.store(RecordKey::new(1, 2), "abc").await?;
//!     let record = store.fetch(RecordKey::new(1, 2)).await?;
//!     assert_eq!(record.document_hash, "abc");
//!     Ok(())
//! }
//! ```

mod context;
mod error;
mod identity;
mod ledger;
mod locks;
mod memory;
mod rpc;
mod store;

pub use context::ServiceContext;
pub use error::{ContextError, FetchError, LedgerError, StoreError};
pub use identity::{load_program_id, IdentitySource, ServiceIdentity};
pub use ledger::{wait_for_commit, write_instruction, Ledger, TxStatus};
pub use locks::{KeyGuard, KeyLocks};
pub use memory::InMemoryLedger;
pub use rpc::SolanaRpcLedger;
pub use store::{RecordStore, StoreReceipt};
