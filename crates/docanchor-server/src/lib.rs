//! docanchor-server: HTTP front end for the document hash store
//!
//! Two operations over JSON:
//! - `POST /store` `{hospitalId, reportId, documentHash}` -> `{status}`
//! - `POST /fetch` `{hospitalId, reportId}` -> `{hospitalId, reportId, documentHash}`
//!
//! The routes of the first deployment (`/addHashToBlockchain`,
//! `/getDocumentHash`) are served as aliases.

pub mod error;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ServerError;
pub use routes::{create_router, FetchRequest, FetchResponse, HealthResponse, StoreRequest, StoreResponse};
pub use server::{DocAnchorServer, LedgerKind, ServerBuilder};
pub use state::{create_shared_state, AppState, SharedState};
