//! Document hash server

use std::net::SocketAddr;
use std::sync::Arc;

use docanchor_core::ServiceConfig;
use docanchor_store::{
    load_program_id, InMemoryLedger, Ledger, RecordStore, ServiceContext, SolanaRpcLedger,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;

use crate::error::{Result, ServerError};
use crate::routes::create_router;
use crate::state::{AppState, SharedState};

/// Which ledger backs the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedgerKind {
    /// Solana cluster over JSON-RPC
    #[default]
    Rpc,
    /// In-process ledger; records are lost on exit
    Memory,
}

pub struct DocAnchorServer {
    state: SharedState,
    addr: SocketAddr,
}

impl DocAnchorServer {
    pub fn new(state: SharedState, addr: SocketAddr) -> Self {
        Self { state, addr }
    }

    /// Serve until ctrl-c
    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves, then release the service context
    pub async fn run_until(
        self,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let router = create_router(self.state.clone());

        tracing::info!("Starting document hash server on {}", self.addr);

        let listener = TcpListener::bind(self.addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        self.state.store.context().shutdown();
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the server state for testing
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Builder for DocAnchorServer
pub struct ServerBuilder {
    config: ServiceConfig,
    ledger_kind: LedgerKind,
    ledger: Option<Arc<dyn Ledger>>,
    metrics: Option<PrometheusHandle>,
}

impl ServerBuilder {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            ledger_kind: LedgerKind::default(),
            ledger: None,
            metrics: None,
        }
    }

    pub fn addr(mut self, addr: SocketAddr) -> Self {
        self.config.host = addr.ip().to_string();
        self.config.port = addr.port();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn ledger_kind(mut self, kind: LedgerKind) -> Self {
        self.ledger_kind = kind;
        self
    }

    /// Use an already constructed ledger client
    pub fn ledger(mut self, ledger: Arc<dyn Ledger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    fn build_ledger(&self) -> Result<Arc<dyn Ledger>> {
        if let Some(ledger) = &self.ledger {
            return Ok(ledger.clone());
        }

        match self.ledger_kind {
            LedgerKind::Rpc => {
                let ledger = SolanaRpcLedger::new(&self.config.rpc_url, &self.config.commitment)
                    .map_err(|e| ServerError::Internal(e.to_string()))?;
                Ok(Arc::new(ledger))
            }
            LedgerKind::Memory => {
                let program_id = load_program_id(&self.config.program_keypair)?;
                tracing::warn!("Using in-memory ledger; nothing is persisted");
                Ok(Arc::new(InMemoryLedger::new(program_id)))
            }
        }
    }

    /// Initialize the service context (identity, program id, funding)
    pub async fn build(self) -> Result<DocAnchorServer> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| ServerError::Internal(format!("invalid bind address: {}", e)))?;

        let ledger = self.build_ledger()?;
        let context = ServiceContext::init(self.config, ledger).await?;

        let mut state = AppState::new(RecordStore::new(Arc::new(context)));
        if let Some(handle) = self.metrics {
            state = state.with_metrics(handle);
        }

        Ok(DocAnchorServer::new(Arc::new(state), addr))
    }
}
