//! Server state shared by all handlers

use std::sync::Arc;

use docanchor_store::RecordStore;
use metrics_exporter_prometheus::PrometheusHandle;

pub struct AppState {
    pub store: RecordStore,
    /// Present when a Prometheus recorder was installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(store: RecordStore) -> Self {
        Self {
            store,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Shared server state type
pub type SharedState = Arc<AppState>;

pub fn create_shared_state(store: RecordStore) -> SharedState {
    Arc::new(AppState::new(store))
}
