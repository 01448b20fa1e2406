//! Prometheus metrics for the HTTP service
//!
//! Labels are operation and outcome only; record keys and hashes are never
//! used as label values.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

pub const OP_STORE: &str = "store";
pub const OP_FETCH: &str = "fetch";

pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_NOT_FOUND: &str = "not_found";
pub const OUTCOME_CLIENT_ERROR: &str = "client_error";
pub const OUTCOME_SERVER_ERROR: &str = "server_error";

pub fn record_request(op: &'static str, outcome: &'static str, duration: Duration) {
    counter!("docanchor_requests_total", "op" => op, "outcome" => outcome).increment(1);
    histogram!("docanchor_request_duration_seconds", "op" => op, "outcome" => outcome)
        .record(duration.as_secs_f64());
}

/// Counts a request as in flight until dropped, including when the handler is cancelled
#[must_use]
pub struct InFlight {
    op: &'static str,
}

impl InFlight {
    pub fn start(op: &'static str) -> Self {
        gauge!("docanchor_requests_in_flight", "op" => op).increment(1.0);
        Self { op }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        gauge!("docanchor_requests_in_flight", "op" => self.op).decrement(1.0);
    }
}

pub fn init_prometheus_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}
