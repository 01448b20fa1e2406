//! HTTP routes

use std::time::Instant;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use docanchor_core::RecordKey;
use docanchor_store::FetchError;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::{Result, ServerError};
use crate::metrics::{self, OP_FETCH, OP_STORE};
use crate::state::SharedState;

pub const STATUS_OK: &str = "OK";
pub const STATUS_ERROR: &str = "Error";

/// Store request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRequest {
    pub hospital_id: i64,
    pub report_id: i64,
    pub document_hash: String,
}

/// Store response: `{"status": "OK"}` or `{"status": "Error", "reason": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StoreResponse {
    pub fn ok() -> Self {
        Self {
            status: STATUS_OK.to_string(),
            reason: None,
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            reason: Some(reason.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Fetch request, as JSON body or query string
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    pub hospital_id: i64,
    pub report_id: i64,
}

/// Fetch response; `documentHash` is empty when nothing could be read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    pub hospital_id: i64,
    pub report_id: i64,
    pub document_hash: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub identity: String,
    pub program_id: String,
    pub slot_capacity: usize,
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let context = state.store.context();
    Json(HealthResponse {
        status: "ok".to_string(),
        identity: context.identity().pubkey().to_string(),
        program_id: context.program_id().to_string(),
        slot_capacity: state.store.codec().capacity(),
    })
}

/// Prometheus exposition
async fn metrics_text(State(state): State<SharedState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

/// Store a document hash
async fn store(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<StoreRequest>, JsonRejection>,
) -> Result<Json<StoreResponse>> {
    let Json(req) = payload.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    let key = RecordKey::new(req.hospital_id, req.report_id);

    let started = Instant::now();
    let result = {
        let _in_flight = metrics::InFlight::start(OP_STORE);
        state.store.store(key, &req.document_hash).await
    };

    match result {
        Ok(receipt) => {
            tracing::info!(key = %key, address = %receipt.address, "Store request committed");
            metrics::record_request(OP_STORE, metrics::OUTCOME_OK, started.elapsed());
            Ok(Json(StoreResponse::ok()))
        }
        Err(e) => {
            let outcome = if e.is_invalid_input() {
                metrics::OUTCOME_CLIENT_ERROR
            } else {
                metrics::OUTCOME_SERVER_ERROR
            };
            tracing::warn!(key = %key, error = %e, "Store request failed");
            metrics::record_request(OP_STORE, outcome, started.elapsed());
            Err(e.into())
        }
    }
}

/// Fetch a document hash; failures collapse onto an empty `documentHash`
async fn fetch_record(state: &SharedState, req: FetchRequest) -> Json<FetchResponse> {
    let key = RecordKey::new(req.hospital_id, req.report_id);

    let started = Instant::now();
    let result = {
        let _in_flight = metrics::InFlight::start(OP_FETCH);
        state.store.fetch(key).await
    };

    let document_hash = match result {
        Ok(record) => {
            metrics::record_request(OP_FETCH, metrics::OUTCOME_OK, started.elapsed());
            record.document_hash
        }
        Err(FetchError::NotFound(address)) => {
            tracing::debug!(key = %key, address = %address, "No record for key");
            metrics::record_request(OP_FETCH, metrics::OUTCOME_NOT_FOUND, started.elapsed());
            String::new()
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Fetch request failed");
            metrics::record_request(OP_FETCH, metrics::OUTCOME_SERVER_ERROR, started.elapsed());
            String::new()
        }
    };

    Json(FetchResponse {
        hospital_id: req.hospital_id,
        report_id: req.report_id,
        document_hash,
    })
}

async fn fetch(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<FetchRequest>, JsonRejection>,
) -> Result<Json<FetchResponse>> {
    let Json(req) = payload.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    Ok(fetch_record(&state, req).await)
}

async fn fetch_query(
    State(state): State<SharedState>,
    query: std::result::Result<Query<FetchRequest>, QueryRejection>,
) -> Result<Json<FetchResponse>> {
    let Query(req) = query.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    Ok(fetch_record(&state, req).await)
}

/// Create the router with all routes
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .route("/store", post(store))
        .route("/fetch", get(fetch_query).post(fetch))
        .route("/addHashToBlockchain", post(store))
        .route("/getDocumentHash", post(fetch))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
