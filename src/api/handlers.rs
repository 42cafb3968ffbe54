//! Request Handlers
//!
//! Which handlers have a backing component depends on the service mode the
//! process was started in.

use super::{errors::ApiError, middleware::RequestId};
use crate::{
    errors::RandomError,
    games::{SettlementRequest, SettlementResponse, SettlementService},
    random::{entropy::RngQuery, entropy::RngReply, FairRandomSource},
    table::{RoundManager, RoundSnapshot},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Largest batch served by `GET /rng`
pub const MAX_RNG_BATCH: usize = 65_536;

/// What this process serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceMode {
    /// WebSocket table with its round loop
    Table,
    /// `POST /settle`
    Settlement,
    /// `GET /rng`
    Rng,
}

impl fmt::Display for ServiceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceMode::Table => write!(f, "table"),
            ServiceMode::Settlement => write!(f, "settlement"),
            ServiceMode::Rng => write!(f, "rng"),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub mode: ServiceMode,
    pub version: String,
    pub table: Option<Arc<RoundManager>>,
    pub settlement: Option<Arc<dyn SettlementService>>,
    pub rng: Option<Arc<Mutex<FairRandomSource>>>,
}

impl AppState {
    fn empty(mode: ServiceMode) -> Self {
        Self {
            mode,
            version: env!("CARGO_PKG_VERSION").to_string(),
            table: None,
            settlement: None,
            rng: None,
        }
    }

    pub fn for_table(table: Arc<RoundManager>) -> Self {
        Self {
            table: Some(table),
            ..Self::empty(ServiceMode::Table)
        }
    }

    pub fn for_settlement(settlement: Arc<dyn SettlementService>) -> Self {
        Self {
            settlement: Some(settlement),
            ..Self::empty(ServiceMode::Settlement)
        }
    }

    pub fn for_rng(source: FairRandomSource) -> Self {
        Self {
            rng: Some(Arc::new(Mutex::new(source))),
            ..Self::empty(ServiceMode::Rng)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub mode: ServiceMode,
    pub version: String,
}

/// Health check handler
/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
        mode: state.mode,
        version: state.version.clone(),
    })
}

/// Table state
/// GET /state
pub async fn state_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<RoundSnapshot>, ApiError> {
    let table = state.table.as_ref().ok_or_else(|| {
        ApiError::not_found(request_id.0.clone(), format!("no table in {} mode", state.mode))
    })?;

    Ok(Json(table.snapshot().await))
}

/// Settle a round for a remote table
/// POST /settle
pub async fn settle_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<SettlementRequest>,
) -> Result<Json<SettlementResponse>, ApiError> {
    let settlement = state.settlement.as_ref().ok_or_else(|| {
        ApiError::not_found(request_id.0.clone(), format!("settlement is not served in {} mode", state.mode))
    })?;

    settlement
        .settle(request)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_settlement(request_id.0, e))
}

/// Raw 32-bit random values
/// GET /rng?nums={n}
pub async fn rng_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<RngQuery>,
) -> Result<Json<RngReply>, ApiError> {
    let source = state.rng.clone().ok_or_else(|| {
        ApiError::not_found(request_id.0.clone(), format!("rng is not served in {} mode", state.mode))
    })?;

    let nums = query.nums.unwrap_or(1).max(1);
    if nums > MAX_RNG_BATCH {
        return Err(ApiError::bad_request(
            request_id.0,
            format!("nums must be at most {}", MAX_RNG_BATCH),
        ));
    }

    let rngs = tokio::task::spawn_blocking(move || {
        let mut source = source
            .lock()
            .map_err(|_| RandomError::SourceUnavailable("random source lock poisoned".to_string()))?;
        source.raw_batch(nums)
    })
    .await
    .map_err(|e| ApiError::internal_error(request_id.0.clone(), format!("rng task failed: {}", e)))?
    .map_err(|e| ApiError::from_random(request_id.0.clone(), e))?;

    Ok(Json(RngReply { rngs }))
}
