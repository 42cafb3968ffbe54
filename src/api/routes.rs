//! Route Definitions
//!
//! Maps URLs to handlers with type-safe routing.

use super::{handlers::*, websocket::websocket_handler};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Table mode
        .route("/state", get(state_handler))
        .route("/ws", get(websocket_handler))
        // Settlement mode
        .route("/settle", post(settle_handler))
        // RNG mode
        .route("/rng", get(rng_handler))
        .with_state(state)
}
