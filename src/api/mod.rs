//! HTTP and WebSocket surface
//!
//! One server binary, three service modes: the live table (WebSocket
//! gateway), the settlement service and the raw RNG service.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod websocket;

pub use handlers::{AppState, ServiceMode};
pub use server::{create_app, ApiServer};
