//! HTTP API server for tablecall.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(unreachable_pub, reason = "pub items are re-exported")]
#![allow(clippy::absolute_paths, reason = "Explicit paths for clarity")]
#![allow(missing_debug_implementations, reason = "Internal types")]
#![allow(clippy::missing_docs_in_private_items, reason = "Internal crate")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]
#![allow(clippy::single_call_fn, reason = "Helper functions improve readability")]

pub mod api_error;
mod handlers;
mod query_types;
mod response_types;

use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use tablecall_channel::BroadcastChannel;
use tablecall_service::{IngestService, ResolutionService};
use tablecall_storage::CallStore;

pub use response_types::VersionResponse;

/// Shared application state for all HTTP handlers.
///
/// Wrapped in `Arc` for thread-safe sharing across handlers.
pub struct AppState {
    /// Gateway admitting new calls
    pub ingest: Arc<IngestService>,
    /// Gateway moving calls forward
    pub resolution: Arc<ResolutionService>,
    /// Durable store, for snapshots and the change stream
    pub store: Arc<dyn CallStore>,
    /// Broadcast channel, for the event stream
    pub channel: Arc<dyn BroadcastChannel>,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<dyn CallStore>,
        channel: Arc<dyn BroadcastChannel>,
        await_durable_write: bool,
    ) -> Self {
        let ingest = IngestService::new(Arc::clone(&store), Arc::clone(&channel))
            .with_await_durable_write(await_durable_write);
        let resolution = ResolutionService::new(Arc::clone(&store), Arc::clone(&channel))
            .with_in_flight_writes(ingest.in_flight_writes());
        Self { ingest: Arc::new(ingest), resolution: Arc::new(resolution), store, channel }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/version", get(version))
        .route("/calls", post(handlers::calls::create_call))
        .route("/calls/resolve", post(handlers::calls::resolve_calls))
        .route("/calls/active", get(handlers::calls::active_calls))
        .route("/calls/events", get(handlers::events::broadcast_events))
        .route("/calls/changes", get(handlers::events::change_events))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse { version: env!("CARGO_PKG_VERSION") })
}
