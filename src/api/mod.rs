//! Proxy HTTP API
//!
//! Serves the read and register endpoints of the Confluent REST API from the
//! schema cache, so clients can point at the proxy instead of the registry.

mod health;
mod schemas;

pub use health::health_check;
pub use schemas::{fetch_schema, register_schema};

use crate::upstream::SchemaRegistry;
use axum::{
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Shared state for all proxy endpoints
pub struct ProxyState {
    pub registry: Arc<dyn SchemaRegistry>,
    pub upstream_url: String,
    pub cache_dir: Option<PathBuf>,
    pub started_at: Instant,
}

pub fn router(state: Arc<ProxyState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/schemas/ids/:id", get(fetch_schema))
        .route("/subjects/:subject/versions", post(register_schema))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
