use super::ProxyState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    upstream_url: String,
    cache_dir: Option<String>,
    uptime_seconds: u64,
}

pub async fn health_check(State(state): State<Arc<ProxyState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        upstream_url: state.upstream_url.clone(),
        cache_dir: state.cache_dir.as_ref().map(|dir| dir.display().to_string()),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}
