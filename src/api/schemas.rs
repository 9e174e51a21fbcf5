//! Schema endpoints
//!
//! - GET /schemas/ids/{id} - Fetch a schema document by id
//! - POST /subjects/{subject}/versions - Register a schema under a subject

use super::ProxyState;
use crate::error::{RegistryError, Result};
use crate::upstream::SchemaId;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Serialize)]
pub struct SchemaResponse {
    pub schema: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub schema: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub id: SchemaId,
}

pub async fn fetch_schema(
    State(state): State<Arc<ProxyState>>,
    Path(id): Path<String>,
) -> Result<Json<SchemaResponse>> {
    let id: SchemaId = id.parse().map_err(|_| RegistryError::InvalidRequest {
        message: format!("Invalid schema id: {}", id),
    })?;

    let schema = state.registry.fetch(id).await?;
    debug!("Served schema {}", id);

    Ok(Json(SchemaResponse { schema }))
}

pub async fn register_schema(
    State(state): State<Arc<ProxyState>>,
    Path(subject): Path<String>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    if request.schema.trim().is_empty() {
        return Err(RegistryError::InvalidRequest {
            message: "schema must not be empty".to_string(),
        });
    }

    let id = state.registry.register(&subject, &request.schema).await?;
    debug!("Registered schema under '{}' as {}", subject, id);

    Ok(Json(RegisterResponse { id }))
}
