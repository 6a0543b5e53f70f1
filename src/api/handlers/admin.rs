use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::{ApiError, Success};
use crate::services::catalog;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct DeactivateResponse {
    pub hash: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<Success<HealthResponse>> {
    Success::json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Soft-delete a record. The stored bytes stay on disk.
pub async fn deactivate_file(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> Result<Json<Success<DeactivateResponse>>, ApiError> {
    catalog::deactivate(&state, &hash)?;
    Ok(Success::json(DeactivateResponse { hash }))
}
