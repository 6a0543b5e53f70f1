use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::FileResponse;
use crate::api::response::{ApiError, AppQuery, Success};
use crate::services::catalog::{self, CatalogStats};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CatalogParams {
    #[serde(default = "default_action")]
    pub action: String,
    #[serde(default)]
    pub search: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_action() -> String {
    "list".to_string()
}

fn default_limit() -> u32 {
    50
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub files: Vec<FileResponse>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsBody {
    pub file_count: u64,
    pub total_bytes: u64,
    pub distinct_recent_peers: u64,
    pub total_downloads: u64,
    pub avg_download_speed: u64,
    pub avg_upload_speed: u64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: StatsBody,
}

impl From<CatalogStats> for StatsBody {
    fn from(s: CatalogStats) -> Self {
        StatsBody {
            file_count: s.file_count,
            total_bytes: s.total_bytes,
            distinct_recent_peers: s.distinct_recent_peers,
            total_downloads: s.total_downloads,
            avg_download_speed: s.avg_download_speed,
            avg_upload_speed: s.avg_upload_speed,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn catalog(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<CatalogParams>,
) -> Result<Response, ApiError> {
    match params.action.as_str() {
        "list" => {
            let page = catalog::list(&state, &params.search, params.limit, params.offset)?;
            Ok(Success::json(ListResponse {
                files: page.entries.iter().map(FileResponse::from).collect(),
                total: page.total,
                limit: page.limit,
                offset: page.offset,
            })
            .into_response())
        }
        "stats" => {
            let stats = catalog::stats(&state)?;
            Ok(Success::json(StatsResponse {
                stats: stats.into(),
            })
            .into_response())
        }
        _ => Err(ApiError::bad_request("Invalid action")),
    }
}
