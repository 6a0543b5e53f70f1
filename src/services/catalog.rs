use chrono::Utc;
use serde::Serialize;

use super::links::{magnet_uri, retrieval_uri};
use super::ServiceError;
use crate::storage::models::FileRecord;
use crate::storage::MAX_PAGE_SIZE;
use crate::AppState;

/// Placeholder averages reported by `stats`. Not measured.
pub const AVG_DOWNLOAD_SPEED: u64 = 2_400_000;
pub const AVG_UPLOAD_SPEED: u64 = 847_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Seeding,
    Completed,
}

impl FileStatus {
    pub fn from_peer_count(peer_count: u64) -> Self {
        if peer_count > 0 {
            FileStatus::Seeding
        } else {
            FileStatus::Completed
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub record: FileRecord,
    pub peer_count: u64,
    pub status: FileStatus,
    pub retrieval_uri: String,
    pub magnet_uri: String,
}

#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub entries: Vec<CatalogEntry>,
    pub total: u64,
    /// Effective page size after clamping.
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogStats {
    pub file_count: u64,
    pub total_bytes: u64,
    pub distinct_recent_peers: u64,
    pub total_downloads: u64,
    pub avg_download_speed: u64,
    pub avg_upload_speed: u64,
}

/// One page of active records matching `search`, newest first.
pub fn list(
    state: &AppState,
    search: &str,
    limit: u32,
    offset: u32,
) -> Result<CatalogPage, ServiceError> {
    if limit == 0 {
        return Err(ServiceError::BadRequest(
            "limit must be greater than 0".to_string(),
        ));
    }
    let limit = limit.min(MAX_PAGE_SIZE);

    let page = state.index.search(search.trim(), limit, offset)?;
    let mut entries = Vec::with_capacity(page.records.len());
    for record in page.records {
        let peer_count = state.index.count_peers(&record.hash)?;
        entries.push(CatalogEntry {
            status: FileStatus::from_peer_count(peer_count),
            retrieval_uri: retrieval_uri(&record.hash),
            magnet_uri: magnet_uri(&record.hash, &record.original_name, Some(record.size_bytes)),
            peer_count,
            record,
        });
    }

    Ok(CatalogPage {
        entries,
        total: page.total,
        limit,
        offset,
    })
}

pub fn stats(state: &AppState) -> Result<CatalogStats, ServiceError> {
    let stats = state.index.aggregate_stats(Utc::now())?;

    Ok(CatalogStats {
        file_count: stats.file_count,
        total_bytes: stats.total_bytes,
        distinct_recent_peers: stats.distinct_recent_peers,
        total_downloads: stats.total_downloads,
        avg_download_speed: AVG_DOWNLOAD_SPEED,
        avg_upload_speed: AVG_UPLOAD_SPEED,
    })
}

/// Soft-delete: hide a record from every read. The stored object is kept.
pub fn deactivate(state: &AppState, hash: &str) -> Result<(), ServiceError> {
    if state.index.lookup(hash)?.is_none() {
        return Err(ServiceError::not_found());
    }
    state.index.set_active(hash, false)?;
    tracing::info!(hash = %hash, "Deactivated file");
    Ok(())
}
