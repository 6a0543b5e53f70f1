use chrono::Utc;

use super::links::{magnet_uri, retrieval_uri};
use super::ServiceError;
use crate::content_store::{ContentStoreError, ObjectReader};
use crate::storage::models::{FileRecord, PeerActivity, PeerUpdate, PEER_PORT};
use crate::AppState;

/// Full descriptive payload for one record.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub record: FileRecord,
    pub peer_count: u64,
    pub retrieval_uri: String,
    pub magnet_uri: String,
}

/// A record whose bytes are open and ready to stream.
#[derive(Debug)]
pub struct Download {
    pub record: FileRecord,
    pub object: ObjectReader,
}

/// Describe an active record. Read-only.
pub fn describe(state: &AppState, hash: &str) -> Result<FileInfo, ServiceError> {
    let record = state
        .index
        .lookup(hash)?
        .ok_or_else(ServiceError::not_found)?;
    let peer_count = state.index.count_peers(hash)?;

    Ok(FileInfo {
        retrieval_uri: retrieval_uri(&record.hash),
        magnet_uri: magnet_uri(&record.hash, &record.original_name, Some(record.size_bytes)),
        peer_count,
        record,
    })
}

/// Open a record's bytes for download and record the requester.
///
/// Counters move only once the object is known to be retrievable, and
/// before any byte is streamed. A record whose object is missing from the
/// content store is reported as not found.
pub async fn fetch(
    state: &AppState,
    hash: &str,
    requester: &str,
) -> Result<Download, ServiceError> {
    let record = state
        .index
        .lookup(hash)?
        .ok_or_else(ServiceError::not_found)?;

    if !state.content.exists(hash).await? {
        tracing::warn!(hash = %hash, "Indexed file is missing from the content store");
        return Err(ServiceError::NotFound("File not found on disk".to_string()));
    }

    let object = match state.content.get(hash).await {
        Ok(object) => object,
        Err(ContentStoreError::NotFound(_)) => {
            tracing::warn!(hash = %hash, "Indexed file vanished before it could be opened");
            return Err(ServiceError::NotFound("File not found on disk".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    state.index.increment_download_count(hash)?;
    state.index.upsert_peer(&PeerUpdate {
        hash: hash.to_string(),
        address: requester.to_string(),
        port: PEER_PORT,
        activity: PeerActivity::Download(record.size_bytes),
        seen_at: Utc::now(),
    })?;

    tracing::debug!(hash = %hash, peer = %requester, "Serving download");

    Ok(Download { record, object })
}
