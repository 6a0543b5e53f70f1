use bytes::Bytes;
use chrono::Utc;

use super::links::{magnet_uri, retrieval_uri, share_uri};
use super::ServiceError;
use crate::content_store::{content_hash, sanitize_name};
use crate::storage::models::{FileRecord, PeerActivity, PeerUpdate, PEER_PORT};
use crate::AppState;

/// A single named payload plus optional free-text metadata.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub data: Bytes,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    /// Network address of the submitter.
    pub submitter: String,
    /// Prefix for the shareable URI.
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub hash: String,
    pub name: String,
    pub size: u64,
    pub retrieval_uri: String,
    pub magnet_uri: String,
    pub share_uri: String,
    /// True when identical content was already indexed.
    pub existing: bool,
}

/// Store a payload and index it, or report the record that already holds it.
pub async fn ingest(state: &AppState, req: IngestRequest) -> Result<IngestOutcome, ServiceError> {
    if req.data.is_empty() {
        return Err(ServiceError::BadRequest(
            "No file uploaded or file is empty".to_string(),
        ));
    }

    if req.data.len() as u64 > state.config.max_upload_size {
        return Err(ServiceError::PayloadTooLarge(format!(
            "File exceeds maximum upload size of {} bytes",
            state.config.max_upload_size
        )));
    }

    let hash = content_hash(&req.data);

    // Duplicate content leaves the existing record untouched
    if let Some(existing) = state.index.lookup(&hash)? {
        tracing::debug!(hash = %hash, "Upload matches existing record");
        return Ok(existing_outcome(&existing, &req.base_url));
    }

    let name = sanitize_name(req.file_name.as_deref().unwrap_or_default());
    let mime_type = detect_mime(req.content_type.as_deref(), req.file_name.as_deref());
    let size = req.data.len() as u64;

    // Phase 1: bytes on disk. Nothing is indexed until this succeeds.
    let stored = state.content.put(req.data).await?;

    // Phase 2: metadata record
    let record = FileRecord {
        hash: hash.clone(),
        original_name: name.clone(),
        storage_path: stored.path,
        size_bytes: size,
        mime_type: Some(mime_type),
        upload_time: Utc::now(),
        download_count: 0,
        is_active: true,
        uploader_address: Some(req.submitter.clone()),
        description: non_empty(req.description),
        tags: non_empty(req.tags),
    };

    if let Err(e) = state.index.insert(&record) {
        if e.is_conflict() {
            return recover_conflict(state, &hash, &req.base_url);
        }
        return Err(e.into());
    }

    // Phase 3: the uploader is the first peer
    state.index.upsert_peer(&PeerUpdate {
        hash: hash.clone(),
        address: req.submitter,
        port: PEER_PORT,
        activity: PeerActivity::Upload(size),
        seen_at: Utc::now(),
    })?;

    tracing::info!(hash = %hash, size, name = %name, "Ingested file");

    Ok(IngestOutcome {
        retrieval_uri: retrieval_uri(&hash),
        magnet_uri: magnet_uri(&hash, &name, Some(size)),
        share_uri: share_uri(&req.base_url, &hash),
        hash,
        name,
        size,
        existing: false,
    })
}

/// Another writer indexed this hash first, or the record was soft-deleted.
/// Either way the content is already known: report it as existing.
fn recover_conflict(
    state: &AppState,
    hash: &str,
    base_url: &str,
) -> Result<IngestOutcome, ServiceError> {
    if let Some(existing) = state.index.lookup(hash)? {
        return Ok(existing_outcome(&existing, base_url));
    }

    if state.index.set_active(hash, true)? {
        tracing::info!(hash = %hash, "Reactivated record on re-upload");
    }

    state
        .index
        .lookup(hash)?
        .map(|existing| existing_outcome(&existing, base_url))
        .ok_or_else(ServiceError::not_found)
}

fn existing_outcome(record: &FileRecord, base_url: &str) -> IngestOutcome {
    IngestOutcome {
        hash: record.hash.clone(),
        name: record.original_name.clone(),
        size: record.size_bytes,
        retrieval_uri: retrieval_uri(&record.hash),
        magnet_uri: magnet_uri(&record.hash, &record.original_name, None),
        share_uri: share_uri(base_url, &record.hash),
        existing: true,
    }
}

/// MIME type from the multipart Content-Type, else guessed from the file
/// name, else `application/octet-stream`.
fn detect_mime(content_type: Option<&str>, file_name: Option<&str>) -> String {
    content_type
        .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
        .map(str::to_string)
        .or_else(|| {
            file_name
                .and_then(|n| mime_guess::from_path(n).first())
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
