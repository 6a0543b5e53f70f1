mod admin;
mod catalog;
mod ingest;
mod retrieve;

use serde::Serialize;

use crate::services::catalog::{CatalogEntry, FileStatus};
use crate::services::retrieval::FileInfo;
use crate::storage::models::FileRecord;

pub use admin::{deactivate_file, health};
pub use catalog::catalog;
pub use ingest::ingest_file;
pub use retrieve::retrieve;

/// Public view of a file record, shared by the describe and list routes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub hash: String,
    pub name: String,
    pub size: u64,
    pub mime_type: Option<String>,
    pub upload_time: String,
    pub download_count: u64,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub peer_count: u64,
    pub retrieval_uri: String,
    pub magnet_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<FileStatus>,
}

fn file_to_response(
    file: &FileRecord,
    peer_count: u64,
    retrieval_uri: &str,
    magnet_uri: &str,
    status: Option<FileStatus>,
) -> FileResponse {
    FileResponse {
        hash: file.hash.clone(),
        name: file.original_name.clone(),
        size: file.size_bytes,
        mime_type: file.mime_type.clone(),
        upload_time: file.upload_time.to_rfc3339(),
        download_count: file.download_count,
        description: file.description.clone(),
        tags: file.tag_list(),
        peer_count,
        retrieval_uri: retrieval_uri.to_string(),
        magnet_uri: magnet_uri.to_string(),
        status,
    }
}

impl From<&FileInfo> for FileResponse {
    fn from(info: &FileInfo) -> Self {
        file_to_response(
            &info.record,
            info.peer_count,
            &info.retrieval_uri,
            &info.magnet_uri,
            None,
        )
    }
}

impl From<&CatalogEntry> for FileResponse {
    fn from(entry: &CatalogEntry) -> Self {
        file_to_response(
            &entry.record,
            entry.peer_count,
            &entry.retrieval_uri,
            &entry.magnet_uri,
            Some(entry.status),
        )
    }
}
