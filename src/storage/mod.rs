//! Metadata index: what content exists, its descriptive attributes, and the
//! peer registrations recorded against it.
//!
//! Two backends share one logical schema. Callers hold an
//! `Arc<dyn MetadataIndex>` and never learn which one is active.

pub mod db;
mod error;
mod files;
pub mod models;
mod sqlite;
mod tables;

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};

pub use db::RedbIndex;
pub use error::IndexError;
pub use sqlite::SqliteIndex;
pub use tables::*;

use crate::config::IndexBackend;
use models::{FileRecord, IndexStats, PeerUpdate, SearchPage};

/// Hard cap on the page size of `search`, whatever the caller asks for.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Window within which a peer registration counts as recent.
pub const RECENT_PEER_WINDOW_SECS: i64 = 60 * 60;

pub trait MetadataIndex: Send + Sync {
    /// Insert a new record. Fails with `IndexError::Conflict` if the hash is
    /// already present, active or not.
    fn insert(&self, record: &FileRecord) -> Result<(), IndexError>;

    /// Look up an active record by hash.
    fn lookup(&self, hash: &str) -> Result<Option<FileRecord>, IndexError>;

    /// Case-insensitive substring search over name, description and tags,
    /// newest first. `limit` is clamped to `MAX_PAGE_SIZE`.
    fn search(&self, query: &str, limit: u32, offset: u32) -> Result<SearchPage, IndexError>;

    /// Atomically bump the download counter. Unknown hashes are a no-op.
    fn increment_download_count(&self, hash: &str) -> Result<(), IndexError>;

    /// Aggregates over active records; recent peers are counted relative to `now`.
    fn aggregate_stats(&self, now: DateTime<Utc>) -> Result<IndexStats, IndexError>;

    /// Insert or update the registration keyed by (hash, address).
    fn upsert_peer(&self, update: &PeerUpdate) -> Result<(), IndexError>;

    /// Number of registrations recorded for a hash.
    fn count_peers(&self, hash: &str) -> Result<u64, IndexError>;

    /// Flip the soft-delete flag. Returns false if no record has this hash.
    fn set_active(&self, hash: &str, active: bool) -> Result<bool, IndexError>;
}

/// Open the configured backend under `data_dir`.
pub fn open_index<P: AsRef<Path>>(
    backend: IndexBackend,
    data_dir: P,
) -> Result<Arc<dyn MetadataIndex>, IndexError> {
    let index: Arc<dyn MetadataIndex> = match backend {
        IndexBackend::Redb => Arc::new(RedbIndex::open(data_dir)?),
        IndexBackend::Sqlite => Arc::new(SqliteIndex::open(data_dir)?),
    };
    Ok(index)
}

pub(crate) fn recent_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - chrono::Duration::seconds(RECENT_PEER_WINDOW_SECS)
}
