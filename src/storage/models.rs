use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Port recorded for every peer registration. Clients never report their own.
pub const PEER_PORT: u16 = 8080;

/// One record per distinct content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    // Identity and storage
    pub hash: String,
    pub original_name: String,
    pub storage_path: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub upload_time: DateTime<Utc>,

    // Counters and lifecycle
    pub download_count: u64,
    pub is_active: bool,

    // Submitter-provided metadata (all optional)
    #[serde(default)]
    pub uploader_address: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
}

impl FileRecord {
    /// Split the raw comma-separated tag string into trimmed, non-empty tags.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .map(|t| {
                t.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Lowercased name, description and tags, joined by a unit separator so
    /// a match never spans two fields. Both index backends search this text.
    pub(crate) fn search_text(&self) -> String {
        [
            Some(self.original_name.as_str()),
            self.description.as_deref(),
            self.tags.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("\u{1f}")
    }

    /// Case-insensitive substring match over name, description and tags.
    /// The needle must already be lowercased.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        needle.is_empty() || self.search_text().contains(needle)
    }
}

/// A metadata-only record of an address that uploaded or downloaded a hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerRegistration {
    pub hash: String,
    pub address: String,
    pub port: u16,
    pub last_seen: DateTime<Utc>,
    /// Placeholder: the transferred size, not a measured rate.
    pub upload_speed: u64,
    /// Placeholder: the transferred size, not a measured rate.
    pub download_speed: u64,
}

/// Which side of a transfer a registration records, with its speed hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerActivity {
    Upload(u64),
    Download(u64),
}

/// Input to `MetadataIndex::upsert_peer`.
#[derive(Debug, Clone)]
pub struct PeerUpdate {
    pub hash: String,
    pub address: String,
    pub port: u16,
    pub activity: PeerActivity,
    pub seen_at: DateTime<Utc>,
}

impl PeerRegistration {
    /// Apply an update in place: refresh `last_seen` and `port`, overwrite
    /// only the speed field the activity names.
    pub(crate) fn apply(&mut self, update: &PeerUpdate) {
        self.port = update.port;
        self.last_seen = update.seen_at;
        match update.activity {
            PeerActivity::Upload(speed) => self.upload_speed = speed,
            PeerActivity::Download(speed) => self.download_speed = speed,
        }
    }

    pub(crate) fn from_update(update: &PeerUpdate) -> Self {
        let mut peer = PeerRegistration {
            hash: update.hash.clone(),
            address: update.address.clone(),
            port: update.port,
            last_seen: update.seen_at,
            upload_speed: 0,
            download_speed: 0,
        };
        peer.apply(update);
        peer
    }
}

/// One page of search results plus the total number of matches.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub records: Vec<FileRecord>,
    pub total: u64,
}

/// Aggregates over active records and recent peer registrations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub file_count: u64,
    pub total_bytes: u64,
    pub distinct_recent_peers: u64,
    pub total_downloads: u64,
}
