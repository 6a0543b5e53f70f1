//! Content-addressed byte storage. Objects are keyed by the SHA-256 of their
//! bytes, so identical uploads collapse into one stored object.

mod local;

pub use local::LocalStore;

use async_trait::async_trait;
use bytes::Bytes;
use ring::digest::{digest, SHA256};
use thiserror::Error;
use tokio::io::AsyncRead;

#[derive(Debug, Error)]
pub enum ContentStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
}

/// Result of a `put`: where the object lives and whether this call wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub hash: String,
    /// Path relative to the store root.
    pub path: String,
    pub size: u64,
    /// False when identical content was already present.
    pub created: bool,
}

/// An open object ready to be streamed.
pub struct ObjectReader {
    pub len: u64,
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
}

impl std::fmt::Debug for ObjectReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectReader").field("len", &self.len).finish()
    }
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `data` under its content hash. Idempotent for equal bytes.
    async fn put(&self, data: Bytes) -> Result<StoredObject, ContentStoreError>;
    async fn get(&self, hash: &str) -> Result<ObjectReader, ContentStoreError>;
    async fn exists(&self, hash: &str) -> Result<bool, ContentStoreError>;
}

/// Lowercase hex SHA-256 of `data`.
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(digest(&SHA256, data).as_ref())
}

/// True for a 64-character lowercase hex string.
pub fn is_content_hash(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Display name recorded for an upload: keep `[A-Za-z0-9._-]` and drop
/// everything else. Names that end up empty or made only of dots become `file`.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    if cleaned.chars().all(|c| c == '.') {
        "file".to_string()
    } else {
        cleaned
    }
}
