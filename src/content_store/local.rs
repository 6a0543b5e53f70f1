use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::{
    content_hash, is_content_hash, ContentStore, ContentStoreError, ObjectReader, StoredObject,
};

/// Staging directory for in-flight writes, relative to the store root.
const TMP_DIR: &str = ".tmp";

/// File name of every object inside its hash directory.
const OBJECT_FILE: &str = "data";

/// Filesystem content store. Objects live at `<root>/<hash>/data`, so equal
/// bytes always land on the same path. The root is created on first write.
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn object_path(&self, hash: &str) -> PathBuf {
        self.base_path.join(hash).join(OBJECT_FILE)
    }

    /// Path of the stored object for a hash, if there is one.
    async fn find_object(&self, hash: &str) -> Result<Option<PathBuf>, std::io::Error> {
        if !is_content_hash(hash) {
            return Ok(None);
        }

        let path = self.object_path(hash);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(path)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write_staged(&self, data: &[u8]) -> Result<PathBuf, std::io::Error> {
        let tmp_dir = self.base_path.join(TMP_DIR);
        tokio::fs::create_dir_all(&tmp_dir).await?;

        let tmp_path = tmp_dir.join(uuid::Uuid::new_v4().to_string());
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        Ok(tmp_path)
    }
}

#[async_trait]
impl ContentStore for LocalStore {
    async fn put(&self, data: Bytes) -> Result<StoredObject, ContentStoreError> {
        let hash = content_hash(&data);
        let size = data.len() as u64;
        let path = format!("{hash}/{OBJECT_FILE}");

        if self.find_object(&hash).await?.is_some() {
            return Ok(StoredObject {
                hash,
                path,
                size,
                created: false,
            });
        }

        let tmp_path = self.write_staged(&data).await?;

        // Concurrent writers of the same bytes rename onto the same path;
        // the last rename wins with identical content.
        let dir = self.base_path.join(&hash);
        let moved = match tokio::fs::create_dir_all(&dir).await {
            Ok(()) => tokio::fs::rename(&tmp_path, dir.join(OBJECT_FILE)).await,
            Err(e) => Err(e),
        };

        if let Err(e) = moved {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        tracing::debug!(hash = %hash, size, "Stored new object");

        Ok(StoredObject {
            hash,
            path,
            size,
            created: true,
        })
    }

    async fn get(&self, hash: &str) -> Result<ObjectReader, ContentStoreError> {
        let path = self
            .find_object(hash)
            .await?
            .ok_or_else(|| ContentStoreError::NotFound(hash.to_string()))?;

        let file = tokio::fs::File::open(&path).await?;
        let len = file.metadata().await?.len();
        Ok(ObjectReader {
            len,
            reader: Box::new(file),
        })
    }

    async fn exists(&self, hash: &str) -> Result<bool, ContentStoreError> {
        Ok(self.find_object(hash).await?.is_some())
    }
}
