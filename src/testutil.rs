//! Shared test helpers for in-crate service and handler tests.

use std::sync::Arc;

use crate::config::{Config, IndexBackend, NodeConfig, StorageConfig};
use crate::content_store::LocalStore;
use crate::storage::open_index;
use crate::AppState;

/// Every index backend, for service tests that must behave the same on each.
pub const BACKENDS: [IndexBackend; 2] = [IndexBackend::Sqlite, IndexBackend::Redb];

/// Create a test AppState with a temporary index and local content store.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    test_state_with(temp_dir, IndexBackend::Sqlite)
}

pub fn test_state_with(temp_dir: &tempfile::TempDir, backend: IndexBackend) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let content_dir = temp_dir.path().join("uploads");

    let config = Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        storage: StorageConfig {
            index_backend: backend,
            content_dir: content_dir.to_string_lossy().to_string(),
        },
        public_base_url: Some("http://depot.test".to_string()),
        allow_deactivate: true,
        max_upload_size: 1024 * 1024, // 1MB for tests
    };

    let index = open_index(backend, &data_dir).expect("Failed to open test index");
    let content = LocalStore::new(&content_dir);

    Arc::new(AppState {
        config,
        index,
        content: Arc::new(content),
    })
}
