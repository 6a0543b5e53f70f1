//! bitswap-depot - content-addressed file depot with a metadata index
//!
//! This crate provides upload, retrieval and catalog services with:
//! - Content-addressed local storage keyed by SHA-256, deduplicated by content
//! - A metadata index with swappable backends (SQLite, redb)
//! - Peer registrations recorded per (hash, address) on upload and download
//! - REST API with multipart upload support

pub mod api;
pub mod config;
pub mod content_store;
pub mod services;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use config::Config;
use content_store::ContentStore;
use storage::MetadataIndex;

/// Shared application state, constructed once at startup and handed to every request.
pub struct AppState {
    pub config: Config,
    pub index: Arc<dyn MetadataIndex>,
    pub content: Arc<dyn ContentStore>,
}
