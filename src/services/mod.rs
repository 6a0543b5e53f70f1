//! Request-level operations over the content store and metadata index.
//!
//! Each call is an independent pass against the shared `AppState`; nothing
//! here holds state between requests.

pub mod catalog;
pub mod ingest;
pub mod links;
pub mod retrieval;

use thiserror::Error;

use crate::content_store::ContentStoreError;
use crate::storage::IndexError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("Storage error: {0}")]
    Storage(#[from] ContentStoreError),
    #[error("Database error: {0}")]
    Database(#[from] IndexError),
}

impl ServiceError {
    pub fn not_found() -> Self {
        ServiceError::NotFound("File not found".to_string())
    }
}
