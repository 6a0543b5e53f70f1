use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::{ApiError, ClientAddr, Success};
use crate::services::ingest::{ingest, IngestOutcome, IngestRequest};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub message: String,
    pub hash: String,
    pub name: String,
    pub size: u64,
    pub retrieval_uri: String,
    pub magnet_uri: String,
    pub share_uri: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub existing: bool,
}

impl From<IngestOutcome> for IngestResponse {
    fn from(outcome: IngestOutcome) -> Self {
        let message = if outcome.existing {
            "File already exists"
        } else {
            "File uploaded successfully"
        };
        IngestResponse {
            message: message.to_string(),
            hash: outcome.hash,
            name: outcome.name,
            size: outcome.size,
            retrieval_uri: outcome.retrieval_uri,
            magnet_uri: outcome.magnet_uri,
            share_uri: outcome.share_uri,
            existing: outcome.existing,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn ingest_file(
    State(state): State<Arc<AppState>>,
    ClientAddr(submitter): ClientAddr,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Success<IngestResponse>>, ApiError> {
    let mut file_data: Option<Bytes> = None;
    let mut file_name: Option<String> = None;
    let mut file_content_type: Option<String> = None;
    let mut description: Option<String> = None;
    let mut tags: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Fail(e.status(), format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                file_content_type = field.content_type().map(|s| s.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Fail(e.status(), format!("Failed to read file: {e}")))?;

                file_data = Some(data);
            }
            "description" => {
                description = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid description: {e}")))?,
                );
            }
            "tags" => {
                tags = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid tags: {e}")))?,
                );
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let data = file_data.ok_or_else(|| ApiError::bad_request("file field is required"))?;

    let outcome = ingest(
        &state,
        IngestRequest {
            data,
            file_name,
            content_type: file_content_type,
            description,
            tags,
            submitter,
            base_url: base_url(&state, &headers),
        },
    )
    .await?;

    Ok(Success::json(outcome.into()))
}

// ============================================================================
// Helpers
// ============================================================================

/// Configured public URL, else `http://<Host>` from the request.
fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(ref url) = state.config.public_base_url {
        return url.clone();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or(state.config.node.bind_address.as_str());
    format!("http://{host}")
}
