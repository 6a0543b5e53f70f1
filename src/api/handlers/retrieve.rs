use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use super::FileResponse;
use crate::api::response::{ApiError, AppQuery, ClientAddr, Success};
use crate::services::retrieval::{describe, fetch, Download};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RetrieveParams {
    #[serde(default)]
    pub hash: Option<String>,
    /// Presence alone switches to the JSON description.
    #[serde(default)]
    pub info: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DescribeResponse {
    pub file: FileResponse,
}

// ============================================================================
// Handlers
// ============================================================================

/// `GET /retrieve?hash=H` streams the bytes; `GET /retrieve?hash=H&info=1`
/// describes the record instead.
pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    ClientAddr(requester): ClientAddr,
    AppQuery(params): AppQuery<RetrieveParams>,
) -> Response {
    let hash = match params.hash.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
        Some(hash) => hash.to_string(),
        None if params.info.is_some() => {
            return ApiError::bad_request("File hash not provided").into_response()
        }
        None => {
            return ApiError::bad_request("File hash not provided")
                .bare()
                .into_response()
        }
    };

    if params.info.is_some() {
        return match describe(&state, &hash) {
            Ok(info) => Success::json(DescribeResponse {
                file: FileResponse::from(&info),
            })
            .into_response(),
            Err(e) => ApiError::from(e).into_response(),
        };
    }

    match fetch(&state, &hash, &requester).await {
        Ok(download) => stream_download(download),
        Err(e) => ApiError::from(e).bare().into_response(),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn stream_download(download: Download) -> Response {
    let Download { record, object } = download;

    let body = Body::from_stream(ReaderStream::new(object.reader));
    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        record
            .mime_type
            .as_deref()
            .and_then(|m| m.parse().ok())
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(object.len));

    if let Ok(value) = format!("attachment; filename=\"{}\"", record.original_name).parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // Counters change on every fetch, so nothing may be cached
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));

    response
}
