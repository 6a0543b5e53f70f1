use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::services::ServiceError;

// ============================================================================
// Success envelope
// ============================================================================

/// `{"success": true, ...data}`: payload fields sit next to the flag.
#[derive(Debug, Serialize, Deserialize)]
pub struct Success<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> Success<T> {
    pub fn json(data: T) -> Json<Success<T>> {
        Json(Success {
            success: true,
            data,
        })
    }
}

// ============================================================================
// Failure envelopes
// ============================================================================

/// `{"success": false, "message": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct Failure {
    pub success: bool,
    pub message: String,
}

impl Failure {
    pub fn response(
        status_code: StatusCode,
        message: impl Into<String>,
    ) -> (StatusCode, Json<Failure>) {
        (
            status_code,
            Json(Failure {
                success: false,
                message: message.into(),
            }),
        )
    }
}

/// `{"error": "..."}`, used where the success body is raw bytes rather than JSON.
#[derive(Debug, Serialize, Deserialize)]
pub struct BareError {
    pub error: String,
}

// ============================================================================
// Unified error type for handlers
// ============================================================================

/// A client failure (4xx) or a server error (5xx).
#[derive(Debug)]
pub enum ApiError {
    Fail(StatusCode, String),
    Error(StatusCode, String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Fail(code, msg) => Failure::response(code, msg).into_response(),
            ApiError::Error(code, msg) => {
                tracing::error!(status = %code, error = %msg, "Request failed");
                Failure::response(code, msg).into_response()
            }
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::BAD_REQUEST, message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::NOT_FOUND, message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::PAYLOAD_TOO_LARGE, message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Error(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    }

    /// Render as `{"error": "..."}` instead of the success/message envelope.
    pub fn bare(self) -> BareApiError {
        BareApiError(self)
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::BadRequest(msg) => ApiError::bad_request(msg),
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::PayloadTooLarge(msg) => ApiError::payload_too_large(msg),
            ServiceError::Storage(_) | ServiceError::Database(_) => {
                ApiError::internal(e.to_string())
            }
        }
    }
}

pub struct BareApiError(pub ApiError);

impl IntoResponse for BareApiError {
    fn into_response(self) -> Response {
        let (code, error) = match self.0 {
            ApiError::Fail(code, msg) => (code, msg),
            ApiError::Error(code, msg) => {
                tracing::error!(status = %code, error = %msg, "Request failed");
                (code, msg)
            }
        };
        (code, Json(BareError { error })).into_response()
    }
}

// ============================================================================
// Custom extractors
// ============================================================================

/// Drop-in replacement for `axum::extract::Query` that rejects with `ApiError`.
pub struct AppQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, ApiError> {
        let query = parts.uri.query().unwrap_or_default();
        serde_qs::from_str(query)
            .map(AppQuery)
            .map_err(|e| ApiError::bad_request(friendly_query_error(&e.to_string())))
    }
}

/// Address a request is attributed to: the first `X-Forwarded-For` entry,
/// else the socket peer IP, else `unknown`.
pub struct ClientAddr(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for ClientAddr
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let addr = forwarded
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());

        Ok(ClientAddr(addr))
    }
}

/// Translate serde/serde_qs error messages into human-friendly descriptions.
fn friendly_query_error(raw: &str) -> String {
    let cleaned = raw
        .replace("u32", "non-negative integer")
        .replace("u64", "non-negative integer")
        .replace("i32", "integer")
        .replace("i64", "integer");

    format!("Invalid query parameter: {cleaned}")
}
