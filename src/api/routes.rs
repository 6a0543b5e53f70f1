use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

/// Room for multipart boundaries and the text fields around the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = (state.config.max_upload_size as usize).saturating_add(MULTIPART_OVERHEAD);

    let mut router = Router::new()
        .route(
            "/ingest",
            post(handlers::ingest_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/retrieve", get(handlers::retrieve))
        .route("/catalog", get(handlers::catalog))
        // Internal
        .route("/_internal/health", get(handlers::health));

    if state.config.allow_deactivate {
        tracing::warn!("Deactivation enabled: DELETE /files/:hash is available.");
        router = router.route("/files/:hash", delete(handlers::deactivate_file));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
