//! HTTP surface: router, handlers and error mapping.

mod artifacts;
mod downloads;
pub mod error;
mod middleware;
mod uploads;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{delete, get, post},
};

use crate::{
    application::{downloads::DownloadService, store::ArtifactStore, uploads::UploadService},
    infra::staging::StagingArea,
};

use self::{
    error::{ApiError, codes},
    middleware::{log_responses, set_request_context},
};

pub use middleware::{REQUEST_ID_HEADER, RequestContext};

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct HttpState {
    pub uploads: Arc<UploadService>,
    pub downloads: Arc<DownloadService>,
    pub store: Arc<ArtifactStore>,
    pub staging: Arc<StagingArea>,
}

pub fn build_router(state: HttpState, debug_endpoints: bool) -> Router {
    let upload_body_limit = usize::try_from(state.staging.max_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let mut router = Router::new()
        .route(
            "/upload",
            post(uploads::upload).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route("/download/{format}/{key}", get(downloads::download))
        .route("/download/{format}", get(downloads::download_missing_key))
        .route("/preview/{key}", get(downloads::preview))
        .route("/files/{key}", delete(artifacts::delete_artifact))
        .route("/_health", get(artifacts::health));

    if debug_endpoints {
        router = router.route("/debug/storage", get(artifacts::storage_stats));
    }

    router
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn not_found() -> ApiError {
    ApiError::not_found("infra::http::fallback", "Resource not found")
}

async fn method_not_allowed() -> ApiError {
    ApiError::new(
        "infra::http::fallback",
        StatusCode::METHOD_NOT_ALLOWED,
        codes::METHOD_NOT_ALLOWED,
        "Method not allowed",
    )
}
