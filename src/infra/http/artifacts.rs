use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use mdconvert_api_types::StorageStats;
use tracing::info;

use super::{HttpState, error::ApiError};

const SOURCE: &str = "infra::http::artifacts";

pub(super) async fn delete_artifact(
    State(state): State<HttpState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !state.store.delete(&key) {
        return Err(ApiError::not_found(SOURCE, "File not found"));
    }
    info!(target = SOURCE, key = %key, "artifact deleted on request");
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn storage_stats(State(state): State<HttpState>) -> Json<StorageStats> {
    let stats = state.store.stats();
    Json(StorageStats {
        count: stats.count,
        keys: stats.keys,
    })
}

pub(super) async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
