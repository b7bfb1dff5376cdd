//! `GET /download/{format}/{key}` and `GET /preview/{key}`.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, ETAG},
    },
    response::{IntoResponse, Response},
};

use crate::application::downloads::Deliverable;

use super::{
    HttpState,
    error::{ApiError, codes},
};

const SOURCE: &str = "infra::http::downloads";

pub(super) async fn download(
    State(state): State<HttpState>,
    Path((format, key)): Path<(String, String)>,
) -> Response {
    match state.downloads.prepare(&format, &key) {
        Ok(deliverable) => deliverable_response(deliverable, Disposition::Attachment),
        Err(err) => ApiError::from_download(SOURCE, err).into_response(),
    }
}

/// `/download/{format}` without a key.
pub(super) async fn download_missing_key(Path(_format): Path<String>) -> ApiError {
    ApiError::bad_request(
        SOURCE,
        codes::INVALID_PARAMS,
        "Both a format and a file key are required",
    )
}

pub(super) async fn preview(State(state): State<HttpState>, Path(key): Path<String>) -> Response {
    match state.downloads.preview(&key) {
        Ok(deliverable) => deliverable_response(deliverable, Disposition::Inline),
        Err(err) => ApiError::from_download("infra::http::preview", err).into_response(),
    }
}

#[derive(Debug, Clone, Copy)]
enum Disposition {
    Attachment,
    Inline,
}

impl Disposition {
    fn as_str(self) -> &'static str {
        match self {
            Disposition::Attachment => "attachment",
            Disposition::Inline => "inline",
        }
    }
}

fn deliverable_response(deliverable: Deliverable, disposition: Disposition) -> Response {
    let Deliverable {
        filename,
        content_type,
        body,
        checksum,
        ..
    } = deliverable;

    let length = body.len();
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    let disposition = format!(
        "{}; filename=\"{}\"",
        disposition.as_str(),
        filename.replace('"', "'")
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(CONTENT_DISPOSITION, value);
    }
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    if let Ok(value) = HeaderValue::from_str(&format!("\"{checksum}\"")) {
        headers.insert(ETAG, value);
    }

    response
}
