//! `POST /upload`.

use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::{
    Multipart,
    multipart::{Field, MultipartRejection},
};
use futures::StreamExt;
use mdconvert_api_types::UploadResponse;
use tracing::warn;

use crate::{domain::uploads::UploadRejection, infra::staging::StagingError};

use super::{
    HttpState,
    error::{ApiError, codes},
};

const SOURCE: &str = "infra::http::uploads";

pub(super) async fn upload(
    State(state): State<HttpState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|err| {
        ApiError::bad_request(
            SOURCE,
            codes::INVALID_REQUEST,
            "Request body must be multipart/form-data",
        )
        .with_detail(&err)
    })?;

    let field = match read_file_field(&mut multipart).await? {
        Some(field) => field,
        None => return Err(reject(&state, UploadRejection::MissingFile)),
    };

    let original_filename = state
        .uploads
        .policy()
        .check_filename(field.file_name())
        .map(str::to_string)
        .map_err(|rejection| reject(&state, rejection))?;

    let payload = field.map(|chunk| {
        chunk.map_err(|err| {
            if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                StagingError::PayloadTooLarge {
                    source: Box::new(err),
                }
            } else {
                StagingError::PayloadStream {
                    source: Box::new(err),
                }
            }
        })
    });

    let staged = state
        .staging
        .stage(payload)
        .await
        .map_err(|err| staging_error(&state, err))?;
    let bytes = staged
        .consume()
        .await
        .map_err(|err| staging_error(&state, err))?;

    let receipt = state
        .uploads
        .accept(&original_filename, bytes)
        .map_err(|err| ApiError::from_upload(SOURCE, err))?;

    Ok(Json(UploadResponse {
        success: true,
        filename: receipt.key.to_string(),
        original_filename: receipt.original_filename,
        preview_html: Some(receipt.preview_html),
        message: "File uploaded successfully".to_string(),
    }))
}

/// Advance to the `file` field, skipping any other form fields.
async fn read_file_field(multipart: &mut Multipart) -> Result<Option<Field>, ApiError> {
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => return Ok(Some(field)),
            Ok(Some(_)) => continue,
            Ok(None) => return Ok(None),
            Err(err) => {
                let status = err.status();
                warn!(
                    target = SOURCE,
                    status = status.as_u16(),
                    error = %err,
                    "failed to read multipart payload"
                );
                let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    codes::FILE_TOO_LARGE
                } else {
                    codes::INVALID_REQUEST
                };
                return Err(
                    ApiError::bad_request(SOURCE, code, "Upload form data was invalid")
                        .with_detail(&err),
                );
            }
        }
    }
}

fn reject(state: &HttpState, rejection: UploadRejection) -> ApiError {
    ApiError::from_upload(SOURCE, state.uploads.reject(rejection))
}

fn staging_error(state: &HttpState, err: StagingError) -> ApiError {
    match err {
        StagingError::TooLarge { limit_bytes } => {
            reject(state, UploadRejection::TooLarge { limit_bytes })
        }
        other => ApiError::from_staging(SOURCE, other),
    }
}
