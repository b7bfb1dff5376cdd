use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mdconvert_api_types::ErrorResponse;
use tracing::error;

use crate::{
    application::{downloads::DownloadError, error::ErrorReport, uploads::UploadError},
    domain::uploads::UploadRejection,
    infra::staging::StagingError,
};

pub mod codes {
    pub const MISSING_FILE: &str = "missing_file";
    pub const INVALID_FILE_TYPE: &str = "invalid_file_type";
    pub const FILE_TOO_LARGE: &str = "file_too_large";
    pub const INVALID_REQUEST: &str = "invalid_request";
    pub const INVALID_ENCODING: &str = "invalid_encoding";
    pub const INVALID_FORMAT: &str = "invalid_format";
    pub const INVALID_PARAMS: &str = "invalid_params";
    pub const NOT_FOUND: &str = "not_found";
    pub const METHOD_NOT_ALLOWED: &str = "method_not_allowed";
    pub const INTERNAL: &str = "internal_error";
}

/// Error response rendered as `{error, message}` JSON.
#[derive(Debug)]
pub struct ApiError {
    source: &'static str,
    status: StatusCode,
    code: &'static str,
    message: String,
    detail: Option<String>,
}

impl ApiError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            code,
            message: message.into(),
            detail: None,
        }
    }

    /// Keep a diagnostic for the logs without exposing it to the client.
    pub fn with_detail(mut self, error: &dyn StdError) -> Self {
        let mut chain = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            chain.push(inner.to_string());
            current = inner.source();
        }
        self.detail = Some(chain.join(": "));
        self
    }

    pub fn bad_request(
        source: &'static str,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::new(source, StatusCode::BAD_REQUEST, code, message)
    }

    pub fn not_found(source: &'static str, message: impl Into<String>) -> Self {
        Self::new(source, StatusCode::NOT_FOUND, codes::NOT_FOUND, message)
    }

    pub fn internal(source: &'static str, error: &dyn StdError) -> Self {
        error!(target = source, error = %error, "request failed unexpectedly");
        Self::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL,
            "Internal server error",
        )
        .with_detail(error)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn rejection(source: &'static str, rejection: &UploadRejection) -> Self {
        let code = match rejection {
            UploadRejection::MissingFile => codes::MISSING_FILE,
            UploadRejection::InvalidType { .. } => codes::INVALID_FILE_TYPE,
            UploadRejection::TooLarge { .. } => codes::FILE_TOO_LARGE,
            UploadRejection::NotText => codes::INVALID_ENCODING,
        };
        Self::bad_request(source, code, rejection.to_string())
    }

    pub fn from_upload(source: &'static str, err: UploadError) -> Self {
        match err {
            UploadError::Rejected(rejection) => Self::rejection(source, &rejection),
            err @ UploadError::Render(_) => Self::internal(source, &err),
        }
    }

    pub fn from_download(source: &'static str, err: DownloadError) -> Self {
        match err {
            DownloadError::InvalidFormat(unknown) => Self::bad_request(
                source,
                codes::INVALID_FORMAT,
                format!("Invalid format `{}`; expected pdf or docx", unknown.0),
            ),
            DownloadError::NotFound { .. } => Self::not_found(source, "File not found"),
            err @ DownloadError::Render(_) => Self::internal(source, &err),
        }
    }

    pub fn from_staging(source: &'static str, err: StagingError) -> Self {
        match err {
            StagingError::TooLarge { limit_bytes } => {
                Self::rejection(source, &UploadRejection::TooLarge { limit_bytes })
            }
            err @ (StagingError::PayloadTooLarge { .. } | StagingError::SizeOverflow) => {
                Self::bad_request(
                    source,
                    codes::FILE_TOO_LARGE,
                    "File exceeds the upload limit",
                )
                .with_detail(&err)
            }
            err @ StagingError::PayloadStream { .. } => Self::bad_request(
                source,
                codes::INVALID_REQUEST,
                "Upload body could not be read",
            )
            .with_detail(&err),
            err @ StagingError::Io(_) => Self::internal(source, &err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.code.to_string(),
            message: self.message.clone(),
        };
        let mut response = (self.status, Json(body)).into_response();
        let detail = self.detail.unwrap_or(self.message);
        ErrorReport::from_message(self.source, format!("{}: {detail}", self.code))
            .attach(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use mdconvert_api_types::UnknownFormat;

    use super::*;

    #[test]
    fn download_errors_map_to_stable_codes() {
        let invalid = ApiError::from_download("test", UnknownFormat("txt".into()).into());
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.code(), codes::INVALID_FORMAT);

        let missing = ApiError::from_download(
            "test",
            DownloadError::NotFound {
                key: "abc_notes.md".into(),
            },
        );
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.code(), codes::NOT_FOUND);
    }

    #[test]
    fn rejections_map_to_upload_codes() {
        let cases = [
            (UploadRejection::MissingFile, codes::MISSING_FILE),
            (
                UploadRejection::InvalidType {
                    filename: "a.txt".into(),
                },
                codes::INVALID_FILE_TYPE,
            ),
            (
                UploadRejection::TooLarge { limit_bytes: 1 },
                codes::FILE_TOO_LARGE,
            ),
            (UploadRejection::NotText, codes::INVALID_ENCODING),
        ];

        for (rejection, code) in cases {
            let err = ApiError::rejection("test", &rejection);
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn response_carries_error_report() {
        let response = ApiError::not_found("test", "File not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.source, "test");
        assert_eq!(report.messages, vec!["not_found: File not found".to_string()]);
    }
}
