//! Wire types shared by the mdconvert server and its command-line client.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest accepted upload, in bytes (16 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

/// Extensions accepted for uploads, compared case-insensitively.
pub const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// Returns `true` when `filename` ends in `.md` or `.markdown` (any case).
pub fn has_markdown_extension(filename: &str) -> bool {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let Some((stem, extension)) = name.rsplit_once('.') else {
        return false;
    };
    // A bare ".md" has no name to derive an output from.
    if stem.is_empty() {
        return false;
    }
    MARKDOWN_EXTENSIONS
        .iter()
        .any(|allowed| extension.eq_ignore_ascii_case(allowed))
}

/// Successful `POST /upload` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    /// Artifact key used for later downloads.
    pub filename: String,
    pub original_filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_html: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable classification, e.g. `invalid_file_type`.
    pub error: String,
    pub message: String,
}

/// Diagnostic snapshot of the artifact store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    pub count: usize,
    pub keys: Vec<String>,
}

/// Output formats offered by `GET /download/{format}/{key}`.
///
/// Both are stand-ins: `pdf` yields a print-ready HTML document and `docx`
/// yields the original Markdown as plain text. No binary PDF or Word file is
/// ever produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadFormat {
    Pdf,
    Docx,
}

impl DownloadFormat {
    pub const ALL: [DownloadFormat; 2] = [DownloadFormat::Pdf, DownloadFormat::Docx];

    pub fn as_str(self) -> &'static str {
        match self {
            DownloadFormat::Pdf => "pdf",
            DownloadFormat::Docx => "docx",
        }
    }

    /// Extension of the file actually delivered for this format.
    pub fn stand_in_extension(self) -> &'static str {
        match self {
            DownloadFormat::Pdf => "html",
            DownloadFormat::Docx => "txt",
        }
    }

    /// Media type of the file actually delivered for this format.
    pub fn content_type(self) -> &'static str {
        match self {
            DownloadFormat::Pdf => "text/html; charset=utf-8",
            DownloadFormat::Docx => "text/plain; charset=utf-8",
        }
    }
}

impl fmt::Display for DownloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported download format `{0}`; use \"pdf\" or \"docx\"")]
pub struct UnknownFormat(pub String);

impl FromStr for DownloadFormat {
    type Err = UnknownFormat;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pdf" => Ok(DownloadFormat::Pdf),
            "docx" => Ok(DownloadFormat::Docx),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_extension_check_ignores_case() {
        assert!(has_markdown_extension("notes.md"));
        assert!(has_markdown_extension("NOTES.MD"));
        assert!(has_markdown_extension("draft.v2.Markdown"));
        assert!(!has_markdown_extension("notes.txt"));
        assert!(!has_markdown_extension("notes.md.txt"));
        assert!(!has_markdown_extension("README"));
        assert!(!has_markdown_extension(".md"));
    }

    #[test]
    fn download_format_parses_only_known_values() {
        assert_eq!("pdf".parse::<DownloadFormat>(), Ok(DownloadFormat::Pdf));
        assert_eq!("docx".parse::<DownloadFormat>(), Ok(DownloadFormat::Docx));
        assert_eq!(
            "txt".parse::<DownloadFormat>(),
            Err(UnknownFormat("txt".to_string()))
        );
        assert!("PDF".parse::<DownloadFormat>().is_err());
    }

    #[test]
    fn upload_response_uses_camel_case_keys() {
        let response = UploadResponse {
            success: true,
            filename: "abc_notes.md".to_string(),
            original_filename: "notes.md".to_string(),
            preview_html: None,
            message: "File uploaded successfully".to_string(),
        };

        let value = serde_json::to_value(&response).expect("serialize");
        assert_eq!(value["originalFilename"], "notes.md");
        assert!(value.get("previewHtml").is_none());
    }
}
