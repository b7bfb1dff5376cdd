//! Upload acceptance rules.

use mdconvert_api_types::has_markdown_extension;
use thiserror::Error;

/// Reasons an upload is refused before anything reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("No file selected")]
    MissingFile,
    #[error("Please upload a valid Markdown file (.md or .markdown)")]
    InvalidType { filename: String },
    #[error("File is too large; the limit is {limit_bytes} bytes")]
    TooLarge { limit_bytes: u64 },
    #[error("File must be UTF-8 encoded text")]
    NotText,
}

/// Size and type limits applied to every upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    max_bytes: u64,
}

impl UploadPolicy {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Validate the client-supplied filename. Empty names count as no file.
    pub fn check_filename<'a>(&self, filename: Option<&'a str>) -> Result<&'a str, UploadRejection> {
        let filename = filename
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(UploadRejection::MissingFile)?;

        if !has_markdown_extension(filename) {
            return Err(UploadRejection::InvalidType {
                filename: filename.to_string(),
            });
        }
        Ok(filename)
    }

    pub fn check_size(&self, size_bytes: u64) -> Result<(), UploadRejection> {
        if size_bytes > self.max_bytes {
            return Err(UploadRejection::TooLarge {
                limit_bytes: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Decode an accepted payload as text.
    pub fn decode(&self, bytes: Vec<u8>) -> Result<String, UploadRejection> {
        self.check_size(bytes.len() as u64)?;
        String::from_utf8(bytes).map_err(|_| UploadRejection::NotText)
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(mdconvert_api_types::MAX_UPLOAD_BYTES)
    }
}
