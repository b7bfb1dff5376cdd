//! Turning stored artifacts into downloadable deliverables.
//!
//! Neither format produces the binary file its name suggests. `pdf` yields a
//! self-contained, print-styled HTML document (`<name>.html`) meant to be
//! printed to PDF by the browser; `docx` yields the original Markdown as
//! plain text (`<name>.txt`).

use std::sync::Arc;

use mdconvert_api_types::{DownloadFormat, UnknownFormat};
use metrics::counter;
use thiserror::Error;

use crate::{
    application::{
        render::{DocumentView, MarkdownRenderer, RenderError, render_document, render_timed},
        store::ArtifactStore,
    },
    domain::artifact::{Artifact, ArtifactKey},
};

pub(crate) const METRIC_DOWNLOADS: &str = "mdconvert_downloads_total";

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    InvalidFormat(#[from] UnknownFormat),
    #[error("file `{key}` not found")]
    NotFound { key: String },
    #[error("failed to render deliverable")]
    Render(#[from] RenderError),
}

/// A rendered file ready to be sent to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deliverable {
    pub format: DownloadFormat,
    /// Suggested save-as name, `<base>.<stand-in extension>`.
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
    pub checksum: String,
}

pub struct DownloadService {
    store: Arc<ArtifactStore>,
    renderer: Arc<dyn MarkdownRenderer>,
}

impl DownloadService {
    pub fn new(store: Arc<ArtifactStore>, renderer: Arc<dyn MarkdownRenderer>) -> Self {
        Self { store, renderer }
    }

    /// Resolve `(format, key)` to a deliverable.
    ///
    /// The format is validated before the key is looked up, so an unknown
    /// format is reported even for keys that do not exist.
    pub fn prepare(&self, format: &str, key: &str) -> Result<Deliverable, DownloadError> {
        let format: DownloadFormat = format.parse()?;
        let artifact = self.lookup(key)?;
        let deliverable = build_deliverable(
            self.renderer.as_ref(),
            format,
            artifact.key.base_name(),
            &artifact.content,
            &artifact.checksum,
        )?;
        counter!(METRIC_DOWNLOADS, "format" => format.as_str()).increment(1);
        Ok(deliverable)
    }

    /// The PDF-style document for in-browser viewing.
    pub fn preview(&self, key: &str) -> Result<Deliverable, DownloadError> {
        let artifact = self.lookup(key)?;
        Ok(build_deliverable(
            self.renderer.as_ref(),
            DownloadFormat::Pdf,
            artifact.key.base_name(),
            &artifact.content,
            &artifact.checksum,
        )?)
    }

    /// Keys are only ever minted by the store's callers, so one that fails
    /// to parse cannot name a stored artifact and is reported as missing.
    fn lookup(&self, key: &str) -> Result<Arc<Artifact>, DownloadError> {
        let not_found = || DownloadError::NotFound {
            key: key.to_string(),
        };
        let key = ArtifactKey::parse(key).map_err(|_| not_found())?;
        self.store.get(key.as_str()).ok_or_else(not_found)
    }
}

/// Render `content` in the requested stand-in format.
pub fn build_deliverable(
    renderer: &dyn MarkdownRenderer,
    format: DownloadFormat,
    base_name: &str,
    content: &str,
    checksum: &str,
) -> Result<Deliverable, RenderError> {
    let body = match format {
        DownloadFormat::Pdf => {
            let body_html = render_timed(renderer, content)?;
            render_document(DocumentView {
                title: base_name,
                body_html: &body_html,
            })?
        }
        DownloadFormat::Docx => content.to_string(),
    };

    Ok(Deliverable {
        format,
        filename: format!("{base_name}.{}", format.stand_in_extension()),
        content_type: format.content_type(),
        body,
        checksum: checksum.to_string(),
    })
}
