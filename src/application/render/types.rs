use thiserror::Error;

use crate::config::RenderEngine;

/// Errors surfaced by the rendering pipeline.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("document processing failed: {message}")]
    Document { message: String },
}

/// Markdown to HTML fragment conversion.
///
/// Implementations must be pure: the same input always yields the same HTML.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> Result<String, RenderError>;

    fn engine(&self) -> RenderEngine;
}
