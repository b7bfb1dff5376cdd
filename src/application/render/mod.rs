//! Markdown rendering.
//!
//! Two engines share the [`MarkdownRenderer`] contract. The substitution
//! engine is the default and applies a small, fixed set of layered rewrite
//! rules; its gaps (no heading levels 4-6, no nested lists, no tables) are
//! part of its output contract. The comrak engine is a full CommonMark/GFM
//! renderer with sanitised output, enabled through `render.engine`.

mod document;
mod gfm;
mod substitution;
mod types;

use std::{sync::Arc, time::Instant};

use metrics::histogram;

use crate::config::RenderEngine;

pub use document::{DocumentView, render_document};
pub use gfm::ComrakRenderer;
pub use substitution::SubstitutionRenderer;
pub use types::{MarkdownRenderer, RenderError};

/// Build the renderer selected by configuration.
pub fn build_renderer(engine: RenderEngine) -> Arc<dyn MarkdownRenderer> {
    match engine {
        RenderEngine::Substitution => Arc::new(SubstitutionRenderer::new()),
        RenderEngine::Comrak => Arc::new(ComrakRenderer::new()),
    }
}

pub(crate) const METRIC_RENDER_MS: &str = "mdconvert_render_ms";

/// Render `markdown`, recording the latency per engine.
pub fn render_timed(
    renderer: &dyn MarkdownRenderer,
    markdown: &str,
) -> Result<String, RenderError> {
    let started = Instant::now();
    let html = renderer.render(markdown)?;
    histogram!(METRIC_RENDER_MS, "engine" => renderer.engine().as_str())
        .record(started.elapsed().as_secs_f64() * 1000.0);
    Ok(html)
}
