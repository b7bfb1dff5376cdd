//! Standalone HTML document used for the PDF-style deliverable and previews.

use askama::Template;

use super::types::RenderError;

/// Values substituted into the document template.
#[derive(Debug, Clone, Copy)]
pub struct DocumentView<'a> {
    pub title: &'a str,
    /// Already-rendered HTML fragment; inserted without escaping.
    pub body_html: &'a str,
}

#[derive(Template)]
#[template(path = "document.html")]
struct DocumentTemplate<'a> {
    title: &'a str,
    body_html: &'a str,
}

/// Embed a rendered fragment into the print-ready document shell.
pub fn render_document(view: DocumentView<'_>) -> Result<String, RenderError> {
    DocumentTemplate {
        title: view.title,
        body_html: view.body_html,
    }
    .render()
    .map_err(|err| RenderError::Document {
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_is_embedded_verbatim_and_title_is_escaped() {
        let html = render_document(DocumentView {
            title: "Q&A <draft>",
            body_html: "<h1>Title</h1>\n<p>Hello <strong>world</strong>.</p>",
        })
        .expect("document renders");

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1>Title</h1>\n<p>Hello <strong>world</strong>.</p>"));
        assert!(html.contains("<title>Q&#38;A &#60;draft&#62;</title>"));
        assert!(!html.contains("<draft>"));
        assert!(html.contains("@media print"));
    }
}
