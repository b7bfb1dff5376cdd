//! Full CommonMark/GFM rendering through comrak, sanitised with ammonia.

use ammonia::Builder as AmmoniaBuilder;
use comrak::{Arena, Options, format_html, parse_document};

use crate::config::RenderEngine;

use super::types::{MarkdownRenderer, RenderError};

pub struct ComrakRenderer {
    options: Options<'static>,
    sanitizer: AmmoniaBuilder<'static>,
}

impl ComrakRenderer {
    pub fn new() -> Self {
        Self {
            options: default_options(),
            sanitizer: build_sanitizer(),
        }
    }
}

impl Default for ComrakRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer for ComrakRenderer {
    fn render(&self, markdown: &str) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);

        let mut html = String::new();
        format_html(root, &self.options, &mut html).map_err(|err| RenderError::Markdown {
            message: err.to_string(),
        })?;

        Ok(self.sanitizer.clean(&html).to_string())
    }

    fn engine(&self) -> RenderEngine {
        RenderEngine::Comrak
    }
}

fn default_options() -> Options<'static> {
    let mut options = Options::default();

    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;
    ext.front_matter_delimiter = Some("---".to_string());

    let render = &mut options.render;
    render.github_pre_lang = true;
    // Raw HTML is passed through here and stripped by the sanitiser instead.
    render.r#unsafe = true;

    options
}

fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();
    builder.add_tags(&["input"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);
    builder.add_tag_attributes("pre", &["lang"]);
    builder.add_tag_attributes("code", &["class"]);
    builder.add_tag_attributes("th", &["align"]);
    builder.add_tag_attributes("td", &["align"]);
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> String {
        ComrakRenderer::new().render(markdown).expect("render")
    }

    #[test]
    fn renders_headings_beyond_level_three() {
        let html = render("#### Deep\n");
        assert!(html.contains("<h4>Deep</h4>"), "{html}");
    }

    #[test]
    fn renders_tables() {
        let html = render("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"), "{html}");
        assert!(html.contains("<td>1</td>"), "{html}");
    }

    #[test]
    fn strips_scripts_from_raw_html() {
        let html = render("hello\n\n<script>alert(1)</script>\n");
        assert!(!html.contains("<script"), "{html}");
        assert!(html.contains("<p>hello</p>"), "{html}");
    }
}
