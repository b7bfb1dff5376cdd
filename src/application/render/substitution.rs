//! Layered substitution renderer.
//!
//! This is order-sensitive text rewriting, not a parser. Each rule runs over
//! the output of the previous one:
//!
//! 1. `# `, `## `, `### ` lines become `<h1>`..`<h3>`
//! 2. `**bold**`, then `*italic*`
//! 3. fenced code blocks, then inline code spans
//! 4. `[label](url)` links
//! 5. `* ` and `- ` lines become `<li>`
//!
//! A final block pass groups adjacent list items into one `<ul>` and wraps
//! every remaining line that does not open a block element in `<p>`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::RenderEngine;

use super::types::{MarkdownRenderer, RenderError};

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

impl Rule {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("substitution rule must compile"),
            replacement,
        }
    }
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(r"(?m)^### (.*)$", "<h3>${1}</h3>"),
        Rule::new(r"(?m)^## (.*)$", "<h2>${1}</h2>"),
        Rule::new(r"(?m)^# (.*)$", "<h1>${1}</h1>"),
        Rule::new(r"\*\*(.*?)\*\*", "<strong>${1}</strong>"),
        Rule::new(r"\*(.*?)\*", "<em>${1}</em>"),
        Rule::new(r"(?s)```(.*?)```", "<pre><code>${1}</code></pre>"),
        Rule::new(r"`(.*?)`", "<code>${1}</code>"),
        Rule::new(r"\[([^\]]+)\]\(([^)]+)\)", r#"<a href="${2}">${1}</a>"#),
        Rule::new(r"(?m)^\* (.*)$", "<li>${1}</li>"),
        Rule::new(r"(?m)^- (.*)$", "<li>${1}</li>"),
    ]
});

static CODE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<pre><code>.*?</code></pre>").expect("code block regex"));

const BLOCK_OPENERS: [&str; 7] = ["<h1", "<h2", "<h3", "<ul", "<li", "<pre", "<p>"];

/// Default renderer reproducing the fixed rule set above.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubstitutionRenderer;

impl SubstitutionRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl MarkdownRenderer for SubstitutionRenderer {
    fn render(&self, markdown: &str) -> Result<String, RenderError> {
        let normalized = markdown.replace("\r\n", "\n");
        let substituted = RULES.iter().fold(normalized, |text, rule| {
            rule.pattern
                .replace_all(&text, rule.replacement)
                .into_owned()
        });
        Ok(wrap_blocks(&substituted))
    }

    fn engine(&self) -> RenderEngine {
        RenderEngine::Substitution
    }
}

fn wrap_blocks(html: &str) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut list_items: Vec<&str> = Vec::new();

    for line in logical_lines(html) {
        if line.starts_with("<li>") {
            list_items.push(line);
            continue;
        }
        flush_list(&mut list_items, &mut blocks);

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if opens_block(trimmed) {
            blocks.push(trimmed.to_string());
        } else {
            blocks.push(format!("<p>{trimmed}</p>"));
        }
    }
    flush_list(&mut list_items, &mut blocks);

    blocks.join("\n")
}

/// Split on newlines, except those inside a rendered code block, which may
/// span blank lines.
fn logical_lines(html: &str) -> Vec<&str> {
    let mut code_spans = CODE_BLOCK.find_iter(html).map(|m| m.range()).peekable();
    let mut lines = Vec::new();
    let mut start = 0;

    for (pos, _) in html.match_indices('\n') {
        while code_spans.next_if(|span| span.end <= pos).is_some() {}
        if code_spans.peek().is_some_and(|span| span.contains(&pos)) {
            continue;
        }
        lines.push(&html[start..pos]);
        start = pos + 1;
    }
    lines.push(&html[start..]);
    lines
}

fn flush_list(items: &mut Vec<&str>, blocks: &mut Vec<String>) {
    if items.is_empty() {
        return;
    }
    let mut list = String::from("<ul>\n");
    for item in items.drain(..) {
        list.push_str(item);
        list.push('\n');
    }
    list.push_str("</ul>");
    blocks.push(list);
}

fn opens_block(line: &str) -> bool {
    BLOCK_OPENERS.iter().any(|tag| line.starts_with(tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> String {
        SubstitutionRenderer::new()
            .render(markdown)
            .expect("substitution rendering is infallible")
    }

    #[test]
    fn title_and_bold_paragraph() {
        let html = render("# Title\n\nHello **world**.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<p>Hello <strong>world</strong>.</p>"));
        assert_eq!(html, "<h1>Title</h1>\n<p>Hello <strong>world</strong>.</p>");
    }

    #[test]
    fn rendering_is_deterministic() {
        let markdown = "## Notes\n\n* a\n* b\n\n```\nx = 1\n```\n";
        assert_eq!(render(markdown), render(markdown));
    }

    #[test]
    fn mixed_document_matches_snapshot() {
        let html = render(
            "# Guide\n## Setup\nInstall with `cargo`.\n\n- first\n* second\n\nSee [docs](https://example.com).\n#### Deep",
        );
        insta::assert_snapshot!(html, @r#"
<h1>Guide</h1>
<h2>Setup</h2>
<p>Install with <code>cargo</code>.</p>
<ul>
<li>first</li>
<li>second</li>
</ul>
<p>See <a href="https://example.com">docs</a>.</p>
<p>#### Deep</p>
"#);
    }

    #[test]
    fn deep_headings_and_quotes_pass_through_as_paragraphs() {
        assert_eq!(render("#### Four"), "<p>#### Four</p>");
        assert_eq!(render("> quoted"), "<p>> quoted</p>");
        assert_eq!(render("| a | b |"), "<p>| a | b |</p>");
    }

    #[test]
    fn separated_list_runs_become_separate_lists() {
        assert_eq!(
            render("- one\n\n- two"),
            "<ul>\n<li>one</li>\n</ul>\n<ul>\n<li>two</li>\n</ul>"
        );
    }

    #[test]
    fn fenced_code_keeps_blank_lines_and_is_not_wrapped() {
        let html = render("```\nlet x = 1;\n\nlet y = 2;\n```");
        assert_eq!(html, "<pre><code>\nlet x = 1;\n\nlet y = 2;\n</code></pre>");
    }

    #[test]
    fn control_characters_in_text_never_pull_in_code_blocks() {
        let html = render("\u{1a}CODE0\u{1a} tail\n\n```\nx\n```");
        assert_eq!(
            html,
            "<p>\u{1a}CODE0\u{1a} tail</p>\n<pre><code>\nx\n</code></pre>"
        );
    }

    #[test]
    fn code_block_mid_line_keeps_its_blank_lines() {
        assert_eq!(
            render("intro ```a\n\nb``` outro\nnext"),
            "<p>intro <pre><code>a\n\nb</code></pre> outro</p>\n<p>next</p>"
        );
    }

    #[test]
    fn emphasis_runs_before_code() {
        assert_eq!(
            render("`**not code**`"),
            "<p><code><strong>not code</strong></code></p>"
        );
    }

    #[test]
    fn italic_and_links_inside_headings() {
        assert_eq!(
            render("### A *quick* [look](/x)"),
            r#"<h3>A <em>quick</em> <a href="/x">look</a></h3>"#
        );
    }

    #[test]
    fn crlf_input_is_normalized() {
        assert_eq!(render("# T\r\n\r\nbody"), "<h1>T</h1>\n<p>body</p>");
    }
}
