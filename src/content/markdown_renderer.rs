use markdown::{Options, ParseOptions};
use spdlog::warn;

use crate::content::plain_text::PlainTextExtractor;

/// Both representations of one markdown source.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub html: String,
    pub plain_text: String,
}

pub struct MarkdownRenderer {}

impl MarkdownRenderer {
    /// Never fails: invalid UTF-8 is decoded lossily and parser errors
    /// degrade to plain CommonMark HTML and empty plain text.
    pub fn render(markdown: &[u8]) -> Rendered {
        let md_text = String::from_utf8_lossy(markdown);
        Rendered {
            html: Self::render_html(&md_text),
            plain_text: Self::render_plain_text(&md_text),
        }
    }

    pub fn render_html(md_text: &str) -> String {
        match markdown::to_html_with_options(md_text, &Options::gfm()) {
            Ok(html) => html,
            Err(e) => {
                warn!("GFM rendering failed, falling back to CommonMark. Desc={}", e.reason);
                markdown::to_html(md_text)
            }
        }
    }

    pub fn render_plain_text(md_text: &str) -> String {
        match markdown::to_mdast(md_text, &ParseOptions::gfm()) {
            Ok(root) => PlainTextExtractor::extract(&root),
            Err(e) => {
                warn!("Could not build markdown tree, plain text left empty. Desc={}", e.reason);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_data::{MIXED_POST_MD, POST_DATA_MD};

    use super::*;

    #[test]
    fn test_full_content() {
        let rendered = MarkdownRenderer::render(POST_DATA_MD.as_bytes());
        assert!(rendered.html.starts_with("<h1>What I learned after 20+ years of software development</h1>\n<p>How to be a great software engineer?</p>"));
        assert!(rendered.html.contains("<h3>Have a honest image of yourself</h3>"));
        assert!(rendered.html.contains("<strong>The earlier you find that, the better.</strong>"));
        assert!(rendered.plain_text.starts_with("How to be a great software engineer?\n\nSomeone asked me"));
        assert!(!rendered.plain_text.contains("Non technical"));
    }

    #[test]
    fn test_gfm_constructs() {
        let rendered = MarkdownRenderer::render(MIXED_POST_MD.as_bytes());
        assert!(rendered.html.contains("<table>"));
        assert!(rendered.html.contains("<li>item one</li>"));
        assert!(rendered.html.contains("<code class=\"language-rust\">"));
        assert!(rendered.html.contains("data-footnote-ref"));
    }

    #[test]
    fn test_invalid_utf8_is_not_an_error() {
        let rendered = MarkdownRenderer::render(b"Broken \xff byte.");
        assert_eq!(rendered.plain_text, "Broken \u{fffd} byte.\n\n");
        assert!(rendered.html.starts_with("<p>Broken"));
    }

    #[test]
    fn test_unusual_markdown() {
        let rendered = MarkdownRenderer::render(b"***\n[unclosed](\n```\nnever closed");
        assert!(!rendered.html.is_empty());
    }
}
