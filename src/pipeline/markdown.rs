//! Markdown → HTML via pulldown-cmark.
//!
//! The event stream is rewritten on the way through: soft breaks become hard
//! breaks (a single newline in the source is a line break in the PDF, as
//! people writing notes expect), and every code block is replaced by the
//! [`Highlighter`]'s output. Raw HTML in the source passes through untouched.

use super::highlight::Highlighter;
use crate::error::BlockError;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use tracing::{debug, warn};

/// HTML body plus per-block bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct RenderedMarkdown {
    pub html: String,
    pub code_blocks: usize,
    pub highlighted: usize,
    pub issues: Vec<BlockError>,
}

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// First word of a fence info string: "rust,ignore" and "python title=x"
/// both name their language first.
fn fence_language(info: &str) -> Option<String> {
    info.split(|c: char| c.is_whitespace() || c == ',' || c == '{')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Render protected Markdown to an HTML fragment.
pub fn render(text: &str, highlighter: &Highlighter) -> RenderedMarkdown {
    let mut out = RenderedMarkdown::default();
    let mut events: Vec<Event<'_>> = Vec::new();
    let mut code: Option<(Option<String>, String)> = None;

    for event in Parser::new_ext(text, options()) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => fence_language(&info),
                    CodeBlockKind::Indented => None,
                };
                code = Some((language, String::new()));
            }
            Event::Text(t) if code.is_some() => {
                if let Some((_, buf)) = code.as_mut() {
                    buf.push_str(&t);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                let Some((language, buf)) = code.take() else {
                    continue;
                };
                let index = out.code_blocks;
                out.code_blocks += 1;

                let result = highlighter.highlight(&buf, language.as_deref());
                if result.highlighted {
                    out.highlighted += 1;
                }
                if let Some((language, detail)) = result.failure {
                    warn!("Code block {} ({}): highlighting failed: {}", index, language, detail);
                    out.issues.push(BlockError::Highlight {
                        index,
                        language,
                        detail,
                    });
                }
                events.push(Event::Html(CowStr::from(result.html)));
            }
            Event::SoftBreak => events.push(Event::HardBreak),
            other => events.push(other),
        }
    }

    out.html.reserve(text.len() * 3 / 2);
    html::push_html(&mut out.html, events.into_iter());
    debug!(
        "Rendered {} bytes of HTML, {}/{} code blocks highlighted",
        out.html.len(),
        out.highlighted,
        out.code_blocks
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_str(md: &str) -> RenderedMarkdown {
        let hl = Highlighter::new("InspiredGitHub").unwrap();
        render(md, &hl)
    }

    #[test]
    fn single_newline_is_a_line_break() {
        let out = render_str("line one\nline two\n");
        assert_eq!(out.html, "<p>line one<br />\nline two</p>\n");
    }

    #[test]
    fn recognized_language_is_highlighted() {
        let out = render_str("```python\nprint('hi')\n```\n");
        assert_eq!(out.code_blocks, 1);
        assert_eq!(out.highlighted, 1);
        assert!(out.html.contains("<span class=\"hl-"));
        assert!(out.issues.is_empty());
    }

    #[test]
    fn unrecognized_language_still_renders() {
        let out = render_str("# Title\n\n```notalanguage\nx = <y>\n```\n\nafter\n");
        assert_eq!(out.code_blocks, 1);
        assert!(out.html.contains("x = &lt;y&gt;"));
        assert!(out.html.contains("<p>after</p>"));
        assert!(out.html.contains("<h1>Title</h1>"));
    }

    #[test]
    fn fence_info_is_reduced_to_language() {
        assert_eq!(fence_language("rust,ignore").as_deref(), Some("rust"));
        assert_eq!(fence_language("python title=x").as_deref(), Some("python"));
        assert_eq!(fence_language("   "), None);
    }

    #[test]
    fn tables_and_raw_html_pass_through() {
        let out = render_str("| a | b |\n|---|---|\n| 1 | 2 |\n\n<div class=\"x\">raw</div>\n");
        assert!(out.html.contains("<table>"));
        assert!(out.html.contains("<div class=\"x\">raw</div>"));
    }

    #[test]
    fn placeholder_token_survives_rendering() {
        let token = crate::pipeline::diagram::placeholder_for("graph TD; A-->B");
        let out = render_str(&format!("before\n\n{token}\n\nafter\n"));
        assert!(out.html.contains(&format!("<p>{token}</p>")));
    }
}
