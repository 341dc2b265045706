//! Diagram protection: keep Mermaid sources intact through Markdown rendering.
//!
//! A Markdown engine would turn a ```` ```mermaid ```` fence into a highlighted
//! `<pre><code>` block, which Mermaid cannot render. Before rendering, each
//! fence is swapped for an opaque token (`MERMAID_PLACEHOLDER_` + base64 of the
//! source) placed on its own paragraph; base64 contains no Markdown syntax, so
//! the token survives rendering untouched. After rendering, every token is
//! decoded back into a `<div class="mermaid">` container.
//!
//! A fence opens with three or more backticks followed by `mermaid` at the
//! start of a line, and closes at the next line holding only a backtick run
//! at least as long. An unclosed fence is left for the Markdown engine.
//!
//! Decoding is isolated per token: a corrupt payload becomes an error marker
//! and a [`BlockError`], and every other diagram is still restored.

use super::escape_html;
use crate::error::BlockError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, warn};

/// Fixed prefix identifying a placeholder token.
pub const PLACEHOLDER_PREFIX: &str = "MERMAID_PLACEHOLDER_";

/// Markup substituted for a placeholder that cannot be decoded.
pub const DIAGRAM_ERROR_HTML: &str =
    r#"<pre class="mermaid-error">Error processing Mermaid diagram</pre>"#;

// Opening line only; the matching close is found by `find_close`.
static MERMAID_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(`{3,})mermaid[ \t]*\r?$").unwrap());

// The Markdown engine wraps a lone token in a paragraph; swallow the wrapper.
static PLACEHOLDER_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?:<p>)?{}([A-Za-z0-9+/=]*)(?:</p>)?",
        PLACEHOLDER_PREFIX
    ))
    .unwrap()
});

/// Markdown with diagrams replaced by placeholder tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protected {
    pub text: String,
    pub diagram_count: usize,
}

impl Protected {
    pub fn has_diagrams(&self) -> bool {
        self.diagram_count > 0
    }
}

/// Build the placeholder token for a diagram source.
pub fn placeholder_for(source: &str) -> String {
    format!("{PLACEHOLDER_PREFIX}{}", STANDARD.encode(source))
}

/// Replace every Mermaid fence, in document order, with a placeholder token.
pub fn protect(markdown: &str) -> Protected {
    let mut text = String::with_capacity(markdown.len());
    let mut diagram_count = 0;
    let mut copied = 0;
    let mut search = 0;

    while let Some(caps) = MERMAID_OPEN.captures_at(markdown, search) {
        let Some(open) = caps.get(0) else { break };
        let ticks = caps[1].len();
        let body_start = open.end() + 1;

        let close = if markdown[open.end()..].starts_with('\n') {
            find_close(markdown, body_start, ticks)
        } else {
            None
        };
        let Some((close_start, close_end)) = close else {
            debug!("Unclosed diagram fence at byte {}", open.start());
            search = open.end();
            continue;
        };

        let body = &markdown[body_start..close_start];
        let source = match body.strip_suffix('\n') {
            Some(b) => b.strip_suffix('\r').unwrap_or(b),
            None => body,
        };

        text.push_str(&markdown[copied..open.start()]);
        text.push_str("\n\n");
        text.push_str(&placeholder_for(source));
        text.push_str("\n\n");
        diagram_count += 1;
        copied = close_end;
        search = close_end;
    }
    text.push_str(&markdown[copied..]);

    debug!("Protected {} diagram block(s)", diagram_count);
    Protected {
        text,
        diagram_count,
    }
}

/// Byte range of the first line at or after `from` that closes a fence of
/// `ticks` backticks: up to three spaces, at least `ticks` backticks, then
/// only whitespace. The range excludes the line's `\n`.
fn find_close(markdown: &str, from: usize, ticks: usize) -> Option<(usize, usize)> {
    let mut start = from;
    loop {
        let end = markdown[start..]
            .find('\n')
            .map_or(markdown.len(), |i| start + i);
        let line = &markdown[start..end];
        let run = line.trim_start_matches(' ');
        let indent = line.len() - run.len();
        let fence = run.bytes().take_while(|&b| b == b'`').count();
        if indent <= 3 && fence >= ticks && run[fence..].trim().is_empty() {
            return Some((start, end));
        }
        if end == markdown.len() {
            return None;
        }
        start = end + 1;
    }
}

/// Replace every placeholder token in `html` with a diagram container.
///
/// Returns the rewritten HTML and one [`BlockError`] per token that failed to
/// decode.
pub fn restore(html: &str) -> (String, Vec<BlockError>) {
    let mut issues = Vec::new();
    let mut index = 0;

    let restored = PLACEHOLDER_TOKEN
        .replace_all(html, |caps: &Captures| {
            let current = index;
            index += 1;
            match decode_payload(&caps[1]) {
                Ok(source) => format!("<div class=\"mermaid\">{}</div>", escape_html(&source)),
                Err(detail) => {
                    warn!("Diagram {}: {}", current, detail);
                    issues.push(BlockError::DiagramDecode {
                        index: current,
                        detail,
                    });
                    DIAGRAM_ERROR_HTML.to_string()
                }
            }
        })
        .into_owned();

    (restored, issues)
}

fn decode_payload(payload: &str) -> Result<String, String> {
    let bytes = STANDARD.decode(payload).map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|e| e.to_string())
}
