//! Pipeline stages for Markdown-to-PDF conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the browser backend can be swapped without touching
//! the text stages.
//!
//! ## Data Flow
//!
//! ```text
//! output_path ─────────────────────────────────────────────┐
//!                                                          ▼
//! diagram::protect ──▶ markdown ──▶ diagram::restore ──▶ compose ──▶ scratch ──▶ render
//! (fences→tokens)    (pulldown +    (tokens→divs)      (page,       (temp     (Chrome
//!                     syntect)                          watermark)   .html)    → .pdf)
//! ```
//!
//! 1. [`output_path`] — pick a non-clobbering absolute target, create its directory
//! 2. [`diagram`]     — shield Mermaid sources from the Markdown engine
//! 3. [`markdown`]    — Markdown → HTML with [`highlight`]ed code blocks
//! 4. [`compose`]     — full page: `@page` size, watermark, Mermaid bootstrap
//! 5. [`scratch`]     — temporary HTML file the browser can open
//! 6. [`render`]      — headless Chrome load, settle, print; runs in `spawn_blocking`

pub mod compose;
pub mod diagram;
pub mod highlight;
pub mod markdown;
pub mod output_path;
pub mod render;
pub mod scratch;

/// Escape text for HTML element content and attribute values.
pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_html;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("A-->B"), "A--&gt;B");
    }
}
