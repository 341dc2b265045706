//! Syntax highlighting for fenced code blocks via syntect.
//!
//! Highlighting emits class-based markup (`<span class="hl-…">`) rather than
//! inline colours, so one stylesheet controls the look of every block. The
//! stylesheet is generated from the configured theme or supplied by the user.
//!
//! Resolution order for a block:
//! 1. the fence's language tag, when syntect knows it;
//! 2. automatic detection from the first line (shebang, modeline, `<?php` …);
//! 3. plain escaped text.
//!
//! Detection only looks at that first line. An untagged block of Python,
//! JSON or anything else without an interpreter line is left plain; there is
//! no guessing from the body.
//!
//! A failure at any step falls through to the next; nothing here can abort
//! the rendering of the rest of the document.

use super::escape_html;
use crate::error::Md2PdfError;
use once_cell::sync::Lazy;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{css_for_theme_with_class_style, ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use tracing::debug;

/// Class prefix shared by the generated markup and stylesheet.
pub const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

static SYNTAXES: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEMES: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

/// Outcome of highlighting one code block.
#[derive(Debug, Clone)]
pub struct Highlighted {
    /// Complete `<pre><code>` block.
    pub html: String,
    /// True when syntax markup was produced.
    pub highlighted: bool,
    /// `(language, detail)` when highlighting with a resolved syntax failed.
    pub failure: Option<(String, String)>,
}

/// Highlighter bound to one theme.
pub struct Highlighter {
    syntaxes: &'static SyntaxSet,
    theme: Theme,
}

impl std::fmt::Debug for Highlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Highlighter")
            .field("theme", &self.theme.name)
            .finish()
    }
}

impl Highlighter {
    /// Create a highlighter for a bundled syntect theme.
    pub fn new(theme_name: &str) -> Result<Self, Md2PdfError> {
        let theme = THEMES.themes.get(theme_name).cloned().ok_or_else(|| {
            let mut known: Vec<&str> = THEMES.themes.keys().map(String::as_str).collect();
            known.sort_unstable();
            Md2PdfError::InvalidConfig(format!(
                "Unknown highlight theme '{theme_name}'. Available: {}",
                known.join(", ")
            ))
        })?;
        Ok(Self {
            syntaxes: &SYNTAXES,
            theme,
        })
    }

    /// Stylesheet matching the markup produced by [`Highlighter::highlight`].
    pub fn stylesheet(&self) -> Result<String, Md2PdfError> {
        css_for_theme_with_class_style(&self.theme, CLASS_STYLE)
            .map_err(|e| Md2PdfError::Internal(format!("highlight stylesheet: {e}")))
    }

    /// Highlight `code`, tagged with `language` when the fence had one.
    pub fn highlight(&self, code: &str, language: Option<&str>) -> Highlighted {
        let mut failure = None;

        if let Some(lang) = language {
            if let Some(syntax) = self.syntaxes.find_syntax_by_token(lang) {
                match self.highlight_with(syntax, code) {
                    Ok(inner) => return highlighted_block(inner, lang),
                    Err(e) => failure = Some((lang.to_string(), e.to_string())),
                }
            } else {
                debug!("No syntax for '{}', trying detection", lang);
            }
        }

        if let Some(syntax) = self.syntaxes.find_syntax_by_first_line(code) {
            match self.highlight_with(syntax, code) {
                Ok(inner) => {
                    let class = match language {
                        Some(lang) => lang.to_string(),
                        None => class_token(syntax),
                    };
                    return Highlighted {
                        failure,
                        ..highlighted_block(inner, &class)
                    };
                }
                Err(e) => {
                    if failure.is_none() {
                        failure = Some((syntax.name.clone(), e.to_string()));
                    }
                }
            }
        }

        Highlighted {
            html: plain_block(code, language),
            highlighted: false,
            failure,
        }
    }

    fn highlight_with(
        &self,
        syntax: &SyntaxReference,
        code: &str,
    ) -> Result<String, syntect::Error> {
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, self.syntaxes, CLASS_STYLE);
        for line in LinesWithEndings::from(code) {
            generator.parse_html_for_line_which_includes_newline(line)?;
        }
        Ok(generator.finalize())
    }
}

/// Single lowercase word naming a detected syntax, for the `language-` class.
fn class_token(syntax: &SyntaxReference) -> String {
    let ext = syntax
        .file_extensions
        .iter()
        .find(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()));
    match ext {
        Some(e) => e.to_ascii_lowercase(),
        None => syntax
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect(),
    }
}

fn highlighted_block(inner: String, language: &str) -> Highlighted {
    Highlighted {
        html: format!(
            "<pre class=\"hl\"><code class=\"language-{}\">{}</code></pre>\n",
            escape_html(language),
            inner
        ),
        highlighted: true,
        failure: None,
    }
}

fn plain_block(code: &str, language: Option<&str>) -> String {
    match language {
        Some(lang) => format!(
            "<pre><code class=\"language-{}\">{}</code></pre>\n",
            escape_html(lang),
            escape_html(code)
        ),
        None => format!("<pre><code>{}</code></pre>\n", escape_html(code)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hl() -> Highlighter {
        Highlighter::new("InspiredGitHub").unwrap()
    }

    #[test]
    fn unknown_theme_is_config_error() {
        let err = Highlighter::new("no-such-theme").unwrap_err();
        assert!(err.to_string().contains("InspiredGitHub"), "got: {err}");
    }

    #[test]
    fn known_language_gets_markup() {
        let out = hl().highlight("fn main() {}\n", Some("rust"));
        assert!(out.highlighted);
        assert!(out.failure.is_none());
        assert!(out.html.starts_with("<pre class=\"hl\"><code class=\"language-rust\">"));
        assert!(out.html.contains("<span class=\"hl-"));
    }

    #[test]
    fn unknown_language_without_hint_is_plain() {
        let out = hl().highlight("a < b && c\n", Some("klingon"));
        assert!(!out.highlighted);
        assert!(out.failure.is_none());
        assert_eq!(
            out.html,
            "<pre><code class=\"language-klingon\">a &lt; b &amp;&amp; c\n</code></pre>\n"
        );
    }

    #[test]
    fn untagged_block_is_detected_from_first_line() {
        let out = hl().highlight("#!/bin/bash\necho hi\n", None);
        assert!(out.highlighted);
        assert!(out.html.contains("<span class=\"hl-"));
        assert!(
            out.html.starts_with("<pre class=\"hl\"><code class=\"language-sh\">"),
            "got: {}",
            out.html
        );
    }

    #[test]
    fn detected_class_is_one_word() {
        let out = hl().highlight("#!/usr/bin/env python3\nprint(1)\n", None);
        assert!(out.highlighted);
        let start = out.html.find("language-").unwrap();
        let class = &out.html[start..out.html[start..].find('"').unwrap() + start];
        assert_eq!(class, "language-py");
    }

    #[test]
    fn untagged_json_without_interpreter_line_stays_plain() {
        let out = hl().highlight("{\"a\": 1}\n", None);
        assert!(!out.highlighted);
        assert_eq!(out.html, "<pre><code>{&quot;a&quot;: 1}\n</code></pre>\n");
    }

    #[test]
    fn untagged_plain_text_stays_plain() {
        let out = hl().highlight("just words\n", None);
        assert!(!out.highlighted);
        assert_eq!(out.html, "<pre><code>just words\n</code></pre>\n");
    }

    #[test]
    fn stylesheet_uses_prefix() {
        let css = hl().stylesheet().unwrap();
        assert!(css.contains(".hl-"));
    }
}
