//! Document composition: wrap the rendered body in a printable HTML page.
//!
//! The composed page carries everything that depends on the request rather
//! than on process configuration: the `@page` size directive, the page box,
//! the optional watermark layer and, for documents with diagrams, the Mermaid
//! bootstrap script. Stylesheets that are the same for every call (page theme,
//! highlight colours) are injected later by the renderer.

use super::escape_html;
use crate::config::{PaperFormat, PaperOrientation};

/// JS expression that is true once client-side diagram rendering settled.
pub const DIAGRAMS_SETTLED_JS: &str = "window.mermaidRendered === true";

/// Event dispatched on `window` when diagram rendering settled.
pub const DIAGRAMS_SETTLED_EVENT: &str = "mermaid-rendered";

/// Request-dependent inputs to [`compose`].
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    pub title: String,
    pub paper_format: PaperFormat,
    pub paper_orientation: PaperOrientation,
    pub watermark: Option<String>,
    pub has_diagrams: bool,
    pub mermaid_script_url: String,
}

/// Build a complete HTML document around `body`.
///
/// `body` is inserted verbatim; it is trusted Markdown output.
pub fn compose(body: &str, options: &ComposeOptions) -> String {
    let mut doc = String::with_capacity(body.len() + 4096);

    doc.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    doc.push_str(&format!("<title>{}</title>\n", escape_html(&options.title)));
    doc.push_str("<style>\n");
    doc.push_str(&page_css(options.paper_format, options.paper_orientation));
    if options.watermark.is_some() {
        doc.push_str(&watermark_css(options.paper_format));
    }
    doc.push_str("</style>\n");
    if options.has_diagrams {
        doc.push_str(&diagram_script(&options.mermaid_script_url));
    }
    doc.push_str("</head>\n<body>\n");

    if let Some(text) = &options.watermark {
        doc.push_str(&format!(
            "<div class=\"watermark\" aria-hidden=\"true\">{}</div>\n",
            escape_html(text)
        ));
    }

    doc.push_str("<div class=\"page\">\n<div class=\"content\">\n");
    doc.push_str(body);
    doc.push_str("</div>\n</div>\n</body>\n</html>\n");
    doc
}

/// Page size directive and page box.
fn page_css(format: PaperFormat, orientation: PaperOrientation) -> String {
    let (width, height) = format.css_dimensions();
    format!(
        "@page {{ size: {keyword} {orientation}; }}\n\
         html, body {{ margin: 0; padding: 0; }}\n\
         @media screen {{ .page {{ width: {width}; min-height: {height}; margin: 0 auto; box-sizing: border-box; }} }}\n\
         .content {{ position: relative; z-index: 1; }}\n\
         .content pre, .content table, .content img, .mermaid {{ page-break-inside: avoid; break-inside: avoid; }}\n\
         .content h1, .content h2, .content h3 {{ page-break-after: avoid; break-after: avoid; }}\n\
         .mermaid {{ text-align: center; margin: 1em 0; }}\n",
        keyword = format.css_keyword(),
        orientation = orientation.name(),
    )
}

/// Decorative diagonal overlay; never intercepts pointer events or selection.
fn watermark_css(format: PaperFormat) -> String {
    let (width, _) = format.css_dimensions();
    format!(
        ".watermark {{ position: fixed; top: 50%; left: 50%; \
         transform: translate(-50%, -50%) rotate(-45deg); \
         font-size: calc({width} * 0.14); font-weight: bold; white-space: nowrap; \
         color: #000; opacity: 0.1; z-index: 1000; \
         pointer-events: none; user-select: none; -webkit-user-select: none; }}\n"
    )
}

/// Load Mermaid and render every `.mermaid` container once the DOM is ready.
///
/// The settled flag is raised on success, on failure, and when the library
/// never loaded, so the renderer's wait is always bounded.
fn diagram_script(script_url: &str) -> String {
    format!(
        r#"<script src="{url}"></script>
<script>
(function () {{
  function settled() {{
    window.mermaidRendered = true;
    window.dispatchEvent(new Event('{event}'));
  }}
  window.mermaidRendered = false;
  if (typeof mermaid === 'undefined') {{
    console.error('Mermaid library failed to load');
    settled();
    return;
  }}
  mermaid.initialize({{
    startOnLoad: false,
    securityLevel: 'loose',
    theme: 'default',
    flowchart: {{ useMaxWidth: false }}
  }});
  document.addEventListener('DOMContentLoaded', function () {{
    mermaid.run({{ querySelector: '.mermaid' }})
      .then(settled)
      .catch(function (err) {{
        console.error('Mermaid rendering failed', err);
        settled();
      }});
  }});
}})();
</script>
"#,
        url = escape_html(script_url),
        event = DIAGRAMS_SETTLED_EVENT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn opts() -> ComposeOptions {
        ComposeOptions {
            title: "report".into(),
            paper_format: PaperFormat::Letter,
            paper_orientation: PaperOrientation::Portrait,
            watermark: None,
            has_diagrams: false,
            mermaid_script_url: "https://example.test/mermaid.js".into(),
        }
    }

    #[test]
    fn body_is_wrapped_in_content_layer() {
        let doc = compose("<p>hello</p>\n", &opts());
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<div class=\"content\">\n<p>hello</p>\n</div>"));
        assert!(doc.contains("<title>report</title>"));
    }

    #[test]
    fn page_css_interpolates_format_and_orientation() {
        let css = page_css(PaperFormat::A4, PaperOrientation::Landscape);
        let first = css.lines().next().unwrap();
        assert_eq!(first, "@page { size: A4 landscape; }");
        // Orientation is left to the size directive; the box is not swapped.
        assert!(css.contains("width: 210mm; min-height: 297mm;"));
    }

    #[test]
    fn watermark_present_exactly_once() {
        let doc = compose(
            "<p>x</p>",
            &ComposeOptions {
                watermark: Some("DRAFT".into()),
                ..opts()
            },
        );
        assert_eq!(doc.matches("class=\"watermark\"").count(), 1);
        assert!(doc.contains(">DRAFT</div>"));
        assert!(doc.contains("rotate(-45deg)"));
        assert!(doc.contains("pointer-events: none"));
        assert!(doc.contains("calc(8.5in * 0.14)"));
    }

    #[test]
    fn no_watermark_by_default() {
        let doc = compose("<p>x</p>", &opts());
        assert!(!doc.contains("watermark"));
    }

    #[test]
    fn diagram_script_only_with_diagrams() {
        let plain = compose("<p>x</p>", &opts());
        assert!(!plain.contains("<script"));

        let doc = compose(
            "<div class=\"mermaid\">pie</div>",
            &ComposeOptions {
                has_diagrams: true,
                ..opts()
            },
        );
        assert!(doc.contains("<script src=\"https://example.test/mermaid.js\"></script>"));
        assert!(doc.contains("securityLevel: 'loose'"));
        assert!(doc.contains("useMaxWidth: false"));
        // Both the success and the failure path raise the flag.
        assert_eq!(doc.matches("settled();").count(), 2);
        assert!(doc.contains(".then(settled)"));
        assert!(doc.contains(DIAGRAMS_SETTLED_EVENT));
    }
}
