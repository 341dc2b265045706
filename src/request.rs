//! The per-call conversion request and its validation.
//!
//! Field names follow the tool's JSON input schema (camelCase). Validation
//! happens before any pipeline stage runs, so a malformed watermark or border
//! never produces a half-written file.

use crate::config::{CssLength, PaperFormat, PaperOrientation};
use crate::error::Md2PdfError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default output filename when the caller supplies none.
pub const DEFAULT_OUTPUT_FILENAME: &str = "output.pdf";

/// Default page border.
pub const DEFAULT_PAPER_BORDER: &str = "2cm";

/// Maximum watermark length, in characters.
pub const WATERMARK_MAX_CHARS: usize = 15;

/// Pattern for `paperBorder`, mirrored in the tool's input schema.
pub const PAPER_BORDER_PATTERN: &str = r"^[0-9]+(\.[0-9]+)?(mm|cm|in|px)$";

/// Pattern for `watermark`, mirrored in the tool's input schema.
pub const WATERMARK_PATTERN: &str = r"^[A-Z0-9\s-]+$";

static PAPER_BORDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(PAPER_BORDER_PATTERN).unwrap());
static WATERMARK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(WATERMARK_PATTERN).unwrap());

/// One `create_pdf_from_markdown` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    /// Markdown source. Required.
    pub markdown: String,

    /// Output filename or path. `.pdf` is appended when missing.
    #[serde(default = "default_output_filename")]
    pub output_filename: String,

    #[serde(default)]
    pub paper_format: PaperFormat,

    #[serde(default)]
    pub paper_orientation: PaperOrientation,

    /// CSS length used as the page margin on all four sides.
    #[serde(default = "default_paper_border")]
    pub paper_border: String,

    /// Diagonal overlay text. Empty means no watermark.
    #[serde(default)]
    pub watermark: String,
}

fn default_output_filename() -> String {
    DEFAULT_OUTPUT_FILENAME.to_string()
}

fn default_paper_border() -> String {
    DEFAULT_PAPER_BORDER.to_string()
}

impl ConversionRequest {
    /// A request for `markdown` with every option at its default.
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            output_filename: default_output_filename(),
            paper_format: PaperFormat::default(),
            paper_orientation: PaperOrientation::default(),
            paper_border: default_paper_border(),
            watermark: String::new(),
        }
    }

    pub fn with_output_filename(mut self, name: impl Into<String>) -> Self {
        self.output_filename = name.into();
        self
    }

    pub fn with_paper_format(mut self, format: PaperFormat) -> Self {
        self.paper_format = format;
        self
    }

    pub fn with_paper_orientation(mut self, orientation: PaperOrientation) -> Self {
        self.paper_orientation = orientation;
        self
    }

    pub fn with_paper_border(mut self, border: impl Into<String>) -> Self {
        self.paper_border = border.into();
        self
    }

    pub fn with_watermark(mut self, text: impl Into<String>) -> Self {
        self.watermark = text.into();
        self
    }

    /// Parse a request from tool-call arguments and validate it.
    pub fn from_arguments(args: serde_json::Value) -> Result<Self, Md2PdfError> {
        let request: Self =
            serde_json::from_value(args).map_err(|e| Md2PdfError::InvalidInput {
                field: "arguments",
                reason: e.to_string(),
            })?;
        request.validate()?;
        Ok(request)
    }

    /// Check field patterns and limits.
    pub fn validate(&self) -> Result<(), Md2PdfError> {
        if !PAPER_BORDER_RE.is_match(&self.paper_border) {
            return Err(Md2PdfError::InvalidInput {
                field: "paperBorder",
                reason: format!(
                    "'{}' must be a number followed by mm, cm, in or px (e.g. 2cm)",
                    self.paper_border
                ),
            });
        }

        if !self.watermark.is_empty() {
            let chars = self.watermark.chars().count();
            if chars > WATERMARK_MAX_CHARS {
                return Err(Md2PdfError::InvalidInput {
                    field: "watermark",
                    reason: format!(
                        "must be at most {WATERMARK_MAX_CHARS} characters, got {chars}"
                    ),
                });
            }
            if !WATERMARK_RE.is_match(&self.watermark) {
                return Err(Md2PdfError::InvalidInput {
                    field: "watermark",
                    reason: "only uppercase letters, digits, spaces and hyphens are allowed"
                        .into(),
                });
            }
        }

        Ok(())
    }

    /// The validated border as a typed length.
    pub fn border(&self) -> Result<CssLength, Md2PdfError> {
        self.paper_border
            .parse()
            .map_err(|reason| Md2PdfError::InvalidInput {
                field: "paperBorder",
                reason,
            })
    }

    /// Watermark text, or None when no overlay should be drawn.
    pub fn watermark_text(&self) -> Option<&str> {
        let w = self.watermark.trim();
        if w.is_empty() {
            None
        } else {
            Some(w)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_from_minimal_arguments() {
        let r = ConversionRequest::from_arguments(json!({ "markdown": "# Hi" })).unwrap();
        assert_eq!(r.output_filename, "output.pdf");
        assert_eq!(r.paper_format, PaperFormat::Letter);
        assert_eq!(r.paper_orientation, PaperOrientation::Portrait);
        assert_eq!(r.paper_border, "2cm");
        assert!(r.watermark_text().is_none());
        assert_eq!(r, ConversionRequest::new("# Hi"));
    }

    #[test]
    fn camel_case_fields() {
        let r = ConversionRequest::from_arguments(json!({
            "markdown": "x",
            "outputFilename": "report",
            "paperFormat": "a4",
            "paperOrientation": "landscape",
            "paperBorder": "1.5in",
            "watermark": "DRAFT"
        }))
        .unwrap();
        assert_eq!(r.output_filename, "report");
        assert_eq!(r.paper_format, PaperFormat::A4);
        assert!(r.paper_orientation.is_landscape());
        assert!((r.border().unwrap().to_inches() - 1.5).abs() < f64::EPSILON);
        assert_eq!(r.watermark_text(), Some("DRAFT"));
    }

    #[test]
    fn missing_markdown_is_rejected() {
        let err = ConversionRequest::from_arguments(json!({ "outputFilename": "a.pdf" }))
            .unwrap_err();
        assert!(err.to_string().contains("markdown"), "got: {err}");
    }

    #[test]
    fn long_watermark_is_rejected() {
        let err = ConversionRequest::new("x")
            .with_watermark("toolongwatermarktext")
            .validate()
            .unwrap_err();
        assert!(matches!(err, Md2PdfError::InvalidInput { field: "watermark", .. }));
    }

    #[test]
    fn lowercase_watermark_is_rejected() {
        assert!(ConversionRequest::new("x")
            .with_watermark("draft")
            .validate()
            .is_err());
        assert!(ConversionRequest::new("x")
            .with_watermark("DO NOT-COPY 2")
            .validate()
            .is_ok());
    }

    #[test]
    fn bad_border_is_rejected() {
        for bad in ["2", "2pt", "two cm", "-1cm", ""] {
            let err = ConversionRequest::new("x")
                .with_paper_border(bad)
                .validate()
                .unwrap_err();
            assert!(
                matches!(err, Md2PdfError::InvalidInput { field: "paperBorder", .. }),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn unknown_paper_format_is_rejected() {
        assert!(ConversionRequest::from_arguments(json!({
            "markdown": "x",
            "paperFormat": "b5"
        }))
        .is_err());
    }
}
