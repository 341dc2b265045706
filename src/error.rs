//! Error types for the markdown2pdf-mcp library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Md2PdfError`] — **Fatal**: the conversion cannot produce a PDF
//!   (invalid request, browser unavailable, render timed out, output
//!   directory not writable). Returned as `Err(Md2PdfError)` from
//!   [`crate::convert`].
//!
//! * [`BlockError`] — **Non-fatal**: a single diagram or code block could not
//!   be processed as intended, but the document still renders. Collected in
//!   [`crate::output::ConversionOutput::issues`] so callers can report them
//!   without losing the whole document to one bad block.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the markdown2pdf-mcp library.
///
/// Block-level failures use [`BlockError`] and are recovered locally.
#[derive(Debug, Error)]
pub enum Md2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A request field failed validation; the pipeline never ran.
    #[error("Invalid '{field}': {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// A markdown source file given to the CLI could not be read.
    #[error("Failed to read markdown file '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Render errors ─────────────────────────────────────────────────────
    /// Page load or the overall render exceeded its time budget.
    #[error("Rendering timed out during {stage} after {ms}ms")]
    RenderTimeout { stage: &'static str, ms: u64 },

    /// Headless Chrome could not be started.
    #[error(
        "Failed to launch headless Chrome: {0}\n\
Install Chrome/Chromium or set M2P_CHROME_PATH to an existing binary."
    )]
    BrowserLaunch(String),

    /// The browser session failed, or the renderer reported no success.
    #[error("PDF rendering failed: {0}")]
    RenderFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the destination directory.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write the PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the temporary HTML document.
    #[error("Scratch file error: {0}")]
    ScratchFailed(#[source] std::io::Error),

    /// A configured stylesheet or runnings file could not be loaded.
    #[error("Failed to load asset '{path}': {detail}")]
    AssetLoadFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single block of the document.
///
/// The affected block degrades (error marker, unhighlighted code) while the
/// rest of the document renders normally.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum BlockError {
    /// A diagram placeholder could not be decoded back into its source.
    #[error("Diagram {index}: could not decode placeholder: {detail}")]
    DiagramDecode { index: usize, detail: String },

    /// Highlighting with the requested language failed; a fallback was used.
    #[error("Code block {index} ({language}): highlighting failed: {detail}")]
    Highlight {
        index: usize,
        language: String,
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_display() {
        let e = Md2PdfError::InvalidInput {
            field: "watermark",
            reason: "must be at most 15 characters".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("watermark"), "got: {msg}");
        assert!(msg.contains("15"), "got: {msg}");
    }

    #[test]
    fn render_timeout_display() {
        let e = Md2PdfError::RenderTimeout {
            stage: "load",
            ms: 30000,
        };
        assert!(e.to_string().contains("30000ms"));
        assert!(e.to_string().contains("load"));
    }

    #[test]
    fn browser_launch_mentions_override() {
        let e = Md2PdfError::BrowserLaunch("no chrome".into());
        assert!(e.to_string().contains("M2P_CHROME_PATH"));
    }

    #[test]
    fn block_error_display() {
        let e = BlockError::Highlight {
            index: 2,
            language: "rust".into(),
            detail: "boom".into(),
        };
        assert!(e.to_string().contains("Code block 2"));
        assert!(e.to_string().contains("rust"));

        let e = BlockError::DiagramDecode {
            index: 0,
            detail: "Invalid padding".into(),
        };
        assert!(e.to_string().starts_with("Diagram 0"));
    }
}
