//! # markdown2pdf-mcp
//!
//! Convert Markdown documents to PDF through headless Chrome, exposed as a
//! single Model Context Protocol tool (`create_pdf_from_markdown`).
//!
//! Code blocks are syntax highlighted at conversion time, Mermaid diagrams are
//! rendered in the page by the Mermaid runtime, and an optional diagonal
//! watermark is printed on every page.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown
//!  │
//!  ├─ 1. Validate   border / watermark / filename
//!  ├─ 2. Target     non-clobbering absolute path (`report-1.pdf`, …)
//!  ├─ 3. Protect    mermaid fences → opaque tokens
//!  ├─ 4. Markdown   pulldown-cmark + syntect highlighting
//!  ├─ 5. Restore    tokens → <div class="mermaid">
//!  ├─ 6. Compose    page size, watermark, Mermaid bootstrap
//!  ├─ 7. Scratch    temporary .html (removed after the call)
//!  └─ 8. Render     headless Chrome, settle delay, print (spawn_blocking)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use markdown2pdf_mcp::{convert, ConversionConfig, ConversionRequest, ScratchSpace};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let scratch = ScratchSpace::new()?;
//!     let request = ConversionRequest::new("# Hello\n\n```rust\nfn main() {}\n```\n")
//!         .with_output_filename("hello.pdf")
//!         .with_watermark("DRAFT");
//!     let output = convert(&request, &config, &scratch).await?;
//!     println!("{}", output.message());
//!     scratch.drain();
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2pdf-mcp` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding the library:
//! ```toml
//! markdown2pdf-mcp = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod mcp;
pub mod output;
pub mod pipeline;
pub mod request;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, CssLength, LengthUnit, PaperFormat,
    PaperOrientation,
};
pub use convert::{convert, convert_file};
pub use error::{BlockError, Md2PdfError};
pub use output::{ConversionOutput, ConversionStats};
pub use pipeline::render::{ChromeRenderer, PdfRenderer, RenderJob};
pub use pipeline::scratch::ScratchSpace;
pub use request::ConversionRequest;
