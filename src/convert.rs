//! Conversion entry points.
//!
//! [`convert`] runs the whole pipeline for one request and returns only once
//! the PDF is on disk (or the call failed). Block-level problems never fail
//! the call; they are reported in [`ConversionOutput::issues`].

use crate::config::{ConversionConfig, CHROME_PATH_ENV};
use crate::error::Md2PdfError;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::compose::{self, ComposeOptions};
use crate::pipeline::highlight::Highlighter;
use crate::pipeline::render::{self, ChromeRenderer, PageAssets, PdfRenderer, RenderJob};
use crate::pipeline::scratch::ScratchSpace;
use crate::pipeline::{diagram, markdown, output_path};
use crate::request::ConversionRequest;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Convert a Markdown request to a PDF file.
///
/// # Errors
/// Returns `Err(Md2PdfError)` for fatal errors only:
/// - request validation failure (nothing is written)
/// - output directory not creatable
/// - browser launch, page load timeout, print or write failure
pub async fn convert(
    request: &ConversionRequest,
    config: &ConversionConfig,
    scratch: &ScratchSpace,
) -> Result<ConversionOutput, Md2PdfError> {
    let total_start = Instant::now();

    // ── Step 1: Validate ─────────────────────────────────────────────────
    request.validate()?;
    let border = request.border()?;

    // ── Step 2: Resolve output path ──────────────────────────────────────
    let output_dir = config
        .output_dir
        .clone()
        .unwrap_or_else(output_path::default_output_dir);
    let target = output_path::target_path(&output_dir, &request.output_filename)?;
    let pdf_path = output_path::resolve(&target)?;
    info!("Starting conversion → {}", pdf_path.display());

    // ── Step 3: Protect diagrams ─────────────────────────────────────────
    let protected = diagram::protect(&request.markdown);
    let has_diagrams = protected.has_diagrams();

    // ── Step 4: Markdown → HTML ──────────────────────────────────────────
    let highlighter = Highlighter::new(&config.highlight_theme)?;
    let rendered = markdown::render(&protected.text, &highlighter);

    // ── Step 5: Restore diagrams ─────────────────────────────────────────
    let (body, diagram_issues) = diagram::restore(&rendered.html);
    let mut issues = rendered.issues;
    issues.extend(diagram_issues);

    // ── Step 6: Compose the page ─────────────────────────────────────────
    let title = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let document = compose::compose(
        &body,
        &ComposeOptions {
            title,
            paper_format: request.paper_format,
            paper_orientation: request.paper_orientation,
            watermark: request.watermark_text().map(str::to_string),
            has_diagrams,
            mermaid_script_url: config.mermaid_script_url.clone(),
        },
    );

    // ── Step 7: Write scratch HTML ───────────────────────────────────────
    let html_file = scratch.create_html(&document)?;
    debug!("Scratch document at {}", html_file.path().display());

    // ── Step 8: Render ───────────────────────────────────────────────────
    let render_delay_ms = config.render_delay_for(has_diagrams);
    let job = RenderJob {
        html_path: html_file.path().to_path_buf(),
        pdf_path: pdf_path.clone(),
        assets: PageAssets::load(config, &highlighter)?,
        paper_format: request.paper_format,
        paper_orientation: request.paper_orientation,
        paper_border: border,
        render_delay_ms,
        load_timeout_ms: config.load_timeout_ms,
        has_diagrams,
        cancelled: Arc::default(),
    };
    let budget = render::render_budget(&job);

    let render_start = Instant::now();
    let ok = render::render_pdf(resolve_renderer(config), job, budget).await;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    // The scratch document is no longer needed, whatever the outcome.
    drop(html_file);

    if !ok? {
        return Err(Md2PdfError::RenderFailed(
            "renderer reported failure".to_string(),
        ));
    }

    let stats = ConversionStats {
        diagram_count: protected.diagram_count,
        code_blocks: rendered.code_blocks,
        highlighted_blocks: rendered.highlighted,
        render_delay_ms,
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} ({} diagrams, {}/{} code blocks highlighted, {}ms total)",
        pdf_path.display(),
        stats.diagram_count,
        stats.highlighted_blocks,
        stats.code_blocks,
        stats.total_duration_ms
    );

    Ok(ConversionOutput {
        path: pdf_path,
        stats,
        issues,
    })
}

/// Convert a Markdown file with default document options.
///
/// The output filename defaults to the input's stem (`notes.md` → `notes.pdf`).
pub async fn convert_file(
    input: impl AsRef<Path>,
    output_filename: Option<&str>,
    config: &ConversionConfig,
    scratch: &ScratchSpace,
) -> Result<ConversionOutput, Md2PdfError> {
    let input = input.as_ref();
    let markdown = tokio::fs::read_to_string(input)
        .await
        .map_err(|e| Md2PdfError::InputReadFailed {
            path: input.to_path_buf(),
            source: e,
        })?;

    let filename = match output_filename {
        Some(name) => name.to_string(),
        None => input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string()),
    };

    convert(
        &ConversionRequest::new(markdown).with_output_filename(filename),
        config,
        scratch,
    )
    .await
}

/// Use the pre-built renderer when one is configured, Chrome otherwise.
fn resolve_renderer(config: &ConversionConfig) -> Arc<dyn PdfRenderer> {
    match &config.renderer {
        Some(renderer) => Arc::clone(renderer),
        None => Arc::new(ChromeRenderer::new(
            config
                .chrome_path
                .clone()
                .or_else(|| std::env::var_os(CHROME_PATH_ENV).map(PathBuf::from)),
        )),
    }
}
