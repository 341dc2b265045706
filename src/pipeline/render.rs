//! PDF rendering: load the composed page in headless Chrome and print it.
//!
//! ## Why spawn_blocking?
//!
//! `headless_chrome` drives the DevTools protocol with blocking calls and
//! sleeps through the settle window. [`render_pdf`] moves the whole session
//! onto the blocking pool and bounds it with a hard timeout, so a hung
//! browser can never stall the server's Tokio workers.
//!
//! ## Why a trait?
//!
//! The browser is infrastructure, not logic. [`PdfRenderer`] is the seam:
//! [`ChromeRenderer`] is the production backend, and callers (tests, hosts
//! with a browser pool) can inject their own through
//! [`crate::config::ConversionConfigBuilder::renderer`].
//!
//! ## Abandoned renders
//!
//! A timed-out blocking task cannot be killed, only abandoned. [`render_pdf`]
//! raises [`RenderJob::cancelled`] when the budget runs out; backends check it
//! before printing and [`write_pdf`] checks it again before the PDF lands.
//! The PDF is written to a temporary file next to the target and moved into
//! place without clobbering, so a failed or abandoned render leaves nothing
//! at `pdf_path`.

use super::compose::DIAGRAMS_SETTLED_JS;
use super::highlight::Highlighter;
use crate::config::{ConversionConfig, CssLength, PaperFormat, PaperOrientation};
use crate::error::Md2PdfError;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Built-in page stylesheet.
pub const DEFAULT_PAGE_CSS: &str = include_str!("../../assets/document.css");

/// Footer used when page numbers are on and no runnings file is configured.
pub const PAGE_NUMBER_FOOTER: &str =
    r#"<span class="pageNumber"></span> / <span class="totalPages"></span>"#;

/// Extra time on top of load timeout and settle delay for browser start-up
/// and printing.
pub const RENDER_GRACE_MS: u64 = 30_000;

/// Renders a composed HTML file to a PDF file.
pub trait PdfRenderer: Send + Sync {
    /// Returns `Ok(true)` when a PDF was written to `job.pdf_path`.
    fn render(&self, job: &RenderJob) -> Result<bool, Md2PdfError>;
}

/// Everything the renderer needs for one document.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub html_path: PathBuf,
    pub pdf_path: PathBuf,
    pub assets: PageAssets,
    pub paper_format: PaperFormat,
    pub paper_orientation: PaperOrientation,
    pub paper_border: CssLength,
    pub render_delay_ms: u64,
    pub load_timeout_ms: u64,
    pub has_diagrams: bool,
    /// Raised by [`render_pdf`] once the caller has given up on this job.
    pub cancelled: Arc<AtomicBool>,
}

impl RenderJob {
    pub fn html_url(&self) -> String {
        format!("file://{}", self.html_path.display())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// ── Output ───────────────────────────────────────────────────────────────

/// Move rendered bytes to `job.pdf_path`.
///
/// Returns `Ok(false)` without touching the target when the job was
/// cancelled or the print produced nothing. Never replaces an existing file.
pub fn write_pdf(job: &RenderJob, bytes: &[u8]) -> Result<bool, Md2PdfError> {
    if job.is_cancelled() {
        warn!("Render of {} abandoned; discarding output", job.pdf_path.display());
        return Ok(false);
    }
    if bytes.is_empty() {
        warn!("Renderer produced an empty PDF for {}", job.pdf_path.display());
        return Ok(false);
    }

    let write_err = |source: std::io::Error| Md2PdfError::OutputWriteFailed {
        path: job.pdf_path.clone(),
        source,
    };
    let dir = match job.pdf_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut part = tempfile::Builder::new()
        .prefix(".")
        .suffix(".pdf.part")
        .tempfile_in(dir)
        .map_err(write_err)?;
    part.write_all(bytes).map_err(write_err)?;

    // The budget may have run out during the write.
    if job.is_cancelled() {
        warn!("Render of {} abandoned; discarding output", job.pdf_path.display());
        return Ok(false);
    }
    part.persist_noclobber(&job.pdf_path)
        .map_err(|e| write_err(e.error))?;

    info!("Wrote {} bytes to {}", bytes.len(), job.pdf_path.display());
    Ok(true)
}

// ── Runnings ─────────────────────────────────────────────────────────────

/// One running region (header or footer).
///
/// `contents` is an HTML template; Chrome fills elements with the classes
/// `pageNumber`, `totalPages`, `title` and `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Running {
    #[serde(default = "default_running_height")]
    pub height: String,
    pub contents: String,
}

fn default_running_height() -> String {
    "1cm".to_string()
}

/// Header and footer repeated on every page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Runnings {
    #[serde(default)]
    pub header: Option<Running>,
    #[serde(default)]
    pub footer: Option<Running>,
}

impl Runnings {
    /// Read a JSON runnings definition.
    pub fn load(path: &Path) -> Result<Self, Md2PdfError> {
        let text = std::fs::read_to_string(path).map_err(|e| Md2PdfError::AssetLoadFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| Md2PdfError::AssetLoadFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// A centred `N / M` footer and no header.
    pub fn page_numbers() -> Self {
        Self {
            header: None,
            footer: Some(Running {
                height: default_running_height(),
                contents: PAGE_NUMBER_FOOTER.to_string(),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_none() && self.footer.is_none()
    }
}

/// Stylesheets and runnings resolved from configuration.
#[derive(Debug, Clone, Default)]
pub struct PageAssets {
    pub page_css: String,
    pub highlight_css: String,
    pub runnings: Runnings,
}

impl PageAssets {
    /// Load configured files, falling back to the built-in defaults.
    pub fn load(config: &ConversionConfig, highlighter: &Highlighter) -> Result<Self, Md2PdfError> {
        let page_css = match &config.css_path {
            Some(path) => read_asset(path)?,
            None => DEFAULT_PAGE_CSS.to_string(),
        };
        let highlight_css = match &config.highlight_css_path {
            Some(path) => read_asset(path)?,
            None => highlighter.stylesheet()?,
        };
        let runnings = match &config.runnings_path {
            Some(path) => Runnings::load(path)?,
            None if config.show_page_numbers => Runnings::page_numbers(),
            None => Runnings::default(),
        };
        Ok(Self {
            page_css,
            highlight_css,
            runnings,
        })
    }
}

fn read_asset(path: &Path) -> Result<String, Md2PdfError> {
    std::fs::read_to_string(path).map_err(|e| Md2PdfError::AssetLoadFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

// ── Print options ────────────────────────────────────────────────────────

fn running_template(running: Option<&Running>) -> String {
    match running {
        Some(r) => format!(
            "<div style=\"width: 100%; font-size: 9px; color: #666; text-align: center; \
             padding: 0 1cm;\">{}</div>",
            r.contents
        ),
        // Chrome substitutes its own date/URL template for a missing one.
        None => "<span></span>".to_string(),
    }
}

fn margin_for(running: Option<&Running>, border_in: f64) -> f64 {
    running
        .and_then(|r| r.height.parse::<CssLength>().ok())
        .map(|h| h.to_inches().max(border_in))
        .unwrap_or(border_in)
}

/// Chrome print settings for a job.
pub fn print_options(job: &RenderJob) -> PrintToPdfOptions {
    let (width, height) = job.paper_format.inches();
    let border = job.paper_border.to_inches();
    let runnings = &job.assets.runnings;
    let with_runnings = !runnings.is_empty();

    PrintToPdfOptions {
        landscape: Some(job.paper_orientation.is_landscape()),
        display_header_footer: Some(with_runnings),
        print_background: Some(true),
        scale: Some(1.0),
        paper_width: Some(width),
        paper_height: Some(height),
        margin_top: Some(margin_for(runnings.header.as_ref(), border)),
        margin_bottom: Some(margin_for(runnings.footer.as_ref(), border)),
        margin_left: Some(border),
        margin_right: Some(border),
        header_template: with_runnings.then(|| running_template(runnings.header.as_ref())),
        footer_template: with_runnings.then(|| running_template(runnings.footer.as_ref())),
        prefer_css_page_size: Some(false),
        ..Default::default()
    }
}

/// JS that appends `css` to the document head.
fn style_injection(css: &str) -> Result<String, Md2PdfError> {
    let literal = serde_json::to_string(css)
        .map_err(|e| Md2PdfError::Internal(format!("stylesheet encoding: {e}")))?;
    Ok(format!(
        "(function () {{ var s = document.createElement('style'); s.textContent = {literal}; \
         document.head.appendChild(s); return true; }})()"
    ))
}

// ── Chrome backend ───────────────────────────────────────────────────────

/// Headless Chrome backend; one browser process per document.
#[derive(Debug, Clone, Default)]
pub struct ChromeRenderer {
    chrome_path: Option<PathBuf>,
}

impl ChromeRenderer {
    pub fn new(chrome_path: Option<PathBuf>) -> Self {
        Self { chrome_path }
    }

    fn launch(&self, idle: Duration) -> Result<Browser, Md2PdfError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .path(self.chrome_path.clone())
            .idle_browser_timeout(idle)
            .build()
            .map_err(|e| Md2PdfError::BrowserLaunch(e.to_string()))?;
        Browser::new(options).map_err(|e| Md2PdfError::BrowserLaunch(e.to_string()))
    }
}

/// Map a browser error during page load to a timeout or a generic failure.
fn classify_load_error(e: impl std::fmt::Display, timeout_ms: u64) -> Md2PdfError {
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") || lower.contains("never came") {
        Md2PdfError::RenderTimeout {
            stage: "load",
            ms: timeout_ms,
        }
    } else {
        Md2PdfError::RenderFailed(format!("page load: {msg}"))
    }
}

impl PdfRenderer for ChromeRenderer {
    fn render(&self, job: &RenderJob) -> Result<bool, Md2PdfError> {
        let idle = Duration::from_millis(job.load_timeout_ms + job.render_delay_ms + RENDER_GRACE_MS);
        let browser = self.launch(idle)?;
        let tab = browser
            .new_tab()
            .map_err(|e| Md2PdfError::RenderFailed(format!("new tab: {e}")))?;
        tab.set_default_timeout(Duration::from_millis(job.load_timeout_ms));

        let load_start = Instant::now();
        tab.navigate_to(&job.html_url())
            .map_err(|e| classify_load_error(e, job.load_timeout_ms))?;
        tab.wait_until_navigated()
            .map_err(|e| classify_load_error(e, job.load_timeout_ms))?;
        debug!("Page loaded in {}ms", load_start.elapsed().as_millis());

        for css in [&job.assets.page_css, &job.assets.highlight_css] {
            if css.trim().is_empty() {
                continue;
            }
            tab.evaluate(&style_injection(css)?, false)
                .map_err(|e| Md2PdfError::RenderFailed(format!("stylesheet injection: {e}")))?;
        }

        std::thread::sleep(Duration::from_millis(job.render_delay_ms));

        if job.has_diagrams {
            let settled = tab
                .evaluate(DIAGRAMS_SETTLED_JS, false)
                .ok()
                .and_then(|r| r.value)
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if !settled {
                warn!(
                    "Diagrams had not finished rendering after {}ms; printing anyway",
                    job.render_delay_ms
                );
            }
        }

        if job.is_cancelled() {
            debug!("Render budget exhausted before print; skipping");
            return Ok(false);
        }

        let bytes = tab
            .print_to_pdf(Some(print_options(job)))
            .map_err(|e| Md2PdfError::RenderFailed(format!("print: {e}")))?;

        write_pdf(job, &bytes)
    }
}

// ── Async driver ─────────────────────────────────────────────────────────

/// Upper bound for one render: load timeout + settle delay + grace.
pub fn render_budget(job: &RenderJob) -> Duration {
    Duration::from_millis(job.load_timeout_ms + job.render_delay_ms + RENDER_GRACE_MS)
}

/// Run `renderer` on the blocking pool, bounded by `budget`.
///
/// On timeout the job is marked cancelled; the detached task then discards
/// its output.
pub async fn render_pdf(
    renderer: Arc<dyn PdfRenderer>,
    job: RenderJob,
    budget: Duration,
) -> Result<bool, Md2PdfError> {
    let cancelled = Arc::clone(&job.cancelled);
    let handle = tokio::task::spawn_blocking(move || renderer.render(&job));

    match tokio::time::timeout(budget, handle).await {
        Err(_) => {
            cancelled.store(true, Ordering::SeqCst);
            warn!("Render exceeded {}ms; abandoning", budget.as_millis());
            Err(Md2PdfError::RenderTimeout {
                stage: "render",
                ms: budget.as_millis() as u64,
            })
        }
        Ok(Err(e)) => Err(Md2PdfError::Internal(format!("Render task panicked: {e}"))),
        Ok(Ok(result)) => result,
    }
}
