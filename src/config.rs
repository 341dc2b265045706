//! Configuration types for Markdown-to-PDF conversion.
//!
//! Per-call document options (paper, border, watermark) arrive with each
//! [`crate::request::ConversionRequest`]. Settings fixed for the lifetime of
//! the process (render timing, stylesheets, browser binary, output directory)
//! live in [`ConversionConfig`], built via its [`ConversionConfigBuilder`].

use crate::error::Md2PdfError;
use crate::pipeline::render::PdfRenderer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Settle delay after page load for documents without diagrams.
pub const DEFAULT_RENDER_DELAY_MS: u64 = 500;

/// Settle delay used whenever the document contains at least one diagram.
/// Mermaid layout runs client-side after load and is far slower than text.
pub const DEFAULT_DIAGRAM_RENDER_DELAY_MS: u64 = 3000;

/// Upper bound on page load (navigation) time.
pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 30_000;

/// Where the page fetches the Mermaid runtime from.
pub const DEFAULT_MERMAID_SCRIPT_URL: &str =
    "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.min.js";

/// syntect theme used for the generated highlight stylesheet.
pub const DEFAULT_HIGHLIGHT_THEME: &str = "InspiredGitHub";

/// Environment variable overriding the default output directory.
pub const OUTPUT_DIR_ENV: &str = "M2P_OUTPUT_DIR";

/// Environment variable pointing at a Chrome/Chromium binary.
pub const CHROME_PATH_ENV: &str = "M2P_CHROME_PATH";

/// Process-wide configuration for Markdown-to-PDF conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use markdown2pdf_mcp::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .render_delay_ms(250)
///     .load_timeout_ms(10_000)
///     .show_page_numbers(false)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Settle delay after load for plain documents. Default: 500 ms.
    pub render_delay_ms: u64,

    /// Settle delay after load when diagrams are present. Default: 3000 ms.
    ///
    /// Never lower than `render_delay_ms`; the builder rejects that.
    pub diagram_render_delay_ms: u64,

    /// Page load timeout. Default: 30 s. Exceeding it fails the call with
    /// [`Md2PdfError::RenderTimeout`]; there is no retry.
    pub load_timeout_ms: u64,

    /// Directory for relative output filenames. If None, resolved from
    /// `M2P_OUTPUT_DIR`, then the home directory, then the working directory.
    pub output_dir: Option<PathBuf>,

    /// Extra page stylesheet. If None, the built-in stylesheet is used.
    pub css_path: Option<PathBuf>,

    /// Highlight stylesheet. If None, generated from `highlight_theme`.
    pub highlight_css_path: Option<PathBuf>,

    /// JSON runnings (header/footer) definition. If None, a page-number
    /// footer is used when `show_page_numbers` is set.
    pub runnings_path: Option<PathBuf>,

    /// Print `N / M` page numbers in the default footer. Default: true.
    pub show_page_numbers: bool,

    /// syntect theme name for the generated highlight stylesheet.
    pub highlight_theme: String,

    /// Mermaid runtime URL injected into documents that contain diagrams.
    pub mermaid_script_url: String,

    /// Chrome/Chromium binary. If None, headless_chrome auto-detects one.
    pub chrome_path: Option<PathBuf>,

    /// Pre-constructed renderer. Takes precedence over the Chrome backend.
    pub renderer: Option<Arc<dyn PdfRenderer>>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            render_delay_ms: DEFAULT_RENDER_DELAY_MS,
            diagram_render_delay_ms: DEFAULT_DIAGRAM_RENDER_DELAY_MS,
            load_timeout_ms: DEFAULT_LOAD_TIMEOUT_MS,
            output_dir: None,
            css_path: None,
            highlight_css_path: None,
            runnings_path: None,
            show_page_numbers: true,
            highlight_theme: DEFAULT_HIGHLIGHT_THEME.to_string(),
            mermaid_script_url: DEFAULT_MERMAID_SCRIPT_URL.to_string(),
            chrome_path: None,
            renderer: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("render_delay_ms", &self.render_delay_ms)
            .field("diagram_render_delay_ms", &self.diagram_render_delay_ms)
            .field("load_timeout_ms", &self.load_timeout_ms)
            .field("output_dir", &self.output_dir)
            .field("css_path", &self.css_path)
            .field("highlight_css_path", &self.highlight_css_path)
            .field("runnings_path", &self.runnings_path)
            .field("show_page_numbers", &self.show_page_numbers)
            .field("highlight_theme", &self.highlight_theme)
            .field("mermaid_script_url", &self.mermaid_script_url)
            .field("chrome_path", &self.chrome_path)
            .field("renderer", &self.renderer.as_ref().map(|_| "<dyn PdfRenderer>"))
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Settle delay for a document: the diagram delay whenever diagrams are
    /// present, the base delay otherwise.
    pub fn render_delay_for(&self, has_diagrams: bool) -> u64 {
        if has_diagrams {
            self.diagram_render_delay_ms
        } else {
            self.render_delay_ms
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn render_delay_ms(mut self, ms: u64) -> Self {
        self.config.render_delay_ms = ms;
        self
    }

    pub fn diagram_render_delay_ms(mut self, ms: u64) -> Self {
        self.config.diagram_render_delay_ms = ms;
        self
    }

    pub fn load_timeout_ms(mut self, ms: u64) -> Self {
        self.config.load_timeout_ms = ms;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn css_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.css_path = Some(path.into());
        self
    }

    pub fn highlight_css_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.highlight_css_path = Some(path.into());
        self
    }

    pub fn runnings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.runnings_path = Some(path.into());
        self
    }

    pub fn show_page_numbers(mut self, v: bool) -> Self {
        self.config.show_page_numbers = v;
        self
    }

    pub fn highlight_theme(mut self, theme: impl Into<String>) -> Self {
        self.config.highlight_theme = theme.into();
        self
    }

    pub fn mermaid_script_url(mut self, url: impl Into<String>) -> Self {
        self.config.mermaid_script_url = url.into();
        self
    }

    pub fn chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn PdfRenderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Md2PdfError> {
        let c = &self.config;
        if c.load_timeout_ms == 0 {
            return Err(Md2PdfError::InvalidConfig(
                "Load timeout must be > 0 ms".into(),
            ));
        }
        if c.diagram_render_delay_ms < c.render_delay_ms {
            return Err(Md2PdfError::InvalidConfig(format!(
                "Diagram render delay ({}ms) must not be shorter than the base delay ({}ms)",
                c.diagram_render_delay_ms, c.render_delay_ms
            )));
        }
        if c.mermaid_script_url.trim().is_empty() {
            return Err(Md2PdfError::InvalidConfig(
                "Mermaid script URL must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Paper size of the produced PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperFormat {
    #[default]
    Letter,
    A4,
    A3,
    A5,
    Legal,
    Tabloid,
}

impl PaperFormat {
    pub const ALL: [PaperFormat; 6] = [
        PaperFormat::Letter,
        PaperFormat::A4,
        PaperFormat::A3,
        PaperFormat::A5,
        PaperFormat::Legal,
        PaperFormat::Tabloid,
    ];

    /// Wire name, as accepted in requests.
    pub fn name(self) -> &'static str {
        match self {
            PaperFormat::Letter => "letter",
            PaperFormat::A4 => "a4",
            PaperFormat::A3 => "a3",
            PaperFormat::A5 => "a5",
            PaperFormat::Legal => "legal",
            PaperFormat::Tabloid => "tabloid",
        }
    }

    /// CSS `@page { size }` keyword. CSS calls 11×17in "ledger".
    pub fn css_keyword(self) -> &'static str {
        match self {
            PaperFormat::Letter => "letter",
            PaperFormat::A4 => "A4",
            PaperFormat::A3 => "A3",
            PaperFormat::A5 => "A5",
            PaperFormat::Legal => "legal",
            PaperFormat::Tabloid => "ledger",
        }
    }

    /// Portrait page box as CSS lengths `(width, height)`.
    pub fn css_dimensions(self) -> (&'static str, &'static str) {
        match self {
            PaperFormat::Letter => ("8.5in", "11in"),
            PaperFormat::Legal => ("8.5in", "14in"),
            PaperFormat::Tabloid => ("11in", "17in"),
            PaperFormat::A3 => ("297mm", "420mm"),
            PaperFormat::A4 => ("210mm", "297mm"),
            PaperFormat::A5 => ("148mm", "210mm"),
        }
    }

    /// Portrait page box in inches `(width, height)`, for the print call.
    pub fn inches(self) -> (f64, f64) {
        match self {
            PaperFormat::Letter => (8.5, 11.0),
            PaperFormat::Legal => (8.5, 14.0),
            PaperFormat::Tabloid => (11.0, 17.0),
            PaperFormat::A3 => (297.0 / 25.4, 420.0 / 25.4),
            PaperFormat::A4 => (210.0 / 25.4, 297.0 / 25.4),
            PaperFormat::A5 => (148.0 / 25.4, 210.0 / 25.4),
        }
    }
}

impl fmt::Display for PaperFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Page orientation of the produced PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperOrientation {
    #[default]
    Portrait,
    Landscape,
}

impl PaperOrientation {
    pub fn name(self) -> &'static str {
        match self {
            PaperOrientation::Portrait => "portrait",
            PaperOrientation::Landscape => "landscape",
        }
    }

    pub fn is_landscape(self) -> bool {
        self == PaperOrientation::Landscape
    }
}

impl fmt::Display for PaperOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Units accepted for the page border.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    Mm,
    Cm,
    In,
    Px,
}

impl LengthUnit {
    fn suffix(self) -> &'static str {
        match self {
            LengthUnit::Mm => "mm",
            LengthUnit::Cm => "cm",
            LengthUnit::In => "in",
            LengthUnit::Px => "px",
        }
    }

    fn per_inch(self) -> f64 {
        match self {
            LengthUnit::Mm => 25.4,
            LengthUnit::Cm => 2.54,
            LengthUnit::In => 1.0,
            LengthUnit::Px => 96.0,
        }
    }
}

/// A non-negative CSS length such as `2cm` or `0.5in`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CssLength {
    pub value: f64,
    pub unit: LengthUnit,
}

impl CssLength {
    pub fn to_inches(self) -> f64 {
        self.value / self.unit.per_inch()
    }
}

impl Default for CssLength {
    fn default() -> Self {
        Self {
            value: 2.0,
            unit: LengthUnit::Cm,
        }
    }
}

impl FromStr for CssLength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let unit = [LengthUnit::Mm, LengthUnit::Cm, LengthUnit::In, LengthUnit::Px]
            .into_iter()
            .find(|u| s.ends_with(u.suffix()))
            .ok_or_else(|| format!("'{s}' must end in mm, cm, in or px"))?;
        let number = &s[..s.len() - unit.suffix().len()];
        let well_formed = !number.is_empty()
            && !number.starts_with('.')
            && !number.ends_with('.')
            && number.chars().filter(|&c| c == '.').count() <= 1
            && number.chars().all(|c| c.is_ascii_digit() || c == '.');
        if !well_formed {
            return Err(format!("'{s}' is not a valid CSS length (e.g. 2cm, 0.5in)"));
        }
        let value = number
            .parse::<f64>()
            .map_err(|e| format!("'{s}': {e}"))?;
        Ok(Self { value, unit })
    }
}

impl fmt::Display for CssLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}
