//! CLI binary for markdown2pdf-mcp.
//!
//! `serve` (the default) runs the MCP stdio server; `convert` runs a single
//! conversion. Both are thin shims that map flags onto `ConversionConfig`.
//! Logs go to stderr; stdout belongs to the protocol.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use markdown2pdf_mcp::config::{
    DEFAULT_DIAGRAM_RENDER_DELAY_MS, DEFAULT_HIGHLIGHT_THEME, DEFAULT_LOAD_TIMEOUT_MS,
    DEFAULT_MERMAID_SCRIPT_URL, DEFAULT_RENDER_DELAY_MS,
};
use markdown2pdf_mcp::{convert_file, mcp, ConversionConfig, ScratchSpace};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run as an MCP server (stdio)
  md2pdf-mcp

  # Convert one file, writing notes.pdf to the output directory
  md2pdf-mcp convert notes.md

  # Explicit output name and Chrome binary
  md2pdf-mcp --chrome-path /usr/bin/chromium convert notes.md -o handout.pdf

MCP CLIENT CONFIGURATION:
  {
    "mcpServers": {
      "markdown2pdf": {
        "command": "md2pdf-mcp",
        "env": { "M2P_OUTPUT_DIR": "/home/me/pdfs" }
      }
    }
  }

ENVIRONMENT VARIABLES:
  M2P_OUTPUT_DIR     Directory for relative output filenames (default: home)
  M2P_CHROME_PATH    Chrome/Chromium binary (default: auto-detect)
  RUST_LOG           Log filter, e.g. markdown2pdf_mcp=debug
"#;

/// Convert Markdown to PDF over the Model Context Protocol.
#[derive(Parser, Debug)]
#[command(
    name = "md2pdf-mcp",
    version,
    about = "Convert Markdown to PDF over the Model Context Protocol",
    long_about = "Convert Markdown to PDF with syntax highlighting, Mermaid diagrams and \
watermarks. Runs as an MCP stdio server by default, or converts a single file with \
the `convert` subcommand.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    render: RenderArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "M2P_VERBOSE")]
    verbose: bool,

    /// Suppress all logs except errors.
    #[arg(short, long, global = true, env = "M2P_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server on stdin/stdout (default).
    Serve,

    /// Convert one Markdown file and print the PDF path.
    Convert {
        /// Markdown file to convert.
        input: PathBuf,

        /// Output filename or path (default: input stem + .pdf).
        #[arg(short, long)]
        output: Option<String>,

        /// Print the full result (path, stats, issues) as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Directory for relative output filenames.
    #[arg(long, global = true, env = "M2P_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Chrome/Chromium binary.
    #[arg(long, global = true, env = "M2P_CHROME_PATH")]
    chrome_path: Option<PathBuf>,

    /// Page stylesheet replacing the built-in one.
    #[arg(long, global = true, env = "M2P_CSS")]
    css: Option<PathBuf>,

    /// Code highlighting stylesheet replacing the generated one.
    #[arg(long, global = true, env = "M2P_HIGHLIGHT_CSS")]
    highlight_css: Option<PathBuf>,

    /// JSON header/footer definition.
    #[arg(long, global = true, env = "M2P_RUNNINGS")]
    runnings: Option<PathBuf>,

    /// Omit the default page-number footer.
    #[arg(long, global = true, env = "M2P_NO_PAGE_NUMBERS")]
    no_page_numbers: bool,

    /// syntect theme for code highlighting.
    #[arg(long, global = true, env = "M2P_HIGHLIGHT_THEME", default_value = DEFAULT_HIGHLIGHT_THEME)]
    highlight_theme: String,

    /// Mermaid runtime URL.
    #[arg(long, global = true, env = "M2P_MERMAID_URL", default_value = DEFAULT_MERMAID_SCRIPT_URL)]
    mermaid_url: String,

    /// Settle delay after page load, in milliseconds.
    #[arg(long, global = true, env = "M2P_RENDER_DELAY_MS", default_value_t = DEFAULT_RENDER_DELAY_MS)]
    render_delay: u64,

    /// Settle delay when the document contains diagrams, in milliseconds.
    #[arg(long, global = true, env = "M2P_DIAGRAM_RENDER_DELAY_MS", default_value_t = DEFAULT_DIAGRAM_RENDER_DELAY_MS)]
    diagram_render_delay: u64,

    /// Page load timeout, in milliseconds.
    #[arg(long, global = true, env = "M2P_LOAD_TIMEOUT_MS", default_value_t = DEFAULT_LOAD_TIMEOUT_MS)]
    load_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli.render)?;
    let scratch = ScratchSpace::new().context("Failed to create scratch directory")?;

    // ── Dispatch ─────────────────────────────────────────────────────────
    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            mcp::run_server(&config, &scratch).await;
            Ok(())
        }
        Command::Convert {
            input,
            output,
            json,
        } => run_convert(&input, output.as_deref(), json, &config, &scratch).await,
    };

    // Runs on every exit path, including after SIGINT/SIGTERM ended the server.
    scratch.drain();
    info!("Shut down");
    result
}

async fn run_convert(
    input: &Path,
    output: Option<&str>,
    json: bool,
    config: &ConversionConfig,
    scratch: &ScratchSpace,
) -> Result<()> {
    let result = convert_file(input, output, config, scratch)
        .await
        .with_context(|| format!("Conversion of {} failed", input.display()))?;

    if json {
        let text = serde_json::to_string_pretty(&result).context("Failed to serialise output")?;
        println!("{text}");
    } else {
        for issue in &result.issues {
            eprintln!("warning: {issue}");
        }
        println!("{}", result.path.display());
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(args: &RenderArgs) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .render_delay_ms(args.render_delay)
        .diagram_render_delay_ms(args.diagram_render_delay)
        .load_timeout_ms(args.load_timeout)
        .show_page_numbers(!args.no_page_numbers)
        .highlight_theme(args.highlight_theme.clone())
        .mermaid_script_url(args.mermaid_url.clone());

    if let Some(ref dir) = args.output_dir {
        builder = builder.output_dir(dir.clone());
    }
    if let Some(ref path) = args.chrome_path {
        builder = builder.chrome_path(path.clone());
    }
    if let Some(ref path) = args.css {
        builder = builder.css_path(path.clone());
    }
    if let Some(ref path) = args.highlight_css {
        builder = builder.highlight_css_path(path.clone());
    }
    if let Some(ref path) = args.runnings {
        builder = builder.runnings_path(path.clone());
    }

    builder.build().context("Invalid configuration")
}
