//! Minimal MCP (Model Context Protocol) server over stdio.
//!
//! Reads line-delimited JSON-RPC 2.0 from stdin and writes responses to
//! stdout. Requests are handled one at a time; a `tools/call` suspends the
//! loop until its PDF is written or the call fails.
//!
//! # Module layout
//!
//! - [`jsonrpc`] — wire types, response helpers, and stdout framing
//! - [`tools`]   — the `create_pdf_from_markdown` descriptor and dispatch

pub mod jsonrpc;
pub mod tools;

use crate::config::ConversionConfig;
use crate::pipeline::scratch::ScratchSpace;
use jsonrpc::{
    error_response, method_not_found, parse_error, send_response, success_response,
    IncomingMessage, Response,
};
use serde_json::Value;
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, BufReader};
use tools::{handle_tools_call, handle_tools_list};
use tracing::{debug, info, warn};

/// MCP protocol version.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name reported during initialization.
pub const SERVER_NAME: &str = "markdown2pdf";

/// Handle the `initialize` JSON-RPC request.
fn handle_initialize() -> Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

/// Handle one input line. Returns `None` when no response is due
/// (blank lines, notifications, messages without a method).
pub async fn handle_line(
    line: &str,
    config: &ConversionConfig,
    scratch: &ScratchSpace,
) -> Option<Response> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    debug!("<- {}", trimmed);

    let msg: IncomingMessage = match serde_json::from_str(trimmed) {
        Ok(m) => m,
        Err(e) => {
            warn!("Parse error: {}", e);
            return Some(parse_error());
        }
    };

    let Some(method) = msg.method.as_deref() else {
        debug!("Ignoring message without method");
        return None;
    };

    let Some(id) = msg.id else {
        debug!("Notification: {}", method);
        return None;
    };

    let response = match method {
        "initialize" => success_response(id, handle_initialize()),
        "tools/list" => success_response(id, handle_tools_list()),
        "tools/call" => match handle_tools_call(msg.params, config, scratch).await {
            Ok(result) => success_response(id, result),
            Err(error) => error_response(id, error),
        },
        _ => method_not_found(id, method),
    };
    Some(response)
}

/// Serve requests from `reader` until EOF, a read error, or `shutdown`
/// completes. Responses are written to `writer`.
pub async fn serve<R, W, S>(
    reader: R,
    writer: &mut W,
    config: &ConversionConfig,
    scratch: &ScratchSpace,
    shutdown: S,
) where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let mut lines = reader.lines();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(response) = handle_line(&line, config, scratch).await {
                        send_response(writer, &response).await;
                    }
                }
                Ok(None) => {
                    info!("stdin closed, exiting");
                    break;
                }
                Err(e) => {
                    warn!("Error reading stdin: {}", e);
                    break;
                }
            },
            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping server");
                break;
            }
        }
    }
}

/// Run the MCP server on stdin/stdout until EOF or SIGINT/SIGTERM.
pub async fn run_server(config: &ConversionConfig, scratch: &ScratchSpace) {
    info!("Starting {} MCP server v{}", SERVER_NAME, env!("CARGO_PKG_VERSION"));
    let reader = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    serve(reader, &mut stdout, config, scratch, shutdown_signal()).await;
}

/// Wait for Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
