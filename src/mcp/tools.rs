//! The `create_pdf_from_markdown` tool: descriptor, schema, and dispatch.

use super::jsonrpc::RpcError;
use crate::config::{ConversionConfig, PaperFormat};
use crate::convert::convert;
use crate::error::Md2PdfError;
use crate::pipeline::scratch::ScratchSpace;
use crate::request::{
    ConversionRequest, DEFAULT_OUTPUT_FILENAME, DEFAULT_PAPER_BORDER, PAPER_BORDER_PATTERN,
    WATERMARK_MAX_CHARS, WATERMARK_PATTERN,
};
use serde_json::{json, Value};
use tracing::{info, warn};

/// Name of the single exposed tool.
pub const TOOL_NAME: &str = "create_pdf_from_markdown";

// ---------------------------------------------------------------------------
// Tool descriptor
// ---------------------------------------------------------------------------

/// Build the input schema for `create_pdf_from_markdown`.
fn input_schema() -> Value {
    let formats: Vec<&str> = PaperFormat::ALL.iter().map(|f| f.name()).collect();
    json!({
        "type": "object",
        "properties": {
            "markdown": {
                "type": "string",
                "description": "Markdown content to convert. Fenced ```mermaid blocks are rendered as diagrams."
            },
            "outputFilename": {
                "type": "string",
                "description": "Output filename or absolute path. '.pdf' is appended when missing; existing files are never overwritten.",
                "default": DEFAULT_OUTPUT_FILENAME
            },
            "paperFormat": {
                "type": "string",
                "enum": formats,
                "default": "letter"
            },
            "paperOrientation": {
                "type": "string",
                "enum": ["portrait", "landscape"],
                "default": "portrait"
            },
            "paperBorder": {
                "type": "string",
                "description": "Page margin as a CSS length (mm, cm, in or px).",
                "pattern": PAPER_BORDER_PATTERN,
                "default": DEFAULT_PAPER_BORDER
            },
            "watermark": {
                "type": "string",
                "description": "Diagonal text printed on every page. Uppercase letters, digits, spaces and hyphens.",
                "maxLength": WATERMARK_MAX_CHARS,
                "pattern": WATERMARK_PATTERN
            }
        },
        "required": ["markdown"]
    })
}

/// Build the tool descriptor.
fn tool_descriptor() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": "Convert Markdown to a PDF file with syntax-highlighted code blocks, Mermaid diagrams and an optional watermark. Returns the absolute path of the written PDF.",
        "inputSchema": input_schema()
    })
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Handle the `tools/list` request.
pub fn handle_tools_list() -> Value {
    json!({ "tools": [tool_descriptor()] })
}

/// Handle the `tools/call` request.
///
/// Protocol-level problems (unknown tool, invalid arguments) are returned as
/// `Err` and become JSON-RPC errors. Conversion failures are tool results with
/// `isError: true`.
pub async fn handle_tools_call(
    params: Option<Value>,
    config: &ConversionConfig,
    scratch: &ScratchSpace,
) -> Result<Value, RpcError> {
    let params = params.ok_or_else(|| RpcError::invalid_params("Missing params for tools/call"))?;

    let name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
    if name != TOOL_NAME {
        return Err(RpcError::method_not_found(format!("Unknown tool: {name}")));
    }

    let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
    let request = ConversionRequest::from_arguments(arguments)
        .map_err(|e| RpcError::invalid_params(e.to_string()))?;

    match convert(&request, config, scratch).await {
        Ok(output) => {
            for issue in &output.issues {
                warn!("{}", issue);
            }
            info!("{}", output.message());
            Ok(tool_text(&output.message()))
        }
        Err(e) => {
            warn!("Conversion failed: {}", e);
            Ok(tool_error(&e))
        }
    }
}

// ---------------------------------------------------------------------------
// Result helpers
// ---------------------------------------------------------------------------

/// Build a successful text tool result.
pub fn tool_text(message: &str) -> Value {
    json!({
        "content": [{
            "type": "text",
            "text": message
        }]
    })
}

/// Build a tool error result for a failed conversion.
pub fn tool_error(error: &Md2PdfError) -> Value {
    json!({
        "isError": true,
        "content": [{
            "type": "text",
            "text": format!("Error creating PDF: {error}")
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::jsonrpc::{INVALID_PARAMS, METHOD_NOT_FOUND};

    #[test]
    fn lists_exactly_one_tool() {
        let list = handle_tools_list();
        let tools = list["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], json!(TOOL_NAME));
    }

    #[test]
    fn schema_carries_constraints() {
        let schema = input_schema();
        assert_eq!(schema["required"], json!(["markdown"]));
        assert_eq!(schema["properties"]["watermark"]["maxLength"], json!(15));
        assert_eq!(
            schema["properties"]["paperFormat"]["enum"],
            json!(["letter", "a4", "a3", "a5", "legal", "tabloid"])
        );
        assert_eq!(
            schema["properties"]["paperBorder"]["pattern"],
            json!(PAPER_BORDER_PATTERN)
        );
    }

    #[test]
    fn tool_error_prefixes_message() {
        let value = tool_error(&Md2PdfError::RenderFailed("print: boom".into()));
        assert_eq!(value["isError"], json!(true));
        let text = value["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Error creating PDF: "));
        assert!(text.contains("print: boom"));
    }

    #[tokio::test]
    async fn unknown_tool_is_method_not_found() {
        let scratch = ScratchSpace::new().unwrap();
        let err = handle_tools_call(
            Some(json!({"name": "delete_everything", "arguments": {}})),
            &ConversionConfig::default(),
            &scratch,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, METHOD_NOT_FOUND);
        assert!(err.message.contains("delete_everything"));
    }

    #[tokio::test]
    async fn invalid_watermark_is_invalid_params() {
        let scratch = ScratchSpace::new().unwrap();
        let err = handle_tools_call(
            Some(json!({
                "name": TOOL_NAME,
                "arguments": {"markdown": "# x", "watermark": "toolongwatermarktext"}
            })),
            &ConversionConfig::default(),
            &scratch,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, INVALID_PARAMS);
        assert!(err.message.contains("watermark"));
    }

    #[tokio::test]
    async fn missing_markdown_is_invalid_params() {
        let scratch = ScratchSpace::new().unwrap();
        let err = handle_tools_call(
            Some(json!({"name": TOOL_NAME})),
            &ConversionConfig::default(),
            &scratch,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, INVALID_PARAMS);
    }
}
