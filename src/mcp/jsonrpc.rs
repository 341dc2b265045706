//! JSON-RPC 2.0 wire types and response helpers.
//!
//! Only what a line-delimited stdio server needs: incoming message
//! deserialization, outgoing responses, and the standard error codes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{error, warn};

/// Invalid JSON was received.
pub const PARSE_ERROR: i64 = -32700;
/// The method (or tool) does not exist.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// An incoming JSON-RPC 2.0 message from the client.
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

/// An outgoing JSON-RPC 2.0 response.
#[derive(Debug, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self {
            code: METHOD_NOT_FOUND,
            message: message.into(),
            data: None,
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: INVALID_PARAMS,
            message: message.into(),
            data: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Response constructors
// ---------------------------------------------------------------------------

/// Build a success response.
pub fn success_response(id: Value, result: Value) -> Response {
    Response {
        jsonrpc: "2.0",
        result: Some(result),
        error: None,
        id,
    }
}

/// Build an error response.
pub fn error_response(id: Value, error: RpcError) -> Response {
    Response {
        jsonrpc: "2.0",
        result: None,
        error: Some(error),
        id,
    }
}

/// Build a method-not-found error response.
pub fn method_not_found(id: Value, method: &str) -> Response {
    error_response(
        id,
        RpcError::method_not_found(format!("Method not found: {method}")),
    )
}

/// Build a parse error response.
pub fn parse_error() -> Response {
    error_response(
        Value::Null,
        RpcError {
            code: PARSE_ERROR,
            message: "Parse error".to_string(),
            data: None,
        },
    )
}

// ---------------------------------------------------------------------------
// I/O helper
// ---------------------------------------------------------------------------

/// Send a JSON-RPC response as a single newline-terminated line.
pub async fn send_response<W>(out: &mut W, response: &Response)
where
    W: AsyncWrite + Unpin,
{
    let mut json = match serde_json::to_string(response) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            return;
        }
    };
    json.push('\n');

    if let Err(e) = out.write_all(json.as_bytes()).await {
        warn!("Failed to write response: {}", e);
        return;
    }
    if let Err(e) = out.flush().await {
        warn!("Failed to flush response: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_response_omits_error() {
        let value = serde_json::to_value(success_response(json!(1), json!({"ok": true}))).unwrap();
        assert_eq!(value, json!({"jsonrpc": "2.0", "result": {"ok": true}, "id": 1}));
    }

    #[test]
    fn parse_error_has_null_id() {
        let value = serde_json::to_value(parse_error()).unwrap();
        assert_eq!(value["error"]["code"], json!(-32700));
        assert_eq!(value["id"], Value::Null);
        assert!(value.get("result").is_none());
    }

    #[test]
    fn method_not_found_names_the_method() {
        let value = serde_json::to_value(method_not_found(json!("a"), "resources/list")).unwrap();
        assert_eq!(value["error"]["code"], json!(-32601));
        assert_eq!(value["error"]["message"], json!("Method not found: resources/list"));
    }

    #[test]
    fn incoming_notification_has_no_id() {
        let msg: IncomingMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .unwrap();
        assert!(msg.id.is_none());
        assert_eq!(msg.method.as_deref(), Some("notifications/initialized"));
    }

    #[tokio::test]
    async fn send_response_writes_one_line() {
        let mut out: Vec<u8> = Vec::new();
        send_response(&mut out, &success_response(json!(7), json!({}))).await;
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches('\n').count(), 1);
        assert!(text.ends_with('\n'));
        assert!(text.contains(r#""id":7"#));
    }
}
