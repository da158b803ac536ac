use crate::error::ParamError;
use crate::http::ErrorInfo;
use crate::types::RateMeta;
use serde_json::Value;

/// Result of one `tools/call`, before it is wrapped into the MCP envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct CallToolResult {
    pub text: String,
    pub structured: Value,
    pub is_error: bool,
}

impl CallToolResult {
    pub fn success(text: String, structured: Value) -> Self {
        Self {
            text,
            structured,
            is_error: false,
        }
    }

    pub fn error(message: String, info: ErrorInfo) -> Self {
        Self {
            structured: serde_json::json!({ "error": info }),
            text: message,
            is_error: true,
        }
    }

    pub fn invalid_params(err: &ParamError) -> Self {
        let message = err.to_string();
        Self::error(
            message.clone(),
            ErrorInfo {
                code: "invalid_params".into(),
                message,
                retriable: false,
            },
        )
    }

    /// Attach rate metadata under `meta.rate` when the structured payload is an object.
    pub fn with_rate(mut self, rate: RateMeta) -> Self {
        if let Some(obj) = self.structured.as_object_mut() {
            obj.insert("meta".into(), serde_json::json!({ "rate": rate }));
        }
        self
    }

    pub fn into_value(self) -> Value {
        mcp_wrap(self.structured, self.text, self.is_error)
    }
}

// Build an MCP-compliant result envelope for tools/call outputs.
// - content: always a single text block so clients can render something.
// - structuredContent: the same payload in JSON form.
// - isError: included only when true to keep payloads small.
pub fn mcp_wrap(structured: Value, text: String, is_error: bool) -> Value {
    let mut obj = serde_json::json!({
        "content": [{ "type": "text", "text": text }],
        "structuredContent": structured,
    });
    if is_error {
        if let Some(map) = obj.as_object_mut() {
            map.insert("isError".to_string(), Value::Bool(true));
        }
    }
    obj
}
