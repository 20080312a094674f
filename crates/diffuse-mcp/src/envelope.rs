use serde::Serialize;
use serde_json::Value;

use crate::error::AdapterError;
use crate::schema::GENERATE_IMAGE;

/// `{"status":"success","result":...}`
#[derive(Debug, Serialize)]
pub struct SuccessEnvelope {
    status: &'static str,
    pub result: ToolResult,
}

impl SuccessEnvelope {
    pub fn new(result: ToolResult) -> Self {
        Self {
            status: "success",
            result,
        }
    }
}

/// `{"status":"error","message":...}`, with the tool schema for unknown actions
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>, schema: Option<Value>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            schema,
        }
    }
}

/// Result of a `generate_image` call in the configured format
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ToolResult {
    /// Where the image service stored the file
    File { filename: String, filepath: String },
    /// The image itself, base64 encoded
    Inline {
        image_data: String,
        mime_type: String,
        prompt: String,
    },
}

/// Validate an action envelope and extract the prompt
///
/// Checks run in order: the body must be a JSON object, `action` must be
/// `generate_image`, and `parameters.prompt` must be a non-empty string.
pub fn parse_envelope(body: &[u8]) -> Result<String, AdapterError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| AdapterError::InvalidRequest)?;
    let envelope = value.as_object().ok_or(AdapterError::InvalidRequest)?;

    match envelope.get("action") {
        Some(Value::String(action)) if action == GENERATE_IMAGE => {}
        Some(Value::String(action)) => return Err(AdapterError::UnknownAction(action.clone())),
        Some(other) => return Err(AdapterError::UnknownAction(other.to_string())),
        None => return Err(AdapterError::UnknownAction("null".to_string())),
    }

    match envelope
        .get("parameters")
        .and_then(|parameters| parameters.get("prompt"))
        .and_then(Value::as_str)
    {
        Some(prompt) if !prompt.is_empty() => Ok(prompt.to_string()),
        _ => Err(AdapterError::MissingPrompt),
    }
}
