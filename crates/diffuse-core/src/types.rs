use serde::{Deserialize, Serialize};

/// Content type of every artifact the image service writes
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Body of `POST /generate`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerateRequest {
    /// Free-text description of the image
    pub prompt: String,
}

/// Metadata describing a generated artifact, as returned by `POST /generate`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ImageMetadata {
    /// `<uuid>.png`
    pub filename: String,
    /// Absolute path of the file on the service host
    pub filepath: String,
    /// URL serving the file through `GET /images/{filename}`
    pub image_url: String,
    pub content_type: String,
    pub width: u32,
    pub height: u32,
    /// Prompt the image was generated from
    pub prompt: String,
}

/// Error body of the image service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}
