use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use diffuse_core::HttpError;
use thiserror::Error;

use crate::envelope::ErrorEnvelope;
use crate::schema::tool_schema;

/// Protocol adapter errors
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Body is not a JSON object
    #[error("Invalid MCP request")]
    InvalidRequest,

    /// `action` is missing or names an unsupported tool
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// `parameters.prompt` is missing or empty
    #[error("Missing required parameter: prompt")]
    MissingPrompt,

    /// Image service answered with a non-200 status
    #[error("Image generation failed: {body}")]
    Upstream { status: u16, body: String },

    /// Image service could not be reached or answered with garbage
    #[error("Failed to generate image: {0}")]
    Request(String),
}

impl HttpError for AdapterError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest | Self::UnknownAction(_) | Self::MissingPrompt => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
            Self::Request(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AdapterError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "MCP request failed");
        } else {
            tracing::debug!(error = %self, "MCP request rejected");
        }

        let schema = matches!(self, Self::UnknownAction(_)).then(tool_schema);
        let envelope = ErrorEnvelope::new(self.client_message(), schema);

        (status, Json(envelope)).into_response()
    }
}
