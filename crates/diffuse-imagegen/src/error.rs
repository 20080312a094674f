use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use diffuse_core::{ErrorBody, HttpError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ImageGenError>;

/// Image service errors
///
/// Everything except a missing prompt or an unknown image is reported as a
/// 500 carrying the error text.
#[derive(Debug, Error)]
pub enum ImageGenError {
    /// Request body lacks a usable `prompt`
    #[error("Missing prompt in request")]
    MissingPrompt,

    /// Requested image does not exist
    #[error("Image not found")]
    ImageNotFound,

    /// Model backend answered with an error status
    #[error("Model API error ({status}): {message}")]
    ModelApi { status: u16, message: String },

    /// Model backend could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// Model backend answered with something that is not an image
    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    /// PNG encoding failed
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// Reading or writing the images directory failed
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl HttpError for ImageGenError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingPrompt => StatusCode::BAD_REQUEST,
            Self::ImageNotFound => StatusCode::NOT_FOUND,
            Self::ModelApi { .. }
            | Self::Connection(_)
            | Self::InvalidResponse(_)
            | Self::Encode(_)
            | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ImageGenError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "image request failed");
        }

        (status, Json(ErrorBody::new(self.client_message()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(ImageGenError::MissingPrompt.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ImageGenError::ImageNotFound.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn backend_errors_map_to_500_with_text() {
        let err = ImageGenError::ModelApi {
            status: 503,
            message: "model loading".to_string(),
        };

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "Model API error (503): model loading");
    }

    #[test]
    fn messages_match_wire_contract() {
        assert_eq!(ImageGenError::MissingPrompt.client_message(), "Missing prompt in request");
        assert_eq!(ImageGenError::ImageNotFound.client_message(), "Image not found");
    }
}
