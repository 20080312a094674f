#![allow(clippy::must_use_candidate, clippy::missing_errors_doc, clippy::missing_const_for_fn)]

mod envelope;
mod error;
mod router;
mod schema;
pub mod stdio;
mod upstream;

pub use envelope::{ErrorEnvelope, SuccessEnvelope, ToolResult, parse_envelope};
pub use error::AdapterError;
pub use router::adapter_router;
pub use schema::{GENERATE_IMAGE, tool_schema};
pub use stdio::{ImageToolServer, serve_stdio};
pub use upstream::ImageServiceClient;

use diffuse_config::{AdapterConfig, ResultFormat};

/// Shared protocol adapter state
#[derive(Debug)]
pub struct AdapterState {
    /// Client for the image service the adapter forwards to
    pub client: ImageServiceClient,
    /// Shape of successful results
    pub result_format: ResultFormat,
}

impl AdapterState {
    pub fn new(client: ImageServiceClient, result_format: ResultFormat) -> Self {
        Self { client, result_format }
    }

    /// Build state from configuration, forwarding to
    /// `adapter.image_service_url`
    pub fn from_config(config: &AdapterConfig) -> Self {
        tracing::info!(
            image_service_url = %config.image_service_url,
            result_format = ?config.result_format,
            "protocol adapter configured"
        );

        Self::new(
            ImageServiceClient::new(config.image_service_url.clone()),
            config.result_format,
        )
    }
}
