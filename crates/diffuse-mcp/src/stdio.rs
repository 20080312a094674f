//! MCP over stdio, for agents that launch the adapter as a child process

use std::sync::Arc;

use anyhow::Context as _;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::transport::stdio;
use rmcp::{ErrorData, ServerHandler, ServiceExt as _, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::error::AdapterError;
use crate::upstream::ImageServiceClient;

/// Arguments of the `generate_image` tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateImageArgs {
    /// Text description of the image to generate
    pub prompt: String,
}

/// MCP server exposing the image service as a single tool
#[derive(Clone)]
pub struct ImageToolServer {
    client: Arc<ImageServiceClient>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ImageToolServer {
    pub fn new(client: Arc<ImageServiceClient>) -> Self {
        Self {
            client,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Generate an image based on a text prompt")]
    async fn generate_image(
        &self,
        Parameters(args): Parameters<GenerateImageArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        if args.prompt.is_empty() {
            return Err(ErrorData::invalid_params(
                "A text prompt is required for image generation",
                None,
            ));
        }

        let metadata = self.client.generate(&args.prompt).await.map_err(tool_error)?;

        tracing::info!(filename = %metadata.filename, "image generated");

        let result = json!({
            "filename": metadata.filename,
            "filepath": metadata.filepath,
        });

        Ok(CallToolResult::success(vec![Content::text(result.to_string())]))
    }
}

#[tool_handler]
impl ServerHandler for ImageToolServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some("Generates images from text prompts and reports where they were saved.".to_string()),
            ..ServerInfo::default()
        }
    }
}

fn tool_error(err: AdapterError) -> ErrorData {
    let message = match err {
        AdapterError::Upstream { body, .. } => format!("Image generation failed: {body}"),
        AdapterError::Request(message) => format!("Request error: {message}"),
        other => format!("Request error: {other}"),
    };
    ErrorData::internal_error(message, None)
}

/// Serve MCP over stdin/stdout until the client disconnects or `shutdown`
/// fires
///
/// # Errors
///
/// Returns an error if the transport cannot be started or the service task
/// panics
pub async fn serve_stdio(client: Arc<ImageServiceClient>, shutdown: CancellationToken) -> anyhow::Result<()> {
    let service = ImageToolServer::new(client)
        .serve(stdio())
        .await
        .context("failed to start MCP server over stdio")?;

    tracing::info!("MCP stdio server ready");

    tokio::select! {
        result = service.waiting() => {
            let reason = result.context("MCP server terminated unexpectedly")?;
            tracing::info!(?reason, "MCP client disconnected");
        }
        () = shutdown.cancelled() => {
            tracing::info!("MCP stdio server shutting down");
        }
    }

    Ok(())
}
