use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use diffuse_config::ResultFormat;
use serde_json::{Value, json};

use crate::AdapterState;
use crate::envelope::{SuccessEnvelope, ToolResult, parse_envelope};
use crate::error::AdapterError;
use crate::schema::tool_schema;

/// Build the protocol adapter router
pub fn adapter_router(state: Arc<AdapterState>) -> Router {
    Router::new()
        .route("/mcp", post(handle_action))
        .route("/mcp/schema", get(schema))
        .with_state(state)
}

async fn handle_action(
    State(state): State<Arc<AdapterState>>,
    body: Bytes,
) -> Result<Json<SuccessEnvelope>, AdapterError> {
    let prompt = parse_envelope(&body)?;

    let metadata = state.client.generate(&prompt).await?;

    tracing::info!(filename = %metadata.filename, "image generated");

    let result = match state.result_format {
        ResultFormat::File => ToolResult::File {
            filename: metadata.filename,
            filepath: metadata.filepath,
        },
        ResultFormat::Inline => {
            let bytes = state.client.fetch_image(&metadata.image_url).await?;
            ToolResult::Inline {
                image_data: BASE64.encode(bytes),
                mime_type: metadata.content_type,
                prompt: metadata.prompt,
            }
        }
    };

    Ok(Json(SuccessEnvelope::new(result)))
}

async fn schema() -> Json<Value> {
    Json(json!({ "schema": tool_schema() }))
}
