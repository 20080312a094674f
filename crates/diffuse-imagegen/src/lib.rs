#![allow(
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions
)]

mod error;
mod model;
mod service;
mod storage;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
};
use diffuse_core::{ImageMetadata, PNG_CONTENT_TYPE};

pub use error::{ImageGenError, Result};
pub use model::{ImageModel, build_model};
pub use service::{ImageService, ImageServiceBuilder};
pub use storage::{ImageStore, StoredImage};

/// Create the endpoint router for the image service
pub fn endpoint_router() -> Router<Arc<ImageService>> {
    Router::new()
        .route("/generate", post(generate))
        .route("/images/{filename}", get(serve_image))
}

/// Handle `POST /generate`
///
/// The body is parsed by hand so that every malformed request, not only a
/// missing field, gets the service's own 400 body.
async fn generate(State(service): State<Arc<ImageService>>, body: Bytes) -> Result<Json<ImageMetadata>> {
    let prompt = parse_prompt(&body)?;

    let metadata = service.generate(&prompt).await?;

    Ok(Json(metadata))
}

/// Handle `GET /images/{filename}`
async fn serve_image(
    State(service): State<Arc<ImageService>>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse> {
    let bytes = service.image(&filename).await?.ok_or(ImageGenError::ImageNotFound)?;

    Ok(([(header::CONTENT_TYPE, PNG_CONTENT_TYPE)], bytes))
}

/// Extract a non-empty `prompt` string from a JSON object body
fn parse_prompt(body: &[u8]) -> Result<String> {
    let value: serde_json::Value = serde_json::from_slice(body).map_err(|_| ImageGenError::MissingPrompt)?;

    match value.get("prompt").and_then(serde_json::Value::as_str) {
        Some(prompt) if !prompt.is_empty() => Ok(prompt.to_string()),
        _ => Err(ImageGenError::MissingPrompt),
    }
}
