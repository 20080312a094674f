pub(crate) mod openai;
pub(crate) mod placeholder;
pub(crate) mod sdapi;

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use diffuse_config::{ModelConfig, ModelType};
use image::DynamicImage;

use crate::error::{ImageGenError, Result};

/// Handle to the external text-to-image model
///
/// Created once at startup and owned by the [`ImageService`](crate::ImageService).
/// A call holds the calling task until the backend has produced the image.
#[async_trait]
pub trait ImageModel: Send + Sync {
    /// Generate one image for the prompt
    async fn generate(&self, prompt: &str) -> Result<DynamicImage>;

    /// Backend name used in logs
    fn name(&self) -> &str;
}

/// Build the model handle described by the configuration
///
/// # Errors
///
/// Returns an error if a remote backend lacks its base URL
pub fn build_model(config: &ModelConfig) -> anyhow::Result<Arc<dyn ImageModel>> {
    let model: Arc<dyn ImageModel> = match config.model_type {
        ModelType::Openai => Arc::new(openai::OpenAiImageModel::new(config)?),
        ModelType::Sdapi => Arc::new(sdapi::SdApiImageModel::new(config)?),
        ModelType::Placeholder => {
            tracing::warn!("using placeholder model, generated images are solid colours");
            Arc::new(placeholder::PlaceholderModel::new(config.width, config.height))
        }
    };

    tracing::info!(model = model.name(), "image model ready");

    Ok(model)
}

/// Decode a base64 image payload, tolerating a `data:` URL prefix
fn decode_base64_image(payload: &str) -> Result<DynamicImage> {
    let encoded = payload
        .split_once(";base64,")
        .map_or(payload, |(_, data)| data)
        .trim();

    let bytes = BASE64
        .decode(encoded.as_bytes())
        .map_err(|e| ImageGenError::InvalidResponse(format!("image base64 decode failed: {e}")))?;

    decode_image_bytes(&bytes)
}

/// Decode raw encoded image bytes (PNG, JPEG or WebP)
fn decode_image_bytes(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| ImageGenError::InvalidResponse(format!("undecodable image: {e}")))
}

/// Endpoint URL below a backend base URL
fn endpoint(base_url: &url::Url, path: &str) -> String {
    format!("{}/{}", base_url.as_str().trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgb, RgbImage};

    use super::*;

    fn png_base64(width: u32, height: u32) -> String {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([10, 20, 30])));
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        BASE64.encode(bytes)
    }

    #[test]
    fn decodes_plain_base64() {
        let image = decode_base64_image(&png_base64(4, 3)).unwrap();
        assert_eq!((image.width(), image.height()), (4, 3));
    }

    #[test]
    fn decodes_data_url() {
        let payload = format!("data:image/png;base64,{}", png_base64(2, 2));
        let image = decode_base64_image(&payload).unwrap();
        assert_eq!(image.width(), 2);
    }

    #[test]
    fn rejects_non_image_payload() {
        let err = decode_base64_image(&BASE64.encode(b"not an image")).unwrap_err();
        assert!(matches!(err, ImageGenError::InvalidResponse(_)));
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let base = url::Url::parse("http://127.0.0.1:8080/v1/").unwrap();
        assert_eq!(endpoint(&base, "/images/generations"), "http://127.0.0.1:8080/v1/images/generations");

        let base = url::Url::parse("http://127.0.0.1:7860").unwrap();
        assert_eq!(endpoint(&base, "sdapi/v1/txt2img"), "http://127.0.0.1:7860/sdapi/v1/txt2img");
    }

    #[test]
    fn remote_backend_without_base_url_fails() {
        let config = ModelConfig {
            model_type: ModelType::Openai,
            ..ModelConfig::default()
        };

        assert!(build_model(&config).is_err());
    }

    #[test]
    fn placeholder_is_the_default_backend() {
        let model = build_model(&ModelConfig::default()).unwrap();
        assert_eq!(model.name(), "placeholder");
    }
}
