use async_trait::async_trait;
use diffuse_config::ModelConfig;
use image::DynamicImage;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ImageModel, decode_base64_image, decode_image_bytes, endpoint};
use crate::error::{ImageGenError, Result};

/// Backend speaking the OpenAI image generation API
///
/// Works against any server exposing `POST {base_url}/images/generations`
/// with `b64_json` responses (hosted or self-hosted diffusion servers).
pub(crate) struct OpenAiImageModel {
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    model: Option<String>,
    size: String,
}

impl OpenAiImageModel {
    pub fn new(config: &ModelConfig) -> anyhow::Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("base_url is required for the openai model backend"))?;

        Ok(Self {
            client: Client::new(),
            base_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            size: format!("{}x{}", config.width, config.height),
        })
    }
}

/// Wire format for the image generation request
#[derive(Serialize)]
struct OpenAiImageRequest<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    n: u32,
    size: &'a str,
    response_format: &'static str,
}

/// Wire format for the image generation response
#[derive(Deserialize)]
struct OpenAiImageResponse {
    data: Vec<OpenAiImageData>,
}

#[derive(Deserialize)]
struct OpenAiImageData {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[async_trait]
impl ImageModel for OpenAiImageModel {
    async fn generate(&self, prompt: &str) -> Result<DynamicImage> {
        let url = endpoint(&self.base_url, "images/generations");

        let wire_request = OpenAiImageRequest {
            prompt,
            model: self.model.as_deref(),
            n: 1,
            size: &self.size,
            response_format: "b64_json",
        };

        tracing::debug!(%url, size = %self.size, "sending image generation request");

        let mut request = self.client.post(&url).json(&wire_request);
        if let Some(ref api_key) = self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, "image generation request failed");
            ImageGenError::Connection(format!("Failed to send request to image model: {e}"))
        })?;

        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            tracing::error!(status = %status, "image model API error");

            return Err(ImageGenError::ModelApi {
                status: status.as_u16(),
                message,
            });
        }

        let wire_response: OpenAiImageResponse = response
            .json()
            .await
            .map_err(|e| ImageGenError::InvalidResponse(format!("failed to parse image model response: {e}")))?;

        let data = wire_response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ImageGenError::InvalidResponse("No images generated".to_string()))?;

        match (data.b64_json, data.url) {
            (Some(b64), _) => decode_base64_image(&b64),
            (None, Some(image_url)) => self.download(&image_url).await,
            (None, None) => Err(ImageGenError::InvalidResponse(
                "image entry carries neither b64_json nor url".to_string(),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

impl OpenAiImageModel {
    /// Fetch an image the backend returned by URL
    async fn download(&self, image_url: &str) -> Result<DynamicImage> {
        let response = self
            .client
            .get(image_url)
            .send()
            .await
            .map_err(|e| ImageGenError::Connection(format!("Failed to download generated image: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageGenError::ModelApi {
                status: status.as_u16(),
                message: format!("image download from {image_url} failed"),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImageGenError::Connection(format!("Failed to read generated image: {e}")))?;

        decode_image_bytes(&bytes)
    }
}
