use async_trait::async_trait;
use diffuse_config::ModelConfig;
use image::DynamicImage;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ImageModel, decode_base64_image, endpoint};
use crate::error::{ImageGenError, Result};

/// Backend for Stable Diffusion web UI style servers (`/sdapi/v1/txt2img`)
pub(crate) struct SdApiImageModel {
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    width: u32,
    height: u32,
    steps: Option<u32>,
}

impl SdApiImageModel {
    pub fn new(config: &ModelConfig) -> anyhow::Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("base_url is required for the sdapi model backend"))?;

        Ok(Self {
            client: Client::new(),
            base_url,
            api_key: config.api_key.clone(),
            width: config.width,
            height: config.height,
            steps: config.steps,
        })
    }
}

#[derive(Serialize)]
struct Txt2ImgRequest<'a> {
    prompt: &'a str,
    width: u32,
    height: u32,
    batch_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    steps: Option<u32>,
}

#[derive(Deserialize)]
struct Txt2ImgResponse {
    #[serde(default)]
    images: Vec<String>,
}

#[async_trait]
impl ImageModel for SdApiImageModel {
    async fn generate(&self, prompt: &str) -> Result<DynamicImage> {
        let url = endpoint(&self.base_url, "sdapi/v1/txt2img");

        let wire_request = Txt2ImgRequest {
            prompt,
            width: self.width,
            height: self.height,
            batch_size: 1,
            steps: self.steps,
        };

        tracing::debug!(%url, width = self.width, height = self.height, "sending txt2img request");

        let mut request = self.client.post(&url).json(&wire_request);
        if let Some(ref api_key) = self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, "txt2img request failed");
            ImageGenError::Connection(format!("Failed to send request to image model: {e}"))
        })?;

        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            tracing::error!(status = %status, "txt2img API error");

            return Err(ImageGenError::ModelApi {
                status: status.as_u16(),
                message,
            });
        }

        let wire_response: Txt2ImgResponse = response
            .json()
            .await
            .map_err(|e| ImageGenError::InvalidResponse(format!("failed to parse txt2img response: {e}")))?;

        let first = wire_response
            .images
            .first()
            .ok_or_else(|| ImageGenError::InvalidResponse("No images generated".to_string()))?;

        decode_base64_image(first)
    }

    fn name(&self) -> &'static str {
        "sdapi"
    }
}
