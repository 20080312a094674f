use std::net::SocketAddr;
use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use crate::health::HealthConfig;

/// Port the image service listens on when nothing else is configured
pub const DEFAULT_IMAGE_SERVICE_PORT: u16 = 5000;

/// Images directory of the standalone image service when neither the config
/// file nor `IMAGE_GEN_DIR` names one
pub const DEFAULT_IMAGES_DIR: &str = "generated_images";

/// Image service configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageServiceConfig {
    /// Address to bind, defaults to `0.0.0.0:5000`
    #[serde(default)]
    pub listen_address: Option<SocketAddr>,
    /// Directory generated images are written to
    #[serde(default)]
    pub images_dir: Option<PathBuf>,
    /// Base URL used to build `image_url`, defaults to `http://localhost:<port>`
    #[serde(default)]
    pub public_url: Option<Url>,
    /// Generation model backend
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

impl ImageServiceConfig {
    /// Configured listen address or the default
    pub fn listen_address(&self) -> SocketAddr {
        self.listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], DEFAULT_IMAGE_SERVICE_PORT)))
    }

    /// Override only the port of the listen address
    pub fn set_port(&mut self, port: u16) {
        let mut address = self.listen_address();
        address.set_port(port);
        self.listen_address = Some(address);
    }
}

/// Configuration of the external generation model
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Backend type
    #[serde(rename = "type", default)]
    pub model_type: ModelType,
    /// Base URL of the inference server (required for remote backends)
    #[serde(default)]
    pub base_url: Option<Url>,
    /// API key sent as a bearer token
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Model identifier forwarded to the backend
    #[serde(default)]
    pub model: Option<String>,
    /// Requested image width in pixels
    #[serde(default = "default_dimension")]
    pub width: u32,
    /// Requested image height in pixels
    #[serde(default = "default_dimension")]
    pub height: u32,
    /// Sampling steps (sdapi only)
    #[serde(default)]
    pub steps: Option<u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::default(),
            base_url: None,
            api_key: None,
            model: None,
            width: default_dimension(),
            height: default_dimension(),
            steps: None,
        }
    }
}

/// Supported generation backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// OpenAI-compatible `/images/generations` endpoint
    Openai,
    /// Stable Diffusion web UI `/sdapi/v1/txt2img` endpoint
    Sdapi,
    /// In-process solid colour images derived from the prompt
    #[default]
    Placeholder,
}

impl ModelType {
    /// Whether this backend calls out to an inference server
    pub const fn is_remote(self) -> bool {
        matches!(self, Self::Openai | Self::Sdapi)
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_dimension() -> u32 {
    512
}
