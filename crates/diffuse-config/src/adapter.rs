use std::net::SocketAddr;

use serde::Deserialize;
use url::Url;

use crate::health::HealthConfig;
use crate::image_service::DEFAULT_IMAGE_SERVICE_PORT;

/// Port the protocol adapter listens on when nothing else is configured
pub const DEFAULT_ADAPTER_PORT: u16 = 6000;

/// Protocol adapter configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdapterConfig {
    /// Address to bind, defaults to `0.0.0.0:6000`
    #[serde(default)]
    pub listen_address: Option<SocketAddr>,
    /// Base URL of the image service
    #[serde(default = "default_image_service_url")]
    pub image_service_url: Url,
    /// Shape of the success result
    #[serde(default)]
    pub result_format: ResultFormat,
    #[serde(default)]
    pub health: HealthConfig,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            listen_address: None,
            image_service_url: default_image_service_url(),
            result_format: ResultFormat::default(),
            health: HealthConfig::default(),
        }
    }
}

impl AdapterConfig {
    /// Configured listen address or the default
    pub fn listen_address(&self) -> SocketAddr {
        self.listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], DEFAULT_ADAPTER_PORT)))
    }

    /// Override only the port of the listen address
    pub fn set_port(&mut self, port: u16) {
        let mut address = self.listen_address();
        address.set_port(port);
        self.listen_address = Some(address);
    }
}

/// Fields carried by a successful `generate_image` result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultFormat {
    /// `filename` and `filepath` of the artifact
    #[default]
    File,
    /// Base64 `image_data`, `mime_type` and `prompt`
    Inline,
}

fn default_image_service_url() -> Url {
    Url::parse(&format!("http://localhost:{DEFAULT_IMAGE_SERVICE_PORT}")).expect("must be valid URL")
}
