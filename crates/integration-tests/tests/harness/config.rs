//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;
use std::path::Path;

use diffuse_config::{Config, ModelType, ResultFormat};

/// Builder for constructing test configurations
///
/// Both services bind `127.0.0.1:0` and the image service uses the
/// placeholder model unless told otherwise.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder writing images into `images_dir`
    pub fn new(images_dir: &Path) -> Self {
        let mut config = Config::default();
        config.image_service.listen_address = Some(loopback());
        config.image_service.images_dir = Some(images_dir.to_path_buf());
        config.adapter.listen_address = Some(loopback());

        Self { config }
    }

    /// Generate through an OpenAI-compatible backend
    pub fn with_openai_model(mut self, base_url: &str) -> Self {
        let model = &mut self.config.image_service.model;
        model.model_type = ModelType::Openai;
        model.base_url = Some(base_url.parse().expect("valid URL"));
        model.model = Some("mock-diffusion".to_owned());
        self
    }

    /// Generate through a txt2img backend
    pub fn with_sdapi_model(mut self, base_url: &str) -> Self {
        let model = &mut self.config.image_service.model;
        model.model_type = ModelType::Sdapi;
        model.base_url = Some(base_url.parse().expect("valid URL"));
        model.steps = Some(4);
        self
    }

    /// Output dimensions requested from the model
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.config.image_service.model.width = width;
        self.config.image_service.model.height = height;
        self
    }

    /// Point the adapter at an image service
    pub fn with_image_service_url(mut self, url: &str) -> Self {
        self.config.adapter.image_service_url = url.parse().expect("valid URL");
        self
    }

    /// Return image bytes from the adapter instead of file locations
    pub fn with_inline_results(mut self) -> Self {
        self.config.adapter.result_format = ResultFormat::Inline;
        self
    }

    /// Disable health endpoints on both services
    pub fn without_health(mut self) -> Self {
        self.config.image_service.health.enabled = false;
        self.config.adapter.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config.validate().expect("test config is valid");
        self.config
    }
}

fn loopback() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}
