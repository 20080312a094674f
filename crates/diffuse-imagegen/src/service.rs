use std::sync::Arc;

use diffuse_config::{DEFAULT_IMAGES_DIR, ImageServiceConfig};
use diffuse_core::{ImageMetadata, PNG_CONTENT_TYPE};
use url::Url;

use crate::{
    error::Result,
    model::{ImageModel, build_model},
    storage::ImageStore,
};

/// The image service: a model handle plus the directory its output lands in
pub struct ImageService {
    model: Arc<dyn ImageModel>,
    store: ImageStore,
    public_url: Url,
}

impl ImageService {
    pub fn new(model: Arc<dyn ImageModel>, store: ImageStore, public_url: Url) -> Self {
        Self {
            model,
            store,
            public_url,
        }
    }

    /// Generate an image, persist it and describe the artifact
    ///
    /// The caller waits for the full model inference.
    pub async fn generate(&self, prompt: &str) -> Result<ImageMetadata> {
        tracing::info!(model = self.model.name(), prompt, "generating image");

        let image = self.model.generate(prompt).await?;
        let stored = self.store.save(image).await?;

        tracing::info!(filename = %stored.filename, width = stored.width, height = stored.height, "image generated");

        Ok(ImageMetadata {
            image_url: self.image_url(&stored.filename),
            filepath: stored.path.display().to_string(),
            filename: stored.filename,
            content_type: PNG_CONTENT_TYPE.to_string(),
            width: stored.width,
            height: stored.height,
            prompt: prompt.to_string(),
        })
    }

    /// Bytes of a previously generated image, if it exists
    pub async fn image(&self, filename: &str) -> Result<Option<Vec<u8>>> {
        self.store.read(filename).await
    }

    fn image_url(&self, filename: &str) -> String {
        format!("{}/images/{filename}", self.public_url.as_str().trim_end_matches('/'))
    }
}

/// Builder for constructing the image service from configuration
pub struct ImageServiceBuilder<'a> {
    config: &'a ImageServiceConfig,
    public_url: Option<Url>,
}

impl<'a> ImageServiceBuilder<'a> {
    pub const fn new(config: &'a ImageServiceConfig) -> Self {
        Self {
            config,
            public_url: None,
        }
    }

    /// Base URL for `image_url` when the configuration does not set one
    #[must_use]
    pub fn fallback_public_url(mut self, url: Url) -> Self {
        self.public_url = Some(url);
        self
    }

    /// Load the model and open the images directory
    ///
    /// # Errors
    ///
    /// Returns an error if the model backend is misconfigured or the images
    /// directory cannot be created
    pub fn build(self) -> anyhow::Result<ImageService> {
        let images_dir = self
            .config
            .images_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_IMAGES_DIR.into());

        let store = ImageStore::open(&images_dir)
            .map_err(|e| anyhow::anyhow!("failed to open images directory {}: {e}", images_dir.display()))?;

        let public_url = match (&self.config.public_url, self.public_url) {
            (Some(configured), _) => configured.clone(),
            (None, Some(fallback)) => fallback,
            (None, None) => {
                let port = self.config.listen_address().port();
                Url::parse(&format!("http://localhost:{port}"))?
            }
        };

        let model = build_model(&self.config.model)?;

        tracing::info!(
            images_dir = %store.dir().display(),
            public_url = %public_url,
            "image service initialized"
        );

        Ok(ImageService::new(model, store, public_url))
    }
}
