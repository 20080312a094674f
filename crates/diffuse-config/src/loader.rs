use std::path::Path;

use secrecy::ExposeSecret;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, TOML parsing fails, or
    /// validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let config: Self = toml::from_str(&raw).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        tracing::debug!(path = %path.display(), "config file not found, using defaults");

        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if the model backend or the adapter are misconfigured
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_model_config()?;
        self.validate_adapter_config()?;
        self.validate_daemon_config()?;
        Ok(())
    }

    /// Validate the generation backend
    fn validate_model_config(&self) -> anyhow::Result<()> {
        let model = &self.image_service.model;

        if model.model_type.is_remote() && model.base_url.is_none() {
            anyhow::bail!("image_service.model.base_url is required for model type {:?}", model.model_type);
        }

        if model.width == 0 || model.height == 0 {
            anyhow::bail!("image_service.model width and height must be greater than 0");
        }

        if let Some(ref api_key) = model.api_key
            && api_key.expose_secret().is_empty()
        {
            anyhow::bail!("image_service.model.api_key must not be empty when set");
        }

        if model.steps == Some(0) {
            anyhow::bail!("image_service.model.steps must be greater than 0");
        }

        if let Some(ref url) = self.image_service.public_url
            && !matches!(url.scheme(), "http" | "https")
        {
            anyhow::bail!("image_service.public_url must be an http(s) URL");
        }

        Ok(())
    }

    /// Validate the protocol adapter
    fn validate_adapter_config(&self) -> anyhow::Result<()> {
        let url = &self.adapter.image_service_url;

        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("adapter.image_service_url must be an http(s) URL");
        }

        Ok(())
    }

    /// Validate daemon file names
    fn validate_daemon_config(&self) -> anyhow::Result<()> {
        for (key, name) in [("log_file", &self.daemon.log_file), ("pid_file", &self.daemon.pid_file)] {
            if name.is_empty() || name.contains('/') {
                anyhow::bail!("daemon.{key} must be a plain file name");
            }
        }

        Ok(())
    }
}
