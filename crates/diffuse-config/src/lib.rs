#![allow(clippy::must_use_candidate)]

pub mod adapter;
pub mod daemon;
pub mod health;
pub mod image_service;
mod loader;
pub mod logging;

use serde::Deserialize;

pub use adapter::*;
pub use daemon::*;
pub use health::*;
pub use image_service::*;
pub use logging::*;

/// Top-level diffuse configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Image service configuration
    #[serde(default)]
    pub image_service: ImageServiceConfig,
    /// Protocol adapter configuration
    #[serde(default)]
    pub adapter: AdapterConfig,
    /// Daemon mode configuration
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Log output configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}
