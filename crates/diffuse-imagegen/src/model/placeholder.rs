use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use sha2::{Digest, Sha256};

use super::ImageModel;
use crate::error::Result;

/// In-process backend rendering a solid colour derived from the prompt
///
/// Useful for dry runs and tests; the same prompt always yields the same
/// colour.
pub(crate) struct PlaceholderModel {
    width: u32,
    height: u32,
}

impl PlaceholderModel {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[async_trait]
impl ImageModel for PlaceholderModel {
    async fn generate(&self, prompt: &str) -> Result<DynamicImage> {
        let [r, g, b] = color_from_prompt(prompt);
        let image = RgbImage::from_pixel(self.width, self.height, Rgb([r, g, b]));
        Ok(DynamicImage::ImageRgb8(image))
    }

    fn name(&self) -> &'static str {
        "placeholder"
    }
}

fn color_from_prompt(prompt: &str) -> [u8; 3] {
    let digest = Sha256::digest(prompt.as_bytes());
    [digest[0], digest[1], digest[2]]
}
