use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use uuid::Uuid;

use crate::error::{ImageGenError, Result};

/// A PNG written to the images directory
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub id: Uuid,
    /// `<uuid>.png`
    pub filename: String,
    /// Absolute path of the file
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Flat directory of generated PNGs named `<uuid>.png`
///
/// Files are only ever created; nothing here deletes or overwrites them.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    /// Open the images directory, creating it if missing
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or resolved
    pub fn open(dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let dir = dir.canonicalize()?;

        tracing::debug!(dir = %dir.display(), "images directory ready");

        Ok(Self { dir })
    }

    /// Absolute path of the images directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Encode the image as PNG and write it under a fresh UUID name
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails
    pub async fn save(&self, image: DynamicImage) -> Result<StoredImage> {
        let id = Uuid::new_v4();
        let filename = format!("{id}.png");
        let path = self.dir.join(&filename);
        let (width, height) = (image.width(), image.height());

        let bytes = tokio::task::spawn_blocking(move || encode_png(&image))
            .await
            .map_err(|e| ImageGenError::Encode(e.to_string()))??;

        tokio::fs::write(&path, &bytes).await?;

        tracing::debug!(path = %path.display(), width, height, bytes = bytes.len(), "image saved");

        Ok(StoredImage {
            id,
            filename,
            path,
            width,
            height,
        })
    }

    /// Read a previously saved image
    ///
    /// Returns `Ok(None)` for names that do not exist or could escape the
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read
    pub async fn read(&self, filename: &str) -> Result<Option<Vec<u8>>> {
        if !is_plain_file_name(filename) {
            return Ok(None);
        }

        match tokio::fs::read(self.dir.join(filename)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| ImageGenError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// A single path component that is neither hidden nor a parent reference
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\']) && !name.contains('\0')
}
