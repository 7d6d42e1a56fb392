use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

use crate::constants::MAX_IMAGE_SIZE_BYTES;
use crate::error::{AppError, Result};

/// Subdirectory of the media root holding recipe images
const RECIPE_IMAGES_DIR: &str = "recipes";

/// Local file store for uploaded recipe images
///
/// Files are content addressed: `recipes/<sha256>.<ext>`. Storing the same
/// image twice yields the same path.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Decode a base64 data URL and write it below the media root
    ///
    /// Returns the stored path relative to the root.
    pub async fn save_data_url(&self, data_url: &str) -> Result<String> {
        let (bytes, ext) = decode_image_data_url(data_url)?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let relative = format!("{}/{}.{}", RECIPE_IMAGES_DIR, hex::encode(hasher.finalize()), ext);

        let dir = self.root.join(RECIPE_IMAGES_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let target = self.root.join(&relative);
        if !tokio::fs::try_exists(&target).await? {
            tokio::fs::write(&target, &bytes).await?;
            tracing::debug!("Stored image {} ({} bytes)", relative, bytes.len());
        }

        Ok(relative)
    }

    /// Public URL for a stored relative path
    pub fn url_for(&self, relative: &str) -> String {
        format!("{}/{}", self.url_prefix, relative)
    }
}

/// Split `data:image/<type>;base64,<payload>` into decoded bytes and a file extension
pub fn decode_image_data_url(data_url: &str) -> Result<(Vec<u8>, &'static str)> {
    let invalid = || AppError::validation("image", "Image must be a base64 encoded data URL");

    let rest = data_url.trim().strip_prefix("data:").ok_or_else(invalid)?;
    let (mime, payload) = rest.split_once(";base64,").ok_or_else(invalid)?;

    let ext = match mime.to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => {
            return Err(AppError::validation(
                "image",
                "Unsupported image type; use PNG, JPEG, GIF or WebP",
            ))
        }
    };

    let bytes = STANDARD.decode(payload.trim()).map_err(|_| invalid())?;
    if bytes.is_empty() {
        return Err(invalid());
    }
    if bytes.len() > MAX_IMAGE_SIZE_BYTES {
        return Err(AppError::validation("image", "Image exceeds the 5MB limit"));
    }

    Ok((bytes, ext))
}
