use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Local;
use image::ImageFormat;

use crate::{
    constants::{IMAGE_EXTENSIONS, RECIPE_IMAGE_DIR},
    error::ApiError,
};

pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Decoded payload of a `data:image/<ext>;base64,<data>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub extension: String,
}

impl ImageUpload {
    pub fn from_data_uri(data: &str) -> Result<Self, &'static str> {
        let (header, encoded) = data.split_once(";base64,").ok_or(INVALID_IMAGE)?;
        let declared = header
            .strip_prefix("data:image/")
            .ok_or(INVALID_IMAGE)?
            .to_ascii_lowercase();

        if !IMAGE_EXTENSIONS.contains(&declared.as_str()) {
            return Err("File extension is not allowed.");
        }

        let encoded: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD.decode(encoded).map_err(|_| INVALID_IMAGE)?;
        let format = image::guess_format(&bytes).map_err(|_| INVALID_IMAGE)?;

        let extension = match format {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
            ImageFormat::Bmp => "bmp",
            _ => return Err(INVALID_IMAGE),
        };

        Ok(Self {
            bytes,
            extension: extension.to_string(),
        })
    }

    /// Writes the image below `media_root` and returns its media-relative path.
    pub async fn save(&self, media_root: &Path) -> Result<String, ApiError> {
        let directory = format!(
            "{RECIPE_IMAGE_DIR}/{}",
            Local::now().format("%d/%m/%Y")
        );
        let relative = format!("{directory}/{}.{}", uuid::Uuid::new_v4(), self.extension);

        tokio::fs::create_dir_all(media_root.join(&directory))
            .await
            .map_err(|e| ApiError::Internal(format!("Could not create media directory: {e}")))?;
        tokio::fs::write(media_root.join(&relative), &self.bytes)
            .await
            .map_err(|e| ApiError::Internal(format!("Could not store image: {e}")))?;

        Ok(relative)
    }
}

/// Best-effort removal of a stored media file.
pub async fn remove_media(media_root: &Path, relative: &str) {
    if let Err(e) = tokio::fs::remove_file(media_root.join(relative)).await {
        log::warn!("Could not remove media file {relative}: {e}");
    }
}
