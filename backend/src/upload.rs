use actix_multipart::Multipart;
use futures::TryStreamExt;

use crate::error::{ApiError, ValidationError};

pub const IMAGE_FIELD: &str = "image";
const ALLOWED_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];

pub struct ImageUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Case-insensitive suffix check on the client-supplied filename.
pub fn check_filename(filename: &str) -> Result<(), ValidationError> {
    if filename.is_empty() {
        return Err(ValidationError::EmptyFilename);
    }
    let lower = filename.to_lowercase();
    if ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedExtension)
    }
}

/// Reads the first file part named `image`. Parts without a filename are plain form fields
/// and are skipped.
pub async fn read_image(mut payload: Multipart, limit: usize) -> Result<ImageUpload, ApiError> {
    loop {
        let mut field = match payload.try_next().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(ValidationError::MissingImage.into()),
            Err(e) => {
                log::warn!("Unreadable multipart payload: {}", e);
                return Err(ValidationError::MissingImage.into());
            }
        };

        let filename = match (field.name(), field.content_disposition()) {
            (Some(IMAGE_FIELD), Some(disposition)) => {
                disposition.get_filename().map(str::to_owned)
            }
            _ => None,
        };
        let Some(filename) = filename else {
            while field.try_next().await?.is_some() {}
            continue;
        };
        check_filename(&filename)?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if bytes.len() + chunk.len() > limit {
                return Err(ValidationError::TooLarge { limit }.into());
            }
            bytes.extend_from_slice(&chunk);
        }
        return Ok(ImageUpload { filename, bytes });
    }
}
