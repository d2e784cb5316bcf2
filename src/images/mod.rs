//! Hosted image storage.
//!
//! Site cover images never live in the database as raw bytes: they are
//! pushed to an external image host and only the returned URL is stored.

mod cloudinary;

pub use cloudinary::CloudinaryStore;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static! {
    /// Versioned asset path: `/v<digits>/<public id>.<ext>` at the end of the URL
    static ref VERSIONED_PATH_REGEX: Regex =
        Regex::new(r"/v\d+/(.+)\.(jpg|jpeg|png|gif|webp)$").unwrap();
}

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("Image upload failed: {0}")]
    UploadFailed(String),
    #[error("Image delete failed: {0}")]
    DeleteFailed(String),
}

/// An image to upload: raw bytes from a multipart form, or a data URI from JSON
#[derive(Debug, Clone)]
pub enum ImagePayload {
    Bytes { data: Vec<u8>, content_type: String },
    DataUri(String),
}

impl ImagePayload {
    /// Render the payload as a `data:` URI, the form the image host accepts inline.
    pub fn to_data_uri(&self) -> String {
        match self {
            ImagePayload::Bytes { data, content_type } => {
                let mime = if content_type.starts_with("image/") {
                    content_type.as_str()
                } else {
                    "image/jpeg"
                };
                format!("data:{};base64,{}", mime, BASE64.encode(data))
            }
            ImagePayload::DataUri(uri) => uri.clone(),
        }
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub public_id: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Upload (resized to the configured box, quality/format auto) into `folder`.
    async fn upload(
        &self,
        image: &ImagePayload,
        folder: &str,
    ) -> Result<UploadedImage, ImageStoreError>;

    /// Remove an asset. `Ok(true)` only when the host confirms the removal.
    async fn delete(&self, public_id: &str) -> Result<bool, ImageStoreError>;
}

/// Public id of a hosted image, derived from its URL without any network call.
///
/// Returns `None` for URLs that do not have the versioned shape, meaning
/// there is nothing on the image host to delete.
pub fn extract_public_id(url: &str) -> Option<String> {
    VERSIONED_PATH_REGEX
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| !id.is_empty())
}

/// Whether a cover image value is an inline data URI that must be uploaded first
pub fn is_data_uri(value: &str) -> bool {
    value.starts_with("data:")
}
