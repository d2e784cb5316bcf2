//! Cloudinary upload API client.

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{ImagePayload, ImageStore, ImageStoreError, UploadedImage};
use crate::config::ImageConfig;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

pub struct CloudinaryStore {
    cloud_name: String,
    api_key: String,
    api_secret: String,
    /// Eager transformation applied to every upload
    transformation: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    format: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

impl CloudinaryStore {
    pub fn new(config: &ImageConfig) -> Self {
        Self {
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            transformation: format!(
                "c_fill,h_{},q_auto,w_{}/f_auto",
                config.height, config.width
            ),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", API_BASE, self.cloud_name, action)
    }

    fn ensure_configured(&self) -> Result<(), String> {
        if self.cloud_name.is_empty() || self.api_key.is_empty() || self.api_secret.is_empty() {
            return Err("image store credentials are not configured".to_string());
        }
        Ok(())
    }

    /// Add `timestamp`, `api_key` and the SHA-256 request signature to `params`.
    fn signed_form(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        params.push(("timestamp", timestamp));

        let signature = sign_params(&params, &self.api_secret);
        params.push(("api_key", self.api_key.clone()));
        params.push(("signature", signature));
        params.push(("signature_algorithm", "sha256".to_string()));
        params
    }

    async fn post_form(
        &self,
        action: &str,
        form: &[(&'static str, String)],
    ) -> Result<reqwest::Response, String> {
        let response = self
            .client
            .post(self.endpoint(action))
            .form(form)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(format!("{} - {}", status, message));
        }

        Ok(response)
    }
}

#[async_trait]
impl ImageStore for CloudinaryStore {
    async fn upload(
        &self,
        image: &ImagePayload,
        folder: &str,
    ) -> Result<UploadedImage, ImageStoreError> {
        self.ensure_configured()
            .map_err(ImageStoreError::UploadFailed)?;

        let mut form = self.signed_form(vec![
            ("folder", folder.to_string()),
            ("transformation", self.transformation.clone()),
        ]);
        form.push(("file", image.to_data_uri()));

        let response = self
            .post_form("upload", &form)
            .await
            .map_err(ImageStoreError::UploadFailed)?;

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| ImageStoreError::UploadFailed(e.to_string()))?;

        tracing::info!(public_id = %uploaded.public_id, "Image uploaded");

        Ok(UploadedImage {
            public_id: uploaded.public_id,
            url: uploaded.secure_url,
            width: uploaded.width,
            height: uploaded.height,
            format: uploaded.format,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<bool, ImageStoreError> {
        self.ensure_configured()
            .map_err(ImageStoreError::DeleteFailed)?;

        let form = self.signed_form(vec![("public_id", public_id.to_string())]);

        let response = self
            .post_form("destroy", &form)
            .await
            .map_err(ImageStoreError::DeleteFailed)?;

        let destroyed: DestroyResponse = response
            .json()
            .await
            .map_err(|e| ImageStoreError::DeleteFailed(e.to_string()))?;

        Ok(destroyed.result == "ok")
    }
}

/// Signature over the alphabetically sorted `key=value` pairs followed by the secret.
fn sign_params(params: &[(&str, String)], secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}
