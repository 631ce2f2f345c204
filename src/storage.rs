// Object storage client - presigned upload via the backend issuer

use crate::media::MediaFile;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("network error: {0}")]
    Network(String),

    #[error("failed to get upload URL: {0}")]
    Presign(String),

    #[error("storage upload failed: {0}")]
    Put(String),
}

#[derive(Debug, Deserialize)]
struct PresignResponse {
    #[serde(rename = "uploadUrl")]
    upload_url: String,
    key: String,
}

pub struct StorageClient {
    base_url: String,
    client: reqwest::Client,
}

impl StorageClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// Upload the file to object storage and return its key: one presign
    /// request, one PUT against the issued URL.
    pub async fn upload(&self, file: &MediaFile) -> Result<String, UploadError> {
        let presign = self
            .client
            .get(format!("{}/get-upload-url", self.base_url))
            .query(&[("filename", file.file_name.as_str())])
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        if !presign.status().is_success() {
            return Err(UploadError::Presign(format!(
                "HTTP {}",
                presign.status()
            )));
        }

        let PresignResponse { upload_url, key } = presign
            .json()
            .await
            .map_err(|e| UploadError::Presign(e.to_string()))?;

        tracing::info!("Uploading {} ({} bytes) as {}", file.file_name, file.len(), key);

        let put = self
            .client
            .put(&upload_url)
            .header(CONTENT_TYPE, &file.mime_type)
            .body(file.bytes.clone())
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        // Success body is empty and ignored.
        if !put.status().is_success() {
            return Err(UploadError::Put(format!("HTTP {}", put.status())));
        }

        tracing::info!("Upload complete: {}", key);
        Ok(key)
    }
}
