//! Object storage client for sample images
//!
//! **[CID-INT-030]** Uploads captured sample images to the object store
//! and returns a time-limited signed retrieval URL. Keys are namespaced
//! by owner id with a millisecond-timestamp suffix; uploads never
//! overwrite an existing object.
//!
//! A failed upload or signing call leaves the draft untouched. An object
//! uploaded before a failed signing call is not cleaned up (accepted
//! resource leak; the bucket holds orphans until bucket-level expiry).

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::StorageConfig;
use crate::error::AnalysisError;

const USER_AGENT: &str = "ColonyID/0.1.0 (cid-analysis)";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// POST /object/sign response body
#[derive(Debug, Deserialize)]
struct SignedUrlBody {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

/// Object storage client (Supabase-storage-shaped HTTP API)
pub struct StorageClient {
    http_client: reqwest::Client,
    config: StorageConfig,
}

impl StorageClient {
    /// Create a new storage client
    pub fn new(config: StorageConfig) -> Result<Self, AnalysisError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AnalysisError::Upload(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Upload a sample image and return its signed retrieval URL
    ///
    /// Key pattern: `{owner_id}/{unix_millis}.jpg`, content type
    /// image/jpeg, non-overwriting.
    pub async fn upload_sample(
        &self,
        owner_id: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AnalysisError> {
        let key = format!("{}/{}.jpg", owner_id, chrono::Utc::now().timestamp_millis());
        self.upload_object(&key, bytes).await?;
        self.create_signed_url(&key).await
    }

    /// POST the object bytes under the given key
    async fn upload_object(&self, key: &str, bytes: Vec<u8>) -> Result<(), AnalysisError> {
        let url = format!("{}/object/{}/{}", self.config.base_url, self.config.bucket, key);

        tracing::debug!(key = %key, size = bytes.len(), "Uploading sample image");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.service_key)
            .header("content-type", "image/jpeg")
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| AnalysisError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Upload(format!(
                "Upload returned HTTP {}: {}",
                status, body
            )));
        }

        tracing::info!(key = %key, "Sample image uploaded");
        Ok(())
    }

    /// Request a time-limited signed URL for an uploaded object
    async fn create_signed_url(&self, key: &str) -> Result<String, AnalysisError> {
        let url = format!(
            "{}/object/sign/{}/{}",
            self.config.base_url, self.config.bucket, key
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.service_key)
            .json(&json!({ "expiresIn": self.config.signed_url_ttl_secs }))
            .send()
            .await
            .map_err(|e| AnalysisError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Upload(format!(
                "Signed URL request returned HTTP {}: {}",
                status, body
            )));
        }

        let body: SignedUrlBody = response
            .json()
            .await
            .map_err(|e| AnalysisError::Upload(format!("Malformed signing response: {}", e)))?;

        // The storage API returns a path relative to its base
        let signed = if body.signed_url.starts_with("http") {
            body.signed_url
        } else {
            format!(
                "{}/{}",
                self.config.base_url,
                body.signed_url.trim_start_matches('/')
            )
        };

        tracing::debug!(key = %key, ttl_secs = self.config.signed_url_ttl_secs, "Signed URL issued");
        Ok(signed)
    }
}
