//! ML prediction service client
//!
//! **[CID-INT-010]** GET /health probe and POST /predict call against the
//! external prediction service. The image payload is always transcoded to
//! base64 before sending: bytes are fetched over HTTP when the reference
//! is a signed URL, or read from disk for a local path.

use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use std::time::Duration;

use crate::error::AnalysisError;
use crate::models::{PredictPayload, PredictionRequest, PredictionResponse};

const USER_AGENT: &str = "ColonyID/0.1.0 (cid-analysis)";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// GET /health response body
#[derive(Debug, Deserialize)]
struct HealthBody {
    status: String,
    #[serde(default)]
    model_loaded: bool,
}

/// Error body shape returned by the prediction service on non-2xx
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Prediction service client
pub struct PredictionClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl PredictionClient {
    /// Create a new client for the given base URL
    pub fn new(base_url: String) -> Result<Self, AnalysisError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AnalysisError::ServiceUnavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Probe the prediction service
    ///
    /// **[CID-INT-010]** Usable iff the probe returns 2xx with
    /// `status == "healthy"` and `model_loaded == true`. Any transport
    /// error or other body is an unhealthy signal, never an Err.
    pub async fn check_health(&self) -> bool {
        let url = format!("{}/health", self.base_url);

        let response = match self.http_client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Health probe transport error");
                return false;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(url = %url, status = %response.status(), "Health probe non-success");
            return false;
        }

        match response.json::<HealthBody>().await {
            Ok(body) => {
                let healthy = body.status == "healthy" && body.model_loaded;
                if !healthy {
                    tracing::warn!(
                        status = %body.status,
                        model_loaded = body.model_loaded,
                        "Prediction service reported unhealthy"
                    );
                }
                healthy
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Health probe body parse failed");
                false
            }
        }
    }

    /// Run one prediction
    ///
    /// The request must already be assembled and normalized. Non-success
    /// HTTP statuses surface the server-provided message when one exists.
    pub async fn predict(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionResponse, AnalysisError> {
        let image = self.image_to_base64(&request.image_uri).await?;

        let payload = PredictPayload {
            image,
            agar: request.agar.clone(),
            colony_age: request.colony_age.clone(),
            characteristics: request.characteristics.clone(),
        };

        let url = format!("{}/predict", self.base_url);
        tracing::debug!(
            url = %url,
            agar = %payload.agar,
            colony_age = %payload.colony_age,
            image_bytes_b64 = payload.image.len(),
            "Sending prediction request"
        );

        let response = self
            .http_client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AnalysisError::PredictionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message.or(body.error))
                .unwrap_or_else(|| format!("Prediction service returned HTTP {}", status));
            return Err(AnalysisError::PredictionFailed(message));
        }

        let prediction: PredictionResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::PredictionFailed(format!("Malformed response: {}", e)))?;

        tracing::info!(
            result = %prediction.result,
            confidence = prediction.confidence,
            is_bpseudo = prediction.is_bpseudo,
            "Prediction received"
        );

        Ok(prediction)
    }

    /// Resolve an image reference to base64-encoded bytes
    ///
    /// Remote references (the usual case: a signed storage URL) are
    /// fetched over HTTP; anything else is treated as a local file path.
    async fn image_to_base64(&self, image_uri: &str) -> Result<String, AnalysisError> {
        let bytes = if image_uri.starts_with("http://") || image_uri.starts_with("https://") {
            let response = self
                .http_client
                .get(image_uri)
                .send()
                .await
                .map_err(|e| {
                    AnalysisError::PredictionFailed(format!("Image fetch failed: {}", e))
                })?;

            if !response.status().is_success() {
                return Err(AnalysisError::PredictionFailed(format!(
                    "Image fetch returned HTTP {}",
                    response.status()
                )));
            }

            response
                .bytes()
                .await
                .map_err(|e| AnalysisError::PredictionFailed(format!("Image read failed: {}", e)))?
                .to_vec()
        } else {
            tokio::fs::read(image_uri).await.map_err(|e| {
                AnalysisError::PredictionFailed(format!("Image read failed: {}", e))
            })?
        };

        Ok(general_purpose::STANDARD.encode(bytes))
    }
}
