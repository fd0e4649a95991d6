//! Prediction endpoint client
//!
//! The chat flow is hosted by a third party and exposed as a single
//! `POST` endpoint authenticated with a bearer token. Callers decide how to
//! read the response (relay it, or consume it as a stream).

use reqwest::{Client, Response};
use serde_json::Value;

/// Prediction endpoint used when `FLOWISE_PREDICTION_URL` is not set
pub const DEFAULT_PREDICTION_URL: &str =
    "https://flowise-rfxw.onrender.com/api/v1/prediction/75225840-452c-4330-b639-ccc3f8a99b06";

#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("Prediction API key not configured")]
    MissingApiKey,
    #[error("Prediction request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Client for the hosted prediction endpoint
///
/// No timeout is set on the underlying client: a slow upstream holds the
/// request open for as long as it takes.
#[derive(Clone)]
pub struct PredictionClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for PredictionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl PredictionClient {
    /// Create a client with its own HTTP connection pool
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self::with_client(Client::new(), endpoint, api_key)
    }

    /// Create a client that shares an existing HTTP connection pool.
    /// An empty API key counts as not configured.
    pub fn with_client(http: Client, endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether a bearer token is available
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send a JSON body to the prediction endpoint.
    ///
    /// Returns the raw response whatever its status; only transport failures
    /// and a missing API key are errors.
    pub async fn predict(&self, body: &Value) -> Result<Response, PredictionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(PredictionError::MissingApiKey)?;

        tracing::debug!(endpoint = %self.endpoint, "Sending prediction request");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await?;

        Ok(response)
    }
}
