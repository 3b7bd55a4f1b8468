//! Client for the local text-generation service.
//!
//! Speaks the Ollama `/api/generate` protocol: the model is fixed by
//! configuration and streaming is always off, so the upstream answers with a
//! single JSON document that is relayed to the caller untouched.

use crate::config::GenerationConfig;
use crate::services::metrics::record_generation;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use service_core::observability::TracedClientExt;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Error type for generation requests.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation service unreachable: {0}")]
    Unreachable(String),

    #[error("Generation service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Failed to read generation response: {0}")]
    ReadBody(String),
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        AppError::UpstreamError(anyhow::Error::new(err))
    }
}

/// Body accepted by `POST /generate`. Only `prompt` is used; `model` and
/// `stream` are accepted for compatibility and overridden.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct UpstreamRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Upstream status and body, unmodified.
#[derive(Debug, Clone)]
pub struct RelayedResponse {
    pub status: u16,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct GenerationClient {
    client: Client,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl GenerationClient {
    pub fn new(config: &GenerationConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| {
                AppError::InternalError(anyhow::anyhow!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: generate_endpoint(&config.base_url),
            model: config.model.clone(),
            timeout: config.timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Forward `prompt` to the generation service.
    ///
    /// Non-2xx upstream answers are not errors here; they are relayed as-is.
    pub async fn generate(
        &self,
        prompt: &str,
        request_id: Option<&str>,
    ) -> Result<RelayedResponse, GenerationError> {
        let payload = UpstreamRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            prompt_len = prompt.len(),
            "Sending request to generation service"
        );

        let start = Instant::now();
        let result = self.send(&payload, request_id).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(relayed) => {
                record_generation(&relayed.status.to_string(), elapsed);
                tracing::info!(
                    status = relayed.status,
                    body_len = relayed.body.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Generation service responded"
                );
            }
            Err(e) => {
                record_generation("error", elapsed);
                tracing::warn!(
                    error = %e,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Generation request failed"
                );
            }
        }

        result
    }

    async fn send(
        &self,
        payload: &UpstreamRequest<'_>,
        request_id: Option<&str>,
    ) -> Result<RelayedResponse, GenerationError> {
        let response = self
            .client
            .traced_post(&self.endpoint)
            .json(payload)
            .timeout(self.timeout)
            .send_with_request_id(request_id)
            .await
            .map_err(|e| self.classify(e, GenerationError::Unreachable))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.classify(e, GenerationError::ReadBody))?;

        Ok(RelayedResponse { status, body })
    }

    fn classify(
        &self,
        err: reqwest::Error,
        otherwise: fn(String) -> GenerationError,
    ) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout(self.timeout)
        } else {
            otherwise(err.to_string())
        }
    }
}

fn generate_endpoint(base_url: &str) -> String {
    format!("{}/api/generate", base_url.trim_end_matches('/'))
}
