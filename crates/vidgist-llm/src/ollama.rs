//! Ollama HTTP client.

use crate::error::{LlmError, LlmResult};
use crate::types::*;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use vidgist_config::ProviderConfig;

/// Client for Ollama's /api/generate endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    host: String,
    model: String,
    options: SamplingOptions,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a new client from configuration.
    pub fn from_config(config: &ProviderConfig) -> LlmResult<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            host: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            options: SamplingOptions::from_config(config),
            timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check if Ollama server is available.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.host);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Generate text (non-streaming).
    pub async fn generate(&self, request: GenerateRequest) -> LlmResult<GenerateResponse> {
        let url = format!("{}/api/generate", self.host);
        debug!("Generating with model {}", request.model);

        // Ensure streaming is off for this method
        let mut request = request;
        request.stream = false;

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::ServerNotRunning {
                        host: self.host.clone(),
                    }
                } else if e.is_timeout() {
                    LlmError::Timeout {
                        seconds: self.timeout.as_secs(),
                    }
                } else {
                    LlmError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();

            if text.contains("not found") || status.as_u16() == 404 {
                return Err(LlmError::ModelNotFound {
                    model: request.model,
                });
            }

            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        let generate_response: GenerateResponse = response.json().await?;
        Ok(generate_response)
    }

    /// Run the configured model on `prompt`, optionally with one image.
    pub async fn complete(&self, prompt: &str, image: Option<&Path>) -> LlmResult<String> {
        let mut request = GenerateRequest::new(&self.model, prompt).with_options(&self.options);
        if let Some(path) = image {
            request = request.with_image(encode_image(path).await?);
        }

        let response = self.generate(request).await?;
        let text = response.response.trim().to_string();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: "ollama".to_string(),
            });
        }
        Ok(text)
    }
}
