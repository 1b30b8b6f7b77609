//! OpenAI-compatible chat completions client.

use crate::error::{check_status, map_send_error, LlmError, LlmResult};
use crate::types::*;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use vidgist_config::ProviderConfig;

/// Client for any endpoint speaking the OpenAI chat completions protocol.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    options: SamplingOptions,
    timeout_secs: u64,
}

impl OpenAiClient {
    /// Create a client; fails without an API key.
    pub fn from_config(config: &ProviderConfig) -> LlmResult<Self> {
        let api_key = config
            .resolved_api_key()
            .ok_or_else(|| LlmError::MissingApiKey {
                provider: "openai".to_string(),
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            options: SamplingOptions::from_config(config),
            timeout_secs: config.timeout_seconds,
        })
    }

    fn request_body(&self, prompt: &str, image: Option<(&str, String)>) -> Value {
        let content = match image {
            Some((mime, data)) => json!([
                {"type": "text", "text": prompt},
                {"type": "image_url", "image_url": {"url": format!("data:{};base64,{}", mime, data)}}
            ]),
            None => Value::from(prompt),
        };

        let mut body = Map::new();
        body.insert("model".to_string(), Value::from(self.model.clone()));
        body.insert(
            "messages".to_string(),
            json!([{"role": "user", "content": content}]),
        );
        self.options.apply(&mut body, &ParamNames::OPENAI);
        Value::Object(body)
    }

    /// Run the configured model on `prompt`, optionally with one image.
    pub async fn complete(&self, prompt: &str, image: Option<&Path>) -> LlmResult<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("Chat completion with model {}", self.model);

        let image = match image {
            Some(path) => Some((image_mime_type(path), encode_image(path).await?)),
            None => None,
        };
        let body = self.request_body(prompt, image);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout_secs))?;

        let response = check_status(response).await?;
        let completion: ChatCompletionResponse = response.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LlmError::EmptyResponse {
                provider: "openai".to_string(),
            })
    }
}
