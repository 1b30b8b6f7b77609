//! Gemini generateContent client.

use crate::error::{check_status, map_send_error, LlmError, LlmResult};
use crate::types::*;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use vidgist_config::ProviderConfig;

/// Client for the Gemini REST API.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    options: SamplingOptions,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn from_config(config: &ProviderConfig) -> LlmResult<Self> {
        let api_key = config
            .resolved_api_key()
            .ok_or_else(|| LlmError::MissingApiKey {
                provider: "gemini".to_string(),
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
        let mut parts = vec![json!({"text": prompt})];
        if let Some((mime, data)) = image {
            parts.push(json!({"inline_data": {"mime_type": mime, "data": data}}));
        }

        let mut generation = Map::new();
        self.options.apply(&mut generation, &ParamNames::GEMINI);

        let mut body = Map::new();
        body.insert("contents".to_string(), json!([{"parts": parts}]));
        if !generation.is_empty() {
            body.insert("generationConfig".to_string(), Value::Object(generation));
        }
        Value::Object(body)
    }

    /// Run the configured model on `prompt`, optionally with one image.
    pub async fn complete(&self, prompt: &str, image: Option<&Path>) -> LlmResult<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!("Gemini generateContent with model {}", self.model);

        let image = match image {
            Some(path) => Some((image_mime_type(path), encode_image(path).await?)),
            None => None,
        };
        let body = self.request_body(prompt, image);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout_secs))?;

        let response = check_status(response).await?;
        let parsed: GeminiResponse = response.json().await?;

        let text = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("")
            .trim()
            .to_string();

        if text.is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: "gemini".to_string(),
            });
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidgist_config::ProviderKind;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> ProviderConfig {
        ProviderConfig {
            provider: ProviderKind::Gemini,
            base_url: base_url.to_string(),
            api_key: Some("g-key".to_string()),
            model: "gemini-2.0-flash".to_string(),
            top_k: Some(20),
            timeout_seconds: 5,
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn test_request_body_uses_gemini_names() {
        let client = GeminiClient::from_config(&config("http://localhost")).unwrap();
        let body = client.request_body("Describe", Some(("image/jpeg", "QUJD".to_string())));

        assert_eq!(body["generationConfig"]["topK"], 20);
        assert_eq!(body["contents"][0]["parts"][1]["inline_data"]["data"], "QUJD");
    }

    #[tokio::test]
    async fn test_complete_joins_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .and(query_param("key", "g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "Two people "}, {"text": "talking."}]}}]
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::from_config(&config(&server.uri())).unwrap();
        assert_eq!(
            client.complete("Describe", None).await.unwrap(),
            "Two people talking."
        );
    }

    #[tokio::test]
    async fn test_no_candidates_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let client = GeminiClient::from_config(&config(&server.uri())).unwrap();
        let err = client.complete("Describe", None).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse { .. }));
    }
}
