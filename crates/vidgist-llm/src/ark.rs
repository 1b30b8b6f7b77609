//! Volcengine Ark video-understanding client.
//!
//! A video is uploaded through the Files API, polled until the server has
//! finished preprocessing it, and then referenced from a /responses call.

use crate::error::{check_status, map_send_error, LlmError, LlmResult};
use crate::types::*;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use vidgist_config::ProviderConfig;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Client for the Ark Files and Responses APIs.
#[derive(Clone)]
pub struct ArkClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    fps: Option<f64>,
    options: SamplingOptions,
    timeout: Duration,
    poll_interval: Duration,
}

impl ArkClient {
    pub fn from_config(config: &ProviderConfig) -> LlmResult<Self> {
        let api_key = config
            .resolved_api_key()
            .ok_or_else(|| LlmError::MissingApiKey {
                provider: "ark".to_string(),
            })?;

        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            fps: config.fps,
            options: SamplingOptions::from_config(config),
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Override how often upload status is polled.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn upload(&self, video: &Path) -> LlmResult<ArkFile> {
        let bytes = tokio::fs::read(video).await?;
        let file_name = video
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4")
            .to_string();

        debug!("Uploading {} ({} bytes) to Ark", file_name, bytes.len());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("video/mp4")?;
        let mut form = Form::new().text("purpose", "user_data").part("file", part);
        if let Some(fps) = self.fps {
            form = form.text("preprocess_configs[video][fps]", fps.to_string());
        }

        let response = self
            .client
            .post(format!("{}/files", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout.as_secs()))?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Poll until the file leaves the `processing` state.
    async fn wait_until_ready(&self, mut file: ArkFile) -> LlmResult<ArkFile> {
        let deadline = Instant::now() + self.timeout;

        while file.status.as_deref() == Some("processing") {
            if Instant::now() >= deadline {
                return Err(LlmError::Timeout {
                    seconds: self.timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;

            let response = self
                .client
                .get(format!("{}/files/{}", self.base_url, file.id))
                .bearer_auth(&self.api_key)
                .send()
                .await
                .map_err(|e| map_send_error(e, self.timeout.as_secs()))?;
            file = check_status(response).await?.json().await?;
        }

        if file.status.as_deref() == Some("failed") {
            return Err(LlmError::FileProcessing(file.id));
        }
        Ok(file)
    }

    fn request_body(&self, file_id: &str, prompt: &str) -> Value {
        let mut body = Map::new();
        body.insert("model".to_string(), Value::from(self.model.clone()));
        body.insert(
            "input".to_string(),
            json!([{
                "role": "user",
                "content": [
                    {"type": "input_video", "file_id": file_id},
                    {"type": "input_text", "text": prompt}
                ]
            }]),
        );
        self.options.apply(&mut body, &ParamNames::OPENAI);
        Value::Object(body)
    }

    /// Upload `video` and ask the model about it.
    pub async fn describe_video(&self, video: &Path, prompt: &str) -> LlmResult<String> {
        let file = self.upload(video).await?;
        let file = self.wait_until_ready(file).await?;
        info!("Ark file {} ready, requesting analysis", file.id);

        let response = self
            .client
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&file.id, prompt))
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout.as_secs()))?;

        let parsed: ArkResponse = check_status(response).await?.json().await?;
        parsed
            .text()
            .map(|t| t.trim().to_string())
            .ok_or_else(|| LlmError::EmptyResponse {
                provider: "ark".to_string(),
            })
    }
}
