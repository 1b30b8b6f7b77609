//! Routing of pipeline capabilities to configured providers.

use crate::ark::ArkClient;
use crate::error::{LlmError, LlmResult};
use crate::gemini::GeminiClient;
use crate::lazy::LazyClient;
use crate::ollama::OllamaClient;
use crate::openai::OpenAiClient;
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, warn};
use vidgist_config::{AnalysisConfig, AnalysisMode, ProviderConfig, ProviderKind};
use vidgist_core::{retry, Capabilities, RetryPolicy};

/// A text or vision chat provider.
#[derive(Clone)]
pub enum ChatClient {
    Ollama(OllamaClient),
    OpenAi(OpenAiClient),
    Gemini(GeminiClient),
}

impl ChatClient {
    pub fn from_config(config: &ProviderConfig) -> LlmResult<Self> {
        match config.provider {
            ProviderKind::Ollama => Ok(ChatClient::Ollama(OllamaClient::from_config(config)?)),
            ProviderKind::OpenAi => Ok(ChatClient::OpenAi(OpenAiClient::from_config(config)?)),
            ProviderKind::Gemini => Ok(ChatClient::Gemini(GeminiClient::from_config(config)?)),
            ProviderKind::Ark => Err(LlmError::InvalidConfig(
                "ark only supports video analysis".to_string(),
            )),
        }
    }

    pub async fn complete(&self, prompt: &str, image: Option<&Path>) -> LlmResult<String> {
        match self {
            ChatClient::Ollama(c) => c.complete(prompt, image).await,
            ChatClient::OpenAi(c) => c.complete(prompt, image).await,
            ChatClient::Gemini(c) => c.complete(prompt, image).await,
        }
    }
}

/// One provider section with its lazily built client and retry policy.
struct Slot<T> {
    config: ProviderConfig,
    client: LazyClient<T>,
    policy: RetryPolicy,
}

impl<T: Clone> Slot<T> {
    fn new(name: &str, config: &ProviderConfig) -> Self {
        Self {
            config: config.clone(),
            client: LazyClient::new(name),
            policy: RetryPolicy::from_secs(
                config.max_retries.saturating_add(1),
                config.retry_interval_sec,
            ),
        }
    }

    fn client(&self, build: fn(&ProviderConfig) -> LlmResult<T>) -> Option<T> {
        self.client
            .get_or_init(|| build(&self.config).map_err(|e| e.to_string()))
    }

    /// The configured prompt override, or `default`.
    fn prompt<'a>(&'a self, default: &'a str) -> &'a str {
        self.config
            .prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(default)
    }
}

/// The pipeline's [`Capabilities`] backed by the configured providers.
///
/// Frame descriptions go to the `vlm` section in builtin mode and to
/// `text_model` otherwise. Whole-video analysis always uses `video_model`.
pub struct ModelHub {
    mode: AnalysisMode,
    text: Slot<ChatClient>,
    vlm: Slot<ChatClient>,
    video: Slot<ArkClient>,
}

impl ModelHub {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            mode: config.mode,
            text: Slot::new("Text model", &config.text_model),
            vlm: Slot::new("Vision model", &config.vlm),
            video: Slot::new("Video model", &config.video_model),
        }
    }

    fn image_slot(&self) -> &Slot<ChatClient> {
        match self.mode {
            AnalysisMode::Builtin => &self.vlm,
            _ => &self.text,
        }
    }

    async fn chat(
        slot: &Slot<ChatClient>,
        operation: &str,
        prompt: &str,
        image: Option<&Path>,
    ) -> Option<String> {
        let client = slot.client(ChatClient::from_config)?;
        match retry(&slot.policy, operation, || client.complete(prompt, image)).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("{} failed: {}", operation, e);
                None
            }
        }
    }
}

#[async_trait]
impl Capabilities for ModelHub {
    async fn describe_image(&self, path: &Path, prompt: &str) -> Option<String> {
        let slot = self.image_slot();
        debug!("Describing {:?} with {}", path, slot.config.model);
        Self::chat(slot, "Image description", slot.prompt(prompt), Some(path)).await
    }

    async fn describe_video(&self, path: &Path, prompt: &str) -> Option<String> {
        let slot = &self.video;
        let client = slot.client(ArkClient::from_config)?;
        let prompt = slot.prompt(prompt);

        match retry(&slot.policy, "Video analysis", || {
            client.describe_video(path, prompt)
        })
        .await
        {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Video analysis failed: {}", e);
                None
            }
        }
    }

    async fn generate_text(&self, prompt: &str) -> Option<String> {
        Self::chat(&self.text, "Text generation", prompt, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ollama(base_url: &str) -> ProviderConfig {
        ProviderConfig {
            base_url: base_url.to_string(),
            model: "local-vl".to_string(),
            timeout_seconds: 5,
            max_retries: 1,
            retry_interval_sec: 0.0,
            ..ProviderConfig::default()
        }
    }

    fn openai(base_url: &str) -> ProviderConfig {
        ProviderConfig {
            base_url: base_url.to_string(),
            api_key: Some("sk-test".to_string()),
            timeout_seconds: 5,
            max_retries: 1,
            retry_interval_sec: 0.0,
            ..ProviderConfig::openai_default()
        }
    }

    fn image() -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        std::fs::write(file.path(), b"jpeg").unwrap();
        file
    }

    async fn mount_ollama(server: &MockServer, text: &str) {
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "local-vl", "response": text, "done": true
            })))
            .mount(server)
            .await;
    }

    async fn mount_openai(server: &MockServer, text: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": text}}]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_default_mode_describes_with_text_model() {
        let local = MockServer::start().await;
        let remote = MockServer::start().await;
        mount_ollama(&local, "local answer").await;
        mount_openai(&remote, "remote answer").await;

        let config = AnalysisConfig {
            mode: AnalysisMode::Default,
            text_model: ollama(&local.uri()),
            vlm: openai(&remote.uri()),
            ..AnalysisConfig::default()
        };
        let hub = ModelHub::from_config(&config);
        let image = image();

        assert_eq!(
            hub.describe_image(image.path(), "Describe").await.as_deref(),
            Some("local answer")
        );
    }

    #[tokio::test]
    async fn test_builtin_mode_describes_with_vlm() {
        let local = MockServer::start().await;
        let remote = MockServer::start().await;
        mount_ollama(&local, "local answer").await;
        mount_openai(&remote, "remote answer").await;

        let config = AnalysisConfig {
            mode: AnalysisMode::Builtin,
            text_model: ollama(&local.uri()),
            vlm: openai(&remote.uri()),
            ..AnalysisConfig::default()
        };
        let hub = ModelHub::from_config(&config);
        let image = image();

        assert_eq!(
            hub.describe_image(image.path(), "Describe").await.as_deref(),
            Some("remote answer")
        );
        assert_eq!(hub.generate_text("Summarize").await.as_deref(), Some("local answer"));
    }

    #[tokio::test]
    async fn test_missing_key_disables_video_model() {
        let config = AnalysisConfig {
            mode: AnalysisMode::Video,
            video_model: ProviderConfig {
                api_key: None,
                api_key_env: None,
                ..ProviderConfig::ark_default()
            },
            ..AnalysisConfig::default()
        };
        let hub = ModelHub::from_config(&config);
        let video = tempfile::NamedTempFile::new().unwrap();

        assert_eq!(hub.describe_video(video.path(), "Describe").await, None);
        assert_eq!(hub.describe_video(video.path(), "Describe").await, None);
        assert!(hub
            .video
            .client
            .failure_reason()
            .is_some_and(|r| r.contains("ark")));
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let config = AnalysisConfig {
            text_model: ollama(&server.uri()),
            ..AnalysisConfig::default()
        };
        let hub = ModelHub::from_config(&config);

        assert_eq!(hub.generate_text("Summarize").await, None);
    }

    #[test]
    fn test_prompt_override() {
        let mut config = openai("http://localhost");
        config.prompt = Some("Custom prompt".to_string());
        let slot: Slot<ChatClient> = Slot::new("test", &config);
        assert_eq!(slot.prompt("Built-in"), "Custom prompt");

        config.prompt = Some("   ".to_string());
        let slot: Slot<ChatClient> = Slot::new("test", &config);
        assert_eq!(slot.prompt("Built-in"), "Built-in");
    }
}
