//! Request and response types for the provider APIs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use vidgist_config::ProviderConfig;

/// Optional sampling parameters shared by every provider.
///
/// Only values the user actually configured are sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplingOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    /// Provider-specific parameters forwarded as-is.
    pub extra: BTreeMap<String, Value>,
}

impl SamplingOptions {
    pub fn from_config(config: &ProviderConfig) -> Self {
        let extra = config
            .extra
            .iter()
            .filter_map(|(k, v)| serde_json::to_value(v).ok().map(|v| (k.clone(), v)))
            .collect();

        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
            top_k: config.top_k,
            extra,
        }
    }

    /// Write the configured values into `target` under the given key names.
    ///
    /// Extra parameters never overwrite keys already present.
    pub fn apply(&self, target: &mut Map<String, Value>, names: &ParamNames) {
        if let Some(t) = self.temperature {
            target.insert(names.temperature.to_string(), Value::from(t));
        }
        if let Some(m) = self.max_tokens {
            target.insert(names.max_tokens.to_string(), Value::from(m));
        }
        if let Some(p) = self.top_p {
            target.insert(names.top_p.to_string(), Value::from(p));
        }
        if let Some(k) = self.top_k {
            target.insert(names.top_k.to_string(), Value::from(k));
        }
        for (key, value) in &self.extra {
            target.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
}

/// What each provider calls the common sampling parameters.
#[derive(Debug, Clone, Copy)]
pub struct ParamNames {
    pub temperature: &'static str,
    pub max_tokens: &'static str,
    pub top_p: &'static str,
    pub top_k: &'static str,
}

impl ParamNames {
    pub const OPENAI: ParamNames = ParamNames {
        temperature: "temperature",
        max_tokens: "max_tokens",
        top_p: "top_p",
        top_k: "top_k",
    };

    pub const OLLAMA: ParamNames = ParamNames {
        temperature: "temperature",
        max_tokens: "num_predict",
        top_p: "top_p",
        top_k: "top_k",
    };

    pub const GEMINI: ParamNames = ParamNames {
        temperature: "temperature",
        max_tokens: "maxOutputTokens",
        top_p: "topP",
        top_k: "topK",
    };
}

/// MIME type for an image path, by extension.
pub fn image_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// Read an image and encode it as standard base64.
pub async fn encode_image(path: &Path) -> std::io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(STANDARD.encode(bytes))
}

/// Request body for the Ollama /api/generate endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Base64-encoded images for multimodal models.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
}

impl GenerateRequest {
    /// Create a new generation request.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            images: None,
            stream: false,
            options: None,
        }
    }

    /// Set the system prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Attach a base64-encoded image.
    pub fn with_image(mut self, image_base64: String) -> Self {
        self.images.get_or_insert_with(Vec::new).push(image_base64);
        self
    }

    /// Set generation options from sampling parameters.
    pub fn with_options(mut self, options: &SamplingOptions) -> Self {
        let mut map = Map::new();
        options.apply(&mut map, &ParamNames::OLLAMA);
        if !map.is_empty() {
            self.options = Some(map);
        }
        self
    }
}

/// Response from the Ollama /api/generate endpoint (non-streaming).
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub model: String,
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub eval_count: Option<u32>,
}

/// Response from an OpenAI-compatible /chat/completions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Response from Gemini's generateContent endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiContent {
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiPart {
    #[serde(default)]
    pub text: Option<String>,
}

/// An uploaded file on the Ark Files API.
#[derive(Debug, Clone, Deserialize)]
pub struct ArkFile {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Response from the Ark /responses endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ArkResponse {
    #[serde(default)]
    pub output: Vec<ArkOutputItem>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArkOutputItem {
    #[serde(default)]
    pub content: Vec<ArkContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArkContent {
    #[serde(default)]
    pub text: Option<String>,
}

impl ArkResponse {
    /// First text found in `output`, falling back to chat-style `choices`.
    pub fn text(&self) -> Option<String> {
        self.output
            .iter()
            .flat_map(|item| item.content.iter())
            .find_map(|c| c.text.clone())
            .or_else(|| {
                self.choices
                    .first()
                    .and_then(|c| c.message.content.clone())
            })
            .filter(|t| !t.trim().is_empty())
    }
}
