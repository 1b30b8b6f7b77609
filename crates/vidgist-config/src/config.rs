//! Configuration structures and loading.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::AppPaths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub trigger: TriggerConfig,

    #[serde(default)]
    pub video: VideoConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub summary: SummaryConfig,

    #[serde(default)]
    pub persona: PersonaConfig,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> ConfigResult<Self> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&paths.config_file)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config.normalized())
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> ConfigResult<()> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&paths.config_file)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Create a default config file with comments.
    pub fn create_default_file(path: &PathBuf) -> ConfigResult<()> {
        let default_config = Self::default_config_string();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, default_config)?;
        Ok(())
    }

    /// Application paths with `general.data_dir` applied.
    pub fn paths(&self) -> ConfigResult<AppPaths> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        Ok(paths.with_data_dir(self.general.data_dir.as_deref()))
    }

    /// Clamp out-of-range values back to something usable.
    pub fn normalized(mut self) -> Self {
        let summary = &mut self.summary;
        if !(60..=6000).contains(&summary.reply_max_chars) {
            warn!(
                "summary.reply_max_chars = {} is out of range 60..=6000, using 200",
                summary.reply_max_chars
            );
            summary.reply_max_chars = 200;
        }
        if summary.max_chars == 0 {
            summary.max_chars = SummaryConfig::default().max_chars;
        }
        if summary.min_chars > summary.max_chars {
            warn!(
                "summary.min_chars = {} exceeds max_chars = {}",
                summary.min_chars, summary.max_chars
            );
            summary.min_chars = summary.max_chars;
        }

        let analysis = &mut self.analysis;
        analysis.frame_interval_sec = analysis.frame_interval_sec.max(1);
        analysis.max_extract_frames = analysis.max_extract_frames.max(1);
        analysis.max_described_frames = analysis
            .max_described_frames
            .clamp(1, analysis.max_extract_frames);

        self.video.retry_attempts = self.video.retry_attempts.max(1);
        self
    }

    /// Set a value by dotted key, e.g. `video.max_duration_min`.
    pub fn set_value(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["general", "data_dir"] => self.general.data_dir = Some(value.to_string()),
            ["general", "cache_enabled"] => self.general.cache_enabled = parse(key, value)?,
            ["general", "temp_file_max_age_min"] => {
                self.general.temp_file_max_age_min = parse(key, value)?
            }
            ["general", "sweep_interval_min"] => {
                self.general.sweep_interval_min = parse(key, value)?
            }
            ["trigger", "auto_detect"] => self.trigger.auto_detect = parse(key, value)?,
            ["trigger", "command"] => self.trigger.command = value.to_string(),
            ["video", "max_duration_min"] => self.video.max_duration_min = parse(key, value)?,
            ["video", "max_size_mb"] => self.video.max_size_mb = parse(key, value)?,
            ["video", "download_timeout_sec"] => {
                self.video.download_timeout_sec = parse(key, value)?
            }
            ["video", "retry_attempts"] => self.video.retry_attempts = parse(key, value)?,
            ["video", "retry_interval_sec"] => self.video.retry_interval_sec = parse(key, value)?,
            ["video", "sessdata"] => self.video.sessdata = Some(value.to_string()),
            ["video", "enable_asr"] => self.video.enable_asr = parse(key, value)?,
            ["video", "whisper_model"] => self.video.whisper_model = value.to_string(),
            ["video", "asr_language"] => self.video.asr_language = value.to_string(),
            ["analysis", "mode"] => self.analysis.mode = parse(key, value)?,
            ["analysis", "visual_max_duration_min"] => {
                self.analysis.visual_max_duration_min = parse(key, value)?
            }
            ["analysis", "frame_interval_sec"] => {
                self.analysis.frame_interval_sec = parse(key, value)?
            }
            ["analysis", section, field] => {
                let provider = match *section {
                    "text_model" => &mut self.analysis.text_model,
                    "vlm" => &mut self.analysis.vlm,
                    "video_model" => &mut self.analysis.video_model,
                    _ => return Err(ConfigError::UnknownKey(key.to_string())),
                };
                provider.set_value(key, field, value)?;
            }
            ["summary", "enable_summary"] => self.summary.enable_summary = parse(key, value)?,
            ["summary", "min_chars"] => self.summary.min_chars = parse(key, value)?,
            ["summary", "max_chars"] => self.summary.max_chars = parse(key, value)?,
            ["summary", "reply_max_chars"] => self.summary.reply_max_chars = parse(key, value)?,
            ["summary", "language"] => self.summary.language = value.to_string(),
            ["persona", "name"] => self.persona.name = value.to_string(),
            ["persona", "personality"] => self.persona.personality = value.to_string(),
            ["persona", "reply_style"] => self.persona.reply_style = value.to_string(),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }

        Ok(())
    }

    /// Generate a default config file with helpful comments.
    pub fn default_config_string() -> String {
        r#"# Vidgist Configuration
# Bilibili video digests for chat

[general]
# Data directory for cache and temp files
# data_dir = "~/.local/share/vidgist"

# Cache processed videos and summaries
cache_enabled = true

# Minutes before temp downloads, frames and audio are swept.
# 0 deletes them as soon as a request finishes.
temp_file_max_age_min = 60

# How often the background sweep runs (minutes)
sweep_interval_min = 30

[trigger]
# Detect video links in ordinary messages
auto_detect = true

# Explicit command word, e.g. "/bili BV1xx411c7mD"
command = "bili"

[video]
# Reject videos longer than this (minutes)
max_duration_min = 30

# Refuse downloads larger than this (MB)
max_size_mb = 200

download_timeout_sec = 300
retry_attempts = 3
retry_interval_sec = 2.0

# Login cookie, needed for subtitles
# sessdata = ""

# Speech recognition via the whisper CLI
enable_asr = false
whisper_model = "base"
asr_language = "zh"

[analysis]
# default: frames described by the text model
# builtin: frames described by [analysis.vlm]
# video:   whole file sent to [analysis.video_model], frames as fallback
# none:    metadata and subtitles only
mode = "default"

# Skip visual analysis for videos longer than this (minutes, 0 disables it)
visual_max_duration_min = 10

# Seconds between sampled frames
frame_interval_sec = 6
max_extract_frames = 10
max_described_frames = 5

[analysis.text_model]
provider = "ollama"
base_url = "http://localhost:11434"
model = "qwen2.5vl:7b"
timeout_seconds = 120
max_retries = 2
retry_interval_sec = 5.0

[analysis.vlm]
provider = "openai"
base_url = "https://api.openai.com/v1"
api_key_env = "OPENAI_API_KEY"
model = "gpt-4o-mini"
timeout_seconds = 60
max_retries = 2
retry_interval_sec = 5.0

# Provider-specific parameters are forwarded as-is
[analysis.vlm.extra]

[analysis.video_model]
provider = "ark"
base_url = "https://ark.cn-beijing.volces.com/api/v3"
api_key_env = "ARK_API_KEY"
model = "doubao-seed-1-6-251015"
timeout_seconds = 120
max_retries = 2
retry_interval_sec = 10.0
# fps = 1.0

[summary]
# Generate a summary in auto-detect mode (otherwise the raw digest is used)
enable_summary = true
min_chars = 80
max_chars = 120
reply_max_chars = 200
language = "Chinese"

[persona]
name = "Vidgist"
personality = "friendly and concise"
reply_style = "casual, like chatting with a friend"
"#
        .to_string()
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub data_dir: Option<String>,
    pub cache_enabled: bool,
    pub temp_file_max_age_min: u64,
    pub sweep_interval_min: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            cache_enabled: true,
            temp_file_max_age_min: 60,
            sweep_interval_min: 30,
        }
    }
}

/// When the pipeline runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub auto_detect: bool,
    pub command: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            auto_detect: true,
            command: "bili".to_string(),
        }
    }
}

/// Download limits and source access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub max_duration_min: u64,
    pub max_size_mb: u64,
    pub download_timeout_sec: u64,
    pub retry_attempts: u32,
    pub retry_interval_sec: f64,
    pub sessdata: Option<String>,
    pub enable_asr: bool,
    pub whisper_model: String,
    pub asr_language: String,
}

impl VideoConfig {
    /// The login cookie, if one is set.
    pub fn auth_token(&self) -> Option<&str> {
        self.sessdata.as_deref().filter(|s| !s.trim().is_empty())
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            max_duration_min: 30,
            max_size_mb: 200,
            download_timeout_sec: 300,
            retry_attempts: 3,
            retry_interval_sec: 2.0,
            sessdata: None,
            enable_asr: false,
            whisper_model: "base".to_string(),
            asr_language: "zh".to_string(),
        }
    }
}

/// Which visual analysis strategy is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    #[default]
    Default,
    Builtin,
    Video,
    None,
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(AnalysisMode::Default),
            "builtin" => Ok(AnalysisMode::Builtin),
            "video" => Ok(AnalysisMode::Video),
            "none" => Ok(AnalysisMode::None),
            other => Err(format!("unknown analysis mode: {}", other)),
        }
    }
}

/// Visual analysis settings and the model providers behind them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub mode: AnalysisMode,
    pub visual_max_duration_min: u64,
    pub frame_interval_sec: u64,
    pub max_extract_frames: usize,
    pub max_described_frames: usize,
    pub text_model: ProviderConfig,
    pub vlm: ProviderConfig,
    pub video_model: ProviderConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::Default,
            visual_max_duration_min: 10,
            frame_interval_sec: 6,
            max_extract_frames: 10,
            max_described_frames: 5,
            text_model: ProviderConfig::default(),
            vlm: ProviderConfig::openai_default(),
            video_model: ProviderConfig::ark_default(),
        }
    }
}

/// Which API a provider section talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ollama,
    OpenAi,
    Gemini,
    Ark,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            "ark" => Ok(ProviderKind::Ark),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

/// A scalar forwarded verbatim into provider requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// Connection and sampling settings for one model provider.
///
/// Known fields are typed; anything in `extra` is passed through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    pub base_url: String,
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    pub api_key_env: Option<String>,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_interval_sec: f64,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    /// Sampling rate for server-side video preprocessing.
    pub fps: Option<f64>,
    /// Replaces the built-in prompt for this provider.
    pub prompt: Option<String>,
    pub extra: BTreeMap<String, ScalarValue>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Ollama,
            base_url: "http://localhost:11434".to_string(),
            api_key: None,
            api_key_env: None,
            model: "qwen2.5vl:7b".to_string(),
            timeout_seconds: 120,
            max_retries: 2,
            retry_interval_sec: 5.0,
            temperature: None,
            max_tokens: None,
            top_p: None,
            top_k: None,
            fps: None,
            prompt: None,
            extra: BTreeMap::new(),
        }
    }
}

impl ProviderConfig {
    /// OpenAI-compatible vision model.
    pub fn openai_default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 60,
            ..Self::default()
        }
    }

    /// Volcengine Ark video-understanding model.
    pub fn ark_default() -> Self {
        Self {
            provider: ProviderKind::Ark,
            base_url: "https://ark.cn-beijing.volces.com/api/v3".to_string(),
            api_key_env: Some("ARK_API_KEY".to_string()),
            model: "doubao-seed-1-6-251015".to_string(),
            retry_interval_sec: 10.0,
            ..Self::default()
        }
    }

    /// The configured API key, falling back to `api_key_env`.
    pub fn resolved_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Some(key.trim().to_string());
        }
        let var = self.api_key_env.as_deref()?;
        std::env::var(var).ok().filter(|k| !k.trim().is_empty())
    }

    fn set_value(&mut self, key: &str, field: &str, value: &str) -> ConfigResult<()> {
        match field {
            "provider" => {
                self.provider = value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                })?
            }
            "base_url" => self.base_url = value.to_string(),
            "api_key" => self.api_key = Some(value.to_string()),
            "api_key_env" => self.api_key_env = Some(value.to_string()),
            "model" => self.model = value.to_string(),
            "timeout_seconds" => self.timeout_seconds = parse(key, value)?,
            "max_retries" => self.max_retries = parse(key, value)?,
            "retry_interval_sec" => self.retry_interval_sec = parse(key, value)?,
            "temperature" => self.temperature = Some(parse(key, value)?),
            "max_tokens" => self.max_tokens = Some(parse(key, value)?),
            "fps" => self.fps = Some(parse(key, value)?),
            "prompt" => self.prompt = Some(value.to_string()),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

/// Summary generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub enable_summary: bool,
    pub min_chars: usize,
    pub max_chars: usize,
    pub reply_max_chars: usize,
    pub language: String,
    pub description_limit: usize,
    pub text_limit: usize,
    pub text_only_limit: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enable_summary: true,
            min_chars: 80,
            max_chars: 120,
            reply_max_chars: 200,
            language: "Chinese".to_string(),
            description_limit: 500,
            text_limit: 800,
            text_only_limit: 1200,
        }
    }
}

/// Persona used for command-mode replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    pub name: String,
    pub personality: String,
    pub reply_style: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: "Vidgist".to_string(),
            personality: "friendly and concise".to_string(),
            reply_style: "casual, like chatting with a friend".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.video.max_duration_min, 30);
        assert_eq!(config.analysis.mode, AnalysisMode::Default);
        assert_eq!(config.analysis.video_model.provider, ProviderKind::Ark);
        assert!(config.summary.enable_summary);
    }

    #[test]
    fn test_default_string_parses_to_defaults() {
        let parsed: Config = toml::from_str(&Config::default_config_string()).unwrap();
        let defaults = Config::default();

        assert_eq!(parsed.video.max_size_mb, defaults.video.max_size_mb);
        assert_eq!(parsed.analysis.vlm.model, defaults.analysis.vlm.model);
        assert_eq!(parsed.analysis.video_model.base_url, defaults.analysis.video_model.base_url);
        assert_eq!(parsed.summary.max_chars, defaults.summary.max_chars);
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
            [analysis]
            mode = "video"

            [analysis.vlm]
            provider = "gemini"
            model = "gemini-2.0-flash"

            [analysis.vlm.extra]
            seed = 7
            safety = "off"
            "#
        )
        .unwrap();

        let path = temp_file.path().to_path_buf();
        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.analysis.mode, AnalysisMode::Video);
        assert_eq!(config.analysis.vlm.provider, ProviderKind::Gemini);
        assert_eq!(
            config.analysis.vlm.extra.get("seed"),
            Some(&ScalarValue::Integer(7))
        );
        assert_eq!(
            config.analysis.vlm.extra.get("safety"),
            Some(&ScalarValue::String("off".to_string()))
        );
        // Defaults should still work
        assert_eq!(config.video.max_duration_min, 30);
        assert_eq!(config.analysis.vlm.timeout_seconds, 120);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let mut config = Config::default();
        config.summary.reply_max_chars = 10;
        config.summary.min_chars = 500;
        config.analysis.frame_interval_sec = 0;
        config.analysis.max_described_frames = 50;

        let config = config.normalized();
        assert_eq!(config.summary.reply_max_chars, 200);
        assert_eq!(config.summary.min_chars, config.summary.max_chars);
        assert_eq!(config.analysis.frame_interval_sec, 1);
        assert_eq!(config.analysis.max_described_frames, 10);
    }

    #[test]
    fn test_set_value() {
        let mut config = Config::default();
        config.set_value("video.max_duration_min", "45").unwrap();
        config.set_value("analysis.mode", "none").unwrap();
        config.set_value("analysis.vlm.model", "llava").unwrap();
        config.set_value("summary.enable_summary", "false").unwrap();

        assert_eq!(config.video.max_duration_min, 45);
        assert_eq!(config.analysis.mode, AnalysisMode::None);
        assert_eq!(config.analysis.vlm.model, "llava");
        assert!(!config.summary.enable_summary);

        assert!(matches!(
            config.set_value("video.max_duration_min", "forever"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set_value("nope.key", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_resolved_api_key_prefers_inline() {
        let provider = ProviderConfig {
            api_key: Some(" inline ".to_string()),
            api_key_env: Some("VIDGIST_TEST_UNSET_KEY".to_string()),
            ..ProviderConfig::default()
        };
        assert_eq!(provider.resolved_api_key().as_deref(), Some("inline"));

        let provider = ProviderConfig {
            api_key: Some(String::new()),
            api_key_env: Some("VIDGIST_TEST_UNSET_KEY".to_string()),
            ..ProviderConfig::default()
        };
        assert_eq!(provider.resolved_api_key(), None);
    }
}
