//! CLI command implementations.

pub mod cache;
pub mod check;
pub mod config;
pub mod detect;
pub mod init;
pub mod summarize;
pub mod sweep;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use vidgist_bilibili::BiliClient;
use vidgist_cache::ContentCache;
use vidgist_config::{AppPaths, Config};
use vidgist_core::Workspace;
use vidgist_llm::ModelHub;
use vidgist_media::MediaToolkit;
use vidgist_pipeline::Orchestrator;

/// Get the application paths.
pub fn get_paths() -> Result<AppPaths> {
    AppPaths::new().context("Failed to determine application directories")
}

/// Load the config together with the paths it points at.
pub fn load_config() -> Result<(Config, AppPaths)> {
    let paths = get_paths()?;
    let config = Config::load_from(&paths.config_file).context("Failed to load config")?;
    let paths = paths.with_data_dir(config.general.data_dir.as_deref());
    Ok((config, paths))
}

/// Open the temp workspace under the data directory.
pub fn open_workspace(paths: &AppPaths) -> Result<Workspace> {
    Workspace::open(&paths.temp_dir).context("Failed to create temp workspace")
}

/// Open the content cache, failing if it can't be created.
pub fn open_cache(paths: &AppPaths) -> Result<ContentCache> {
    ContentCache::open(&paths.cache_dir).context("Failed to open content cache")
}

/// Wire the concrete Bilibili, model and FFmpeg backends into an orchestrator.
pub fn build_orchestrator(config: &Config, paths: &AppPaths) -> Result<Orchestrator> {
    let workspace = open_workspace(paths)?;

    let source = BiliClient::new(
        config.video.sessdata.clone(),
        Duration::from_secs(config.video.download_timeout_sec),
    )
    .context("Failed to create Bilibili client")?;

    let language = match config.video.asr_language.trim() {
        "" | "auto" => None,
        lang => Some(lang.to_string()),
    };
    let media =
        MediaToolkit::new(workspace.clone()).with_whisper(&config.video.whisper_model, language);

    let cache = if config.general.cache_enabled {
        match ContentCache::open(&paths.cache_dir) {
            Ok(cache) => Some(cache),
            Err(e) => {
                tracing::warn!("Cache unavailable, continuing without it: {}", e);
                None
            }
        }
    } else {
        None
    };

    Ok(Orchestrator::new(
        config,
        Arc::new(source),
        Arc::new(ModelHub::from_config(&config.analysis)),
        Arc::new(media),
        workspace,
        cache,
    ))
}

/// Create the tokio runtime used by async commands.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to create async runtime")
}
