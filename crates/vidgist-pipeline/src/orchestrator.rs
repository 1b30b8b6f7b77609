//! Cache-aware entry points for auto-detected references and explicit commands.

use crate::error::{PipelineError, PipelineResult};
use crate::processor::{Processor, ProcessorSettings};
use crate::summarizer::{
    fallback_reply, render_raw_info, render_summary_block, Summarizer, SummarySettings,
};
use crate::sweeper::sweep_once;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use vidgist_cache::ContentCache;
use vidgist_config::Config;
use vidgist_core::{
    CacheRecord, Capabilities, ErrorKind, SweepStats, VideoIdentity, VideoSource, Workspace,
};
use vidgist_media::Media;

/// Prefix of command-mode failure messages.
pub const DIGEST_MARKER: &str = "[video digest]";

/// Appears in every rendered digest; messages that already carry one are skipped.
const DIGEST_HEADER: &str = "About this Bilibili video";

/// Orchestration switches and the limits quoted in failure messages.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub auto_detect: bool,
    pub enable_summary: bool,
    pub max_duration_min: u64,
    pub max_size_mb: u64,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            auto_detect: config.trigger.auto_detect,
            enable_summary: config.summary.enable_summary,
            max_duration_min: config.video.max_duration_min,
            max_size_mb: config.video.max_size_mb,
        }
    }
}

/// How a command-mode answer is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Presentation {
    /// A generated summary under the video header.
    Summary,
    /// Everything extracted, without any model-written text.
    Raw,
    /// A casual reply in the persona's voice.
    #[default]
    Reply,
}

/// Result of an explicit command.
#[derive(Debug)]
pub enum CommandOutcome {
    Replied {
        /// The text to send back.
        reply: String,
        /// The plain digest to keep alongside the conversation.
        digest: String,
        record: CacheRecord,
    },
    /// A user-facing apology.
    Failed(String),
}

/// Ties the source, processor, summarizer and cache together.
pub struct Orchestrator {
    source: Arc<dyn VideoSource>,
    processor: Processor,
    summarizer: Summarizer,
    cache: Option<ContentCache>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        source: Arc<dyn VideoSource>,
        capabilities: Arc<dyn Capabilities>,
        media: Arc<dyn Media>,
        workspace: Workspace,
        cache: Option<ContentCache>,
    ) -> Self {
        let processor = Processor::new(
            Arc::clone(&source),
            Arc::clone(&capabilities),
            media,
            workspace,
            ProcessorSettings::from_config(config),
        );
        let summarizer = Summarizer::new(capabilities, SummarySettings::from_config(config));

        Self {
            source,
            processor,
            summarizer,
            cache,
            settings: OrchestratorSettings::from_config(config),
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    /// Remove temp files that earlier requests left past their retention age.
    ///
    /// Nothing to do when resources are released as soon as a request ends.
    pub async fn reclaim_expired(&self) -> SweepStats {
        let minutes = self.processor.settings().temp_file_max_age_min;
        if minutes == 0 {
            return SweepStats::default();
        }

        let stats = sweep_once(self.processor.workspace(), Duration::from_secs(minutes * 60)).await;
        if stats.files_deleted + stats.dirs_deleted > 0 {
            info!(
                "Reclaimed {} files and {} frame directories from earlier runs",
                stats.files_deleted, stats.dirs_deleted
            );
        }
        stats
    }

    /// Find and resolve the first video reference in `text`.
    pub async fn resolve(&self, text: &str) -> PipelineResult<VideoIdentity> {
        self.source
            .resolve(text)
            .await
            .ok_or_else(|| PipelineError::NoReference(text.trim().to_string()))
    }

    /// Produce a cache record for `identity`, from the cache when possible.
    ///
    /// With `with_summary`, the record carries a summary; a cached record
    /// without one is summarized from its stored content instead of being
    /// processed again.
    pub async fn digest(
        &self,
        identity: &VideoIdentity,
        with_summary: bool,
    ) -> PipelineResult<CacheRecord> {
        let key = identity.fingerprint();

        if let Some(record) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            if !with_summary || record.summary_text().is_some() {
                info!("Cache hit for {}", key);
                return Ok(record);
            }

            debug!("Cached record for {} has no summary, summarizing", key);
            let summary = self.summarizer.summarize(&record).await.ok_or_else(|| {
                PipelineError::Failed {
                    kind: ErrorKind::NoContent,
                    message: format!("summary generation failed for {}", key),
                }
            })?;
            let record = record.with_summary(summary);
            self.store(&key, &record);
            return Ok(record);
        }

        let result = self.processor.process(identity).await?;
        if !result.success {
            let kind = result.error_kind.unwrap_or(ErrorKind::Unknown);
            let message = result
                .error
                .clone()
                .unwrap_or_else(|| format!("failed to process {}", key));
            warn!("Processing {} failed: {}", key, message);
            return Err(PipelineError::Failed { kind, message });
        }

        let descriptions = if result.visual_method.is_frame_based() {
            self.summarizer.describe_frames(&result.frame_paths).await
        } else {
            Vec::new()
        };
        let record = result.to_record(descriptions);
        drop(result);

        if !with_summary {
            self.store(&key, &record);
            info!("Processed {}: {}", key, record.title);
            return Ok(record);
        }

        match self.summarizer.summarize(&record).await {
            Some(summary) => {
                let record = record.with_summary(summary);
                self.store(&key, &record);
                info!("Summarized {}: {}", key, record.title);
                Ok(record)
            }
            None => {
                // raw content is still worth keeping for the next request
                self.store(&key, &record);
                Err(PipelineError::Failed {
                    kind: ErrorKind::NoContent,
                    message: format!("summary generation failed for {}", key),
                })
            }
        }
    }

    fn store(&self, key: &str, record: &CacheRecord) {
        if let Some(cache) = &self.cache {
            if !cache.put(key, record) {
                warn!("Failed to cache {}", key);
            }
        }
    }

    /// Auto-detect mode: enrich a chat message that mentions a video.
    ///
    /// Returns the message with a digest appended, or `None` when there is
    /// nothing to add. Failures are logged, never shown.
    pub async fn on_message(&self, text: &str) -> Option<String> {
        if !self.settings.auto_detect {
            return None;
        }
        if text.trim_start().starts_with(DIGEST_MARKER) || text.contains(DIGEST_HEADER) {
            debug!("Message already carries a digest, skipping");
            return None;
        }

        let identity = self.source.resolve(text).await?;
        debug!("Detected {} in message", identity);

        let block = match self.digest(&identity, self.settings.enable_summary).await {
            Ok(record) => match record.summary_text() {
                Some(summary) if self.settings.enable_summary => {
                    render_summary_block(&record, summary)
                }
                _ => render_raw_info(&record),
            },
            Err(e) => {
                warn!("Auto-detect for {} failed: {}", identity, e);
                return None;
            }
        };

        Some(format!("{}\n\n{}", text, block))
    }

    /// Command mode: always answers, with an apology when the video can't be digested.
    pub async fn command(&self, text: &str, presentation: Presentation) -> CommandOutcome {
        match self.run_command(text, presentation).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Command failed: {}", e);
                let reason = e.friendly_message(
                    self.settings.max_duration_min,
                    self.settings.max_size_mb,
                );
                CommandOutcome::Failed(format!("{} Failed: {}", DIGEST_MARKER, reason))
            }
        }
    }

    async fn run_command(
        &self,
        text: &str,
        presentation: Presentation,
    ) -> PipelineResult<CommandOutcome> {
        let identity = self.resolve(text).await?;
        info!("Command for {}", identity);

        let with_summary = presentation == Presentation::Summary;
        let record = self.digest(&identity, with_summary).await?;
        let raw = render_raw_info(&record);

        let (reply, digest) = match presentation {
            Presentation::Summary => {
                let summary = record.summary_text().unwrap_or_default();
                let block = render_summary_block(&record, summary);
                (block.clone(), block)
            }
            Presentation::Raw => (raw.clone(), raw),
            Presentation::Reply => {
                let reply = match self.summarizer.personalized_reply(&record).await {
                    Some(reply) => reply,
                    None => {
                        warn!("Persona reply failed for {}, using plain reply", identity);
                        fallback_reply(&record)
                    }
                };
                (reply, raw)
            }
        };

        Ok(CommandOutcome::Replied {
            reply,
            digest,
            record,
        })
    }
}
