//! The degradation-aware video processor.
//!
//! Only the metadata fetch and the duration gate can fail a request. Every
//! later step (subtitles, download, visual analysis, speech recognition) is
//! best-effort: a failure is logged and the result carries less content.

use crate::error::{PipelineError, PipelineResult};
use crate::result::ProcessResult;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vidgist_config::{AnalysisMode, Config};
use vidgist_core::{
    retry, Capabilities, Classify, ErrorKind, Metadata, RetryPolicy, VideoIdentity, VideoSource,
    VisualMethod, Workspace,
};
use vidgist_media::{Media, MediaError, MediaResult};

/// Limits and switches the processor works with.
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub max_duration_min: u64,
    pub max_size_mb: u64,
    pub retry: RetryPolicy,
    /// Subtitles are only requested when a login token is configured.
    pub has_auth_token: bool,
    pub enable_asr: bool,
    pub mode: AnalysisMode,
    pub visual_max_duration_min: u64,
    pub frame_interval_sec: u64,
    pub max_extract_frames: usize,
    /// Zero deletes temp files as soon as they are no longer needed.
    pub temp_file_max_age_min: u64,
    pub summary_min_chars: usize,
    pub summary_max_chars: usize,
}

impl ProcessorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_duration_min: config.video.max_duration_min,
            max_size_mb: config.video.max_size_mb,
            retry: RetryPolicy::from_secs(
                config.video.retry_attempts,
                config.video.retry_interval_sec,
            ),
            has_auth_token: config.video.auth_token().is_some(),
            enable_asr: config.video.enable_asr,
            mode: config.analysis.mode,
            visual_max_duration_min: config.analysis.visual_max_duration_min,
            frame_interval_sec: config.analysis.frame_interval_sec,
            max_extract_frames: config.analysis.max_extract_frames,
            temp_file_max_age_min: config.general.temp_file_max_age_min,
            summary_min_chars: config.summary.min_chars,
            summary_max_chars: config.summary.max_chars,
        }
    }

    /// Whether a page of this length may be processed at all.
    ///
    /// Minutes are floored, so a 30 minute limit still admits 30:59.
    /// Unknown durations pass.
    pub fn within_duration_limit(&self, metadata: &Metadata) -> bool {
        metadata
            .duration_minutes()
            .map_or(true, |minutes| minutes < self.max_duration_min + 1)
    }

    /// Whether a page of this length gets visual analysis.
    pub fn visual_eligible(&self, metadata: &Metadata) -> bool {
        if self.mode == AnalysisMode::None || self.visual_max_duration_min == 0 {
            return false;
        }
        metadata
            .duration_minutes()
            .map_or(true, |minutes| minutes < self.visual_max_duration_min + 1)
    }

    /// How many evenly spaced frames to take from a video of `duration` seconds.
    pub fn frame_count(&self, duration: u64) -> usize {
        let interval = self.frame_interval_sec.max(1);
        let wanted = duration.div_ceil(interval).max(1) as usize;
        wanted.min(self.max_extract_frames.max(1))
    }

    fn cleanup_immediately(&self) -> bool {
        self.temp_file_max_age_min == 0
    }
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// The prompt sent with a whole video file.
pub(crate) fn whole_video_prompt(min_chars: usize, max_chars: usize) -> String {
    format!(
        "Describe the content of this video in detail ({}-{} words), covering:\n\
         1. The main scenes and setting\n\
         2. The people and objects that appear and their features (name characters from known works)\n\
         3. The main events and actions, in chronological order\n\
         4. The overall mood and style\n\
         5. Any on-screen text, signs or other key information such as captions or dialogue\n\n\
         Describe only what actually appears in the video; do not guess or invent.\n\
         If something cannot be determined from the video, say so explicitly.\n\
         Keep the description concise and focus on the key information.",
        min_chars, max_chars
    )
}

/// Turns a video identity into a [`ProcessResult`].
pub struct Processor {
    source: Arc<dyn VideoSource>,
    capabilities: Arc<dyn Capabilities>,
    media: Arc<dyn Media>,
    workspace: Workspace,
    settings: ProcessorSettings,
}

impl Processor {
    pub fn new(
        source: Arc<dyn VideoSource>,
        capabilities: Arc<dyn Capabilities>,
        media: Arc<dyn Media>,
        workspace: Workspace,
        settings: ProcessorSettings,
    ) -> Self {
        Self {
            source,
            capabilities,
            media,
            workspace,
            settings,
        }
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Gather everything available about one video page.
    ///
    /// Returns `Err` for non-retryable failures of the metadata fetch, such as
    /// a removed or restricted video. Exhausted retries and the duration gate
    /// come back as a result with `success == false`; enrichment failures only
    /// reduce its content.
    pub async fn process(&self, identity: &VideoIdentity) -> PipelineResult<ProcessResult> {
        let mut result = ProcessResult::new(
            identity.id.clone(),
            self.workspace.clone(),
            self.settings.cleanup_immediately(),
        );

        debug!("Processing {}", identity);

        let policy = self.settings.retry;
        let metadata = match retry(&policy, "fetch metadata", || {
            self.source.fetch_metadata(identity)
        })
        .await
        {
            Ok(metadata) => metadata,
            Err(e) => {
                let kind = e.kind();
                if !kind.is_retryable() {
                    warn!("Metadata for {} unavailable ({}): {}", identity, kind, e);
                    return Err(PipelineError::Terminal {
                        kind,
                        message: e.to_string(),
                    });
                }
                warn!("Failed to fetch metadata for {}: {}", identity, e);
                return Ok(result.fail(kind, format!("failed to fetch video info: {}", e)));
            }
        };
        result.metadata = metadata;

        if !self.settings.within_duration_limit(&result.metadata) {
            let minutes = result.metadata.duration_minutes().unwrap_or_default();
            let message = format!(
                "video is {} minutes long, over the {} minute limit",
                minutes, self.settings.max_duration_min
            );
            warn!("Skipping {}: {}", identity, message);
            return Ok(result.fail(ErrorKind::TooLong, message));
        }

        result.subtitle_text = self.fetch_subtitle(&result.metadata).await;

        let visual = self.settings.visual_eligible(&result.metadata);
        if visual || self.settings.enable_asr {
            result.video_path = self.download(&result.metadata).await;
            if result.video_path.is_none() {
                if result.subtitle_text.is_some() {
                    info!("Download failed for {}, continuing with subtitles", identity);
                } else {
                    info!("Download failed for {}, continuing with metadata only", identity);
                }
            }
        } else {
            debug!("Skipping download of {}: no visual analysis or ASR needed", identity);
        }

        match (visual, result.video_path.clone()) {
            (true, Some(video)) => self.analyze_visual(&mut result, &video).await,
            _ => result.visual_method = VisualMethod::None,
        }

        if self.settings.enable_asr {
            if let Some(video) = result.video_path.clone() {
                self.transcribe(&mut result, &video).await;
            }
        }

        result.success = true;
        debug!(
            "Processed {}: method={}, frames={}, subtitle={}, asr={}",
            identity,
            result.visual_method,
            result.frame_paths.len(),
            result.subtitle_text.is_some(),
            result.asr_text.is_some()
        );
        Ok(result)
    }

    async fn fetch_subtitle(&self, metadata: &Metadata) -> Option<String> {
        let (Some(aid), Some(cid)) = (metadata.aid, metadata.cid) else {
            debug!("Skipping subtitles: aid/cid unknown");
            return None;
        };
        if !self.settings.has_auth_token {
            debug!("Skipping subtitles: no login token configured");
            return None;
        }

        let policy = self.settings.retry;
        match retry(&policy, "fetch subtitle", || {
            self.source.fetch_subtitle(aid, cid)
        })
        .await
        {
            Ok(Some(text)) if !text.trim().is_empty() => {
                debug!("Subtitle fetched: {} chars", text.chars().count());
                Some(text)
            }
            Ok(_) => {
                debug!("No subtitle available for aid {}", aid);
                None
            }
            Err(e) => {
                warn!("Failed to fetch subtitle for aid {}: {}", aid, e);
                None
            }
        }
    }

    /// Download the page into a fresh workspace file; `None` on any failure.
    async fn download(&self, metadata: &Metadata) -> Option<PathBuf> {
        let policy = self.settings.retry;

        let url = match retry(&policy, "fetch download url", || {
            self.source.fetch_download_url(metadata)
        })
        .await
        {
            Ok(Some(url)) => url,
            Ok(None) => {
                warn!("No download URL for {}", metadata.bvid);
                return None;
            }
            Err(e) => {
                warn!("Failed to fetch download URL for {}: {}", metadata.bvid, e);
                return None;
            }
        };

        if let Err(e) = self.workspace.ensure_dirs() {
            warn!("Temp workspace unavailable: {}", e);
            return None;
        }

        let dest = self.workspace.new_video_path();
        let max_bytes = self.settings.max_size_mb * 1024 * 1024;
        match retry(&policy, "download video", || {
            self.source.download(&url, max_bytes, &dest)
        })
        .await
        {
            Ok(path) => {
                debug!("Downloaded {} to {:?}", metadata.bvid, path);
                Some(path)
            }
            Err(e) => {
                warn!("Failed to download {} ({}): {}", metadata.bvid, e.kind(), e);
                None
            }
        }
    }

    async fn analyze_visual(&self, result: &mut ProcessResult, video: &Path) {
        if self.settings.mode == AnalysisMode::Video {
            let prompt = whole_video_prompt(
                self.settings.summary_min_chars,
                self.settings.summary_max_chars,
            );
            match self.capabilities.describe_video(video, &prompt).await {
                Some(analysis) if !analysis.trim().is_empty() => {
                    result.visual_analysis = Some(analysis);
                    result.visual_method = VisualMethod::WholeVideo;
                    return;
                }
                _ => warn!("Whole-video analysis failed, falling back to frames"),
            }
        }

        let max_frames = self.settings.max_extract_frames.max(1);
        let video = video.to_path_buf();
        let duration = match result.metadata.duration {
            Some(duration) => Some(duration),
            None => {
                let probe = video.clone();
                let probed = self
                    .blocking(move |media| Ok(media.get_duration(&probe)))
                    .await
                    .ok()
                    .flatten()
                    .filter(|d| d.is_finite() && *d >= 1.0);
                debug!("Probed duration: {:?}", probed);
                probed.map(|d| d as u64)
            }
        };
        let frames = match duration {
            Some(duration) => {
                let count = self.settings.frame_count(duration);
                self.blocking(move |media| {
                    media.extract_frames_equidistant(&video, duration as f64, count)
                })
                .await
            }
            None => {
                let interval = self.settings.frame_interval_sec.max(1);
                self.blocking(move |media| media.extract_frames(&video, interval, max_frames))
                    .await
            }
        };

        match frames {
            Ok(frames) if !frames.is_empty() => {
                result.frames_dir = frames[0].parent().map(Path::to_path_buf);
                result.visual_method = match self.settings.mode {
                    AnalysisMode::Builtin => VisualMethod::BuiltinFrameBased,
                    _ => VisualMethod::FrameBased,
                };
                debug!("Extracted {} frames", frames.len());
                result.frame_paths = frames;
            }
            Ok(_) => {
                warn!("Frame extraction produced no frames");
                result.visual_method = VisualMethod::None;
            }
            Err(e) => {
                warn!("Frame extraction failed: {}", e);
                result.visual_method = VisualMethod::None;
            }
        }
    }

    async fn transcribe(&self, result: &mut ProcessResult, video: &Path) {
        let video = video.to_path_buf();
        let audio = match self.blocking(move |media| media.extract_audio(&video)).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!("Audio extraction failed: {}", e);
                return;
            }
        };

        let input = audio.clone();
        match self.blocking(move |media| media.transcribe(&input)).await {
            Ok(text) if !text.trim().is_empty() => {
                debug!("Transcribed {} chars", text.chars().count());
                result.asr_text = Some(text);
            }
            Ok(_) => debug!("Transcription returned no text"),
            Err(e) => warn!("Transcription failed: {}", e),
        }

        if self.settings.cleanup_immediately() {
            let (deleted, reason) = self.workspace.safe_delete_file(&audio);
            if !deleted && !reason.contains("does not exist") {
                warn!("Temp audio {:?} not deleted: {}", audio, reason);
            }
        } else {
            result.audio_path = Some(audio);
        }
    }

    /// Run a media call on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> MediaResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Media) -> MediaResult<T> + Send + 'static,
    {
        let media = Arc::clone(&self.media);
        tokio::task::spawn_blocking(move || op(media.as_ref()))
            .await
            .unwrap_or_else(|e| Err(MediaError::Io(std::io::Error::other(e.to_string()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture, metadata, FakeCapabilities, FakeMedia, FakeSource};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn settings() -> ProcessorSettings {
        ProcessorSettings {
            retry: RetryPolicy::new(3, Duration::ZERO),
            has_auth_token: true,
            ..ProcessorSettings::default()
        }
    }

    fn processor(
        source: &Arc<FakeSource>,
        capabilities: &Arc<FakeCapabilities>,
        media: &Arc<FakeMedia>,
        workspace: &Workspace,
        settings: ProcessorSettings,
    ) -> Processor {
        Processor::new(
            source.clone(),
            capabilities.clone(),
            media.clone(),
            workspace.clone(),
            settings,
        )
    }

    fn identity() -> VideoIdentity {
        VideoIdentity::new("BV1xx411c7mD", 1).unwrap()
    }

    #[test]
    fn test_duration_gate_floors_minutes() {
        let settings = settings();
        assert!(settings.within_duration_limit(&metadata(30 * 60 + 59)));
        assert!(!settings.within_duration_limit(&metadata(31 * 60)));
        assert!(settings.within_duration_limit(&Metadata::default()));
    }

    #[test]
    fn test_visual_eligibility() {
        let mut settings = settings();
        assert!(settings.visual_eligible(&metadata(650)));
        assert!(!settings.visual_eligible(&metadata(11 * 60)));
        assert!(settings.visual_eligible(&Metadata::default()));

        settings.mode = AnalysisMode::None;
        assert!(!settings.visual_eligible(&metadata(60)));

        settings.mode = AnalysisMode::Default;
        settings.visual_max_duration_min = 0;
        assert!(!settings.visual_eligible(&metadata(60)));
    }

    #[test]
    fn test_frame_count() {
        let settings = settings();
        assert_eq!(settings.frame_count(650), 10);
        assert_eq!(settings.frame_count(13), 3);
        assert_eq!(settings.frame_count(0), 1);
    }

    #[tokio::test]
    async fn test_download_failure_degrades_to_subtitles() {
        let (_dir, workspace) = fixture();
        let source = Arc::new(FakeSource {
            subtitle: Some("hello from the subtitles".to_string()),
            download_error: Some(ErrorKind::NetworkError),
            ..FakeSource::with_metadata(metadata(650))
        });
        let capabilities = Arc::new(FakeCapabilities::default());
        let media = Arc::new(FakeMedia::new(workspace.clone()));

        let result = processor(&source, &capabilities, &media, &workspace, settings())
            .process(&identity())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.visual_method, VisualMethod::None);
        assert_eq!(result.subtitle_text.as_deref(), Some("hello from the subtitles"));
        assert!(result.frame_paths.is_empty());
        assert!(result.video_path.is_none());
        assert_eq!(source.download_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_duration_boundary() {
        let (_dir, workspace) = fixture();
        let capabilities = Arc::new(FakeCapabilities::default());
        let media = Arc::new(FakeMedia::new(workspace.clone()));

        let accepted = Arc::new(FakeSource::with_metadata(metadata(30 * 60 + 59)));
        let result = processor(&accepted, &capabilities, &media, &workspace, settings())
            .process(&identity())
            .await
            .unwrap();
        assert!(result.success);

        let rejected = Arc::new(FakeSource::with_metadata(metadata(31 * 60)));
        let result = processor(&rejected, &capabilities, &media, &workspace, settings())
            .process(&identity())
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::TooLong));
        assert_eq!(rejected.download_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_not_found_is_terminal_and_leaves_nothing() {
        let (_dir, workspace) = fixture();
        let source = Arc::new(FakeSource {
            metadata_error: Some(ErrorKind::NotFound),
            ..FakeSource::default()
        });
        let capabilities = Arc::new(FakeCapabilities::default());
        let media = Arc::new(FakeMedia::new(workspace.clone()));

        let err = processor(&source, &capabilities, &media, &workspace, settings())
            .process(&identity())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(source.metadata_calls.load(Ordering::SeqCst), 1);
        assert_eq!(crate::testing::temp_entries(&workspace), 0);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_softly() {
        let (_dir, workspace) = fixture();
        let source = Arc::new(FakeSource {
            metadata_error: Some(ErrorKind::NetworkError),
            ..FakeSource::default()
        });
        let capabilities = Arc::new(FakeCapabilities::default());
        let media = Arc::new(FakeMedia::new(workspace.clone()));

        let result = processor(&source, &capabilities, &media, &workspace, settings())
            .process(&identity())
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::NetworkError));
        assert_eq!(source.metadata_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_record_keeps_id_and_page_apart() {
        let (_dir, workspace) = fixture();
        let source = Arc::new(FakeSource::with_metadata(Metadata {
            page: 2,
            total_pages: 2,
            ..metadata(120)
        }));
        let capabilities = Arc::new(FakeCapabilities::default());
        let media = Arc::new(FakeMedia::new(workspace.clone()));

        let identity = VideoIdentity::new("BV1xx411c7mD", 2).unwrap();
        let result = processor(&source, &capabilities, &media, &workspace, settings())
            .process(&identity)
            .await
            .unwrap();

        assert_eq!(result.video_id, "BV1xx411c7mD");
        let record = result.to_record(Vec::new());
        assert_eq!(record.video_id, "BV1xx411c7mD");
        assert_eq!(record.page, 2);
    }

    #[tokio::test]
    async fn test_unclassified_metadata_failure_is_terminal() {
        let (_dir, workspace) = fixture();
        let source = Arc::new(FakeSource {
            metadata_error: Some(ErrorKind::Unknown),
            ..FakeSource::default()
        });
        let capabilities = Arc::new(FakeCapabilities::default());
        let media = Arc::new(FakeMedia::new(workspace.clone()));

        let err = processor(&source, &capabilities, &media, &workspace, settings())
            .process(&identity())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Terminal {
                kind: ErrorKind::Unknown,
                ..
            }
        ));
        assert_eq!(source.metadata_calls.load(Ordering::SeqCst), 1);
        assert_eq!(crate::testing::temp_entries(&workspace), 0);
    }

    #[tokio::test]
    async fn test_frame_based_analysis() {
        let (_dir, workspace) = fixture();
        let source = Arc::new(FakeSource::with_metadata(metadata(650)));
        let capabilities = Arc::new(FakeCapabilities::default());
        let media = Arc::new(FakeMedia::new(workspace.clone()));

        let result = processor(&source, &capabilities, &media, &workspace, settings())
            .process(&identity())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.visual_method, VisualMethod::FrameBased);
        assert_eq!(result.frame_paths.len(), 10);
        assert!(result.visual_analysis.is_none());
        assert_eq!(
            result.frames_dir.as_deref(),
            result.frame_paths[0].parent()
        );
        assert_eq!(media.equidistant_calls.lock().unwrap().as_slice(), &[(650.0, 10)]);
    }

    #[tokio::test]
    async fn test_unknown_duration_uses_cadence() {
        let (_dir, workspace) = fixture();
        let source = Arc::new(FakeSource::with_metadata(Metadata {
            duration: None,
            ..metadata(0)
        }));
        let capabilities = Arc::new(FakeCapabilities::default());
        let media = Arc::new(FakeMedia::new(workspace.clone()));
        let mut settings = settings();
        settings.mode = AnalysisMode::Builtin;

        let result = processor(&source, &capabilities, &media, &workspace, settings)
            .process(&identity())
            .await
            .unwrap();

        assert_eq!(result.visual_method, VisualMethod::BuiltinFrameBased);
        assert_eq!(media.cadence_calls.lock().unwrap().as_slice(), &[(6, 10)]);
    }

    #[tokio::test]
    async fn test_unknown_duration_is_probed_from_download() {
        let (_dir, workspace) = fixture();
        let source = Arc::new(FakeSource::with_metadata(Metadata {
            duration: None,
            ..metadata(0)
        }));
        let capabilities = Arc::new(FakeCapabilities::default());
        let media = Arc::new(FakeMedia {
            probed_duration: Some(650.4),
            ..FakeMedia::new(workspace.clone())
        });

        let result = processor(&source, &capabilities, &media, &workspace, settings())
            .process(&identity())
            .await
            .unwrap();

        assert_eq!(result.frame_paths.len(), 10);
        assert_eq!(media.equidistant_calls.lock().unwrap().as_slice(), &[(650.0, 10)]);
        assert!(media.cadence_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_whole_video_with_frame_fallback() {
        let (_dir, workspace) = fixture();
        let source = Arc::new(FakeSource::with_metadata(metadata(120)));
        let media = Arc::new(FakeMedia::new(workspace.clone()));
        let mut settings = settings();
        settings.mode = AnalysisMode::Video;

        let capabilities = Arc::new(FakeCapabilities {
            video_answer: Some("A cat chases a laser pointer.".to_string()),
            ..FakeCapabilities::default()
        });
        let result = processor(&source, &capabilities, &media, &workspace, settings.clone())
            .process(&identity())
            .await
            .unwrap();
        assert_eq!(result.visual_method, VisualMethod::WholeVideo);
        assert!(result.frame_paths.is_empty());
        assert!(media.equidistant_calls.lock().unwrap().is_empty());

        let failing = Arc::new(FakeCapabilities::default());
        let result = processor(&source, &failing, &media, &workspace, settings)
            .process(&identity())
            .await
            .unwrap();
        assert_eq!(failing.video_calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.visual_method, VisualMethod::FrameBased);
        assert!(result.visual_analysis.is_none());
    }

    #[tokio::test]
    async fn test_frame_failure_degrades() {
        let (_dir, workspace) = fixture();
        let source = Arc::new(FakeSource::with_metadata(metadata(120)));
        let capabilities = Arc::new(FakeCapabilities::default());
        let media = Arc::new(FakeMedia {
            fail_frames: true,
            ..FakeMedia::new(workspace.clone())
        });

        let result = processor(&source, &capabilities, &media, &workspace, settings())
            .process(&identity())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.visual_method, VisualMethod::None);
        assert!(result.video_path.is_some());
    }

    #[tokio::test]
    async fn test_long_video_skips_download_without_asr() {
        let (_dir, workspace) = fixture();
        let source = Arc::new(FakeSource::with_metadata(metadata(20 * 60)));
        let capabilities = Arc::new(FakeCapabilities::default());
        let media = Arc::new(FakeMedia::new(workspace.clone()));

        let result = processor(&source, &capabilities, &media, &workspace, settings())
            .process(&identity())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.visual_method, VisualMethod::None);
        assert_eq!(source.download_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_subtitles_need_a_token() {
        let (_dir, workspace) = fixture();
        let source = Arc::new(FakeSource {
            subtitle: Some("subs".to_string()),
            ..FakeSource::with_metadata(metadata(20 * 60))
        });
        let capabilities = Arc::new(FakeCapabilities::default());
        let media = Arc::new(FakeMedia::new(workspace.clone()));
        let mut settings = settings();
        settings.has_auth_token = false;

        let result = processor(&source, &capabilities, &media, &workspace, settings)
            .process(&identity())
            .await
            .unwrap();

        assert!(result.subtitle_text.is_none());
        assert_eq!(source.subtitle_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_asr_audio_retention() {
        let (_dir, workspace) = fixture();
        let source = Arc::new(FakeSource::with_metadata(metadata(20 * 60)));
        let capabilities = Arc::new(FakeCapabilities::default());
        let media = Arc::new(FakeMedia {
            transcript: Some("spoken words".to_string()),
            ..FakeMedia::new(workspace.clone())
        });

        let mut settings = settings();
        settings.enable_asr = true;
        settings.temp_file_max_age_min = 0;
        let mut result = processor(&source, &capabilities, &media, &workspace, settings.clone())
            .process(&identity())
            .await
            .unwrap();
        assert_eq!(result.asr_text.as_deref(), Some("spoken words"));
        assert!(result.audio_path.is_none());
        result.cleanup();
        assert_eq!(crate::testing::temp_entries(&workspace), 0);

        settings.temp_file_max_age_min = 60;
        let result = processor(&source, &capabilities, &media, &workspace, settings)
            .process(&identity())
            .await
            .unwrap();
        let audio = result.audio_path.clone().unwrap();
        drop(result);
        assert!(audio.exists());
    }

    #[tokio::test]
    async fn test_metadata_is_stable_across_runs() {
        let (_dir, workspace) = fixture();
        let source = Arc::new(FakeSource::with_metadata(metadata(20 * 60)));
        let capabilities = Arc::new(FakeCapabilities::default());
        let media = Arc::new(FakeMedia::new(workspace.clone()));
        let processor = processor(&source, &capabilities, &media, &workspace, settings());

        let first = processor.process(&identity()).await.unwrap();
        let second = processor.process(&identity()).await.unwrap();
        assert_eq!(first.metadata, second.metadata);
        assert_eq!(first.video_id, second.video_id);
    }
}
