//! The outcome of processing one video page.

use std::path::PathBuf;
use tracing::{debug, warn};
use vidgist_core::{CacheRecord, ErrorKind, Metadata, RawInfo, VisualMethod, Workspace};

/// Join subtitle and speech transcript text under section labels, subtitles first.
pub fn merge_text(subtitle: Option<&str>, asr: Option<&str>) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(text) = subtitle.filter(|t| !t.trim().is_empty()) {
        parts.push(format!("[Subtitles]\n{}", text));
    }
    if let Some(text) = asr.filter(|t| !t.trim().is_empty()) {
        parts.push(format!("[Speech transcript]\n{}", text));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

/// Everything the processor learned about a video, plus the temp files it made.
///
/// The temp files belong to the result. [`ProcessResult::cleanup`] deletes them
/// through the workspace's guarded deletion; when the retention age is zero
/// the result also cleans up on drop, otherwise the sweeper collects them.
#[derive(Debug)]
pub struct ProcessResult {
    pub success: bool,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub video_id: String,
    pub metadata: Metadata,

    pub frame_paths: Vec<PathBuf>,
    pub subtitle_text: Option<String>,
    pub asr_text: Option<String>,
    pub visual_analysis: Option<String>,
    pub visual_method: VisualMethod,

    pub video_path: Option<PathBuf>,
    pub frames_dir: Option<PathBuf>,
    pub audio_path: Option<PathBuf>,

    workspace: Workspace,
    cleanup_on_drop: bool,
}

impl ProcessResult {
    pub(crate) fn new(video_id: impl Into<String>, workspace: Workspace, cleanup_on_drop: bool) -> Self {
        Self {
            success: false,
            error: None,
            error_kind: None,
            video_id: video_id.into(),
            metadata: Metadata::default(),
            frame_paths: Vec::new(),
            subtitle_text: None,
            asr_text: None,
            visual_analysis: None,
            visual_method: VisualMethod::None,
            video_path: None,
            frames_dir: None,
            audio_path: None,
            workspace,
            cleanup_on_drop,
        }
    }

    pub(crate) fn fail(mut self, kind: ErrorKind, message: impl Into<String>) -> Self {
        self.success = false;
        self.error_kind = Some(kind);
        self.error = Some(message.into());
        self
    }

    /// Subtitle and speech text merged, subtitles first.
    pub fn text_content(&self) -> Option<String> {
        merge_text(self.subtitle_text.as_deref(), self.asr_text.as_deref())
    }

    /// A summary-less cache record for this result.
    pub fn to_record(&self, frame_descriptions: Vec<String>) -> CacheRecord {
        let raw_info = RawInfo {
            subtitle_text: self.subtitle_text.clone().unwrap_or_default(),
            asr_text: self.asr_text.clone().unwrap_or_default(),
            frame_descriptions,
            visual_analysis: self.visual_analysis.clone().unwrap_or_default(),
            visual_method: self.visual_method,
        };
        CacheRecord::new(self.video_id.clone(), &self.metadata, raw_info)
    }

    /// Delete every temp file and directory this result owns.
    ///
    /// Paths are taken out of the result, so a second call does nothing.
    pub fn cleanup(&mut self) {
        for path in [self.video_path.take(), self.audio_path.take()]
            .into_iter()
            .flatten()
        {
            let (deleted, reason) = self.workspace.safe_delete_file(&path);
            if !deleted && !reason.contains("does not exist") {
                warn!("Temp file {:?} not deleted: {}", path, reason);
            }
        }

        if let Some(dir) = self.frames_dir.take() {
            let (deleted, reason) = self.workspace.safe_delete_dir(&dir);
            if !deleted && !reason.contains("does not exist") {
                warn!("Frame directory {:?} not deleted: {}", dir, reason);
            }
        }

        if !self.frame_paths.is_empty() {
            debug!("Released {} frames of {}", self.frame_paths.len(), self.video_id);
            self.frame_paths.clear();
        }
    }
}

impl Drop for ProcessResult {
    fn drop(&mut self) {
        if self.cleanup_on_drop {
            self.cleanup();
        }
    }
}
