//! Workspace-aware media operations.

use crate::error::{MediaError, MediaResult};
use crate::ffmpeg;
use crate::transcribe::{segments_to_text, transcribe_audio};
use std::path::{Path, PathBuf};
use tracing::warn;
use vidgist_core::Workspace;

/// Media operations the pipeline needs.
///
/// All methods block on external processes; async callers should run them
/// on a blocking thread.
pub trait Media: Send + Sync {
    /// Container duration in seconds, `None` if it can't be probed.
    fn get_duration(&self, video: &Path) -> Option<f64>;

    /// `count` evenly spaced frames in a fresh frame directory.
    fn extract_frames_equidistant(
        &self,
        video: &Path,
        duration: f64,
        count: usize,
    ) -> MediaResult<Vec<PathBuf>>;

    /// One frame every `interval_sec` from the start, at most `max_frames`.
    fn extract_frames(
        &self,
        video: &Path,
        interval_sec: u64,
        max_frames: usize,
    ) -> MediaResult<Vec<PathBuf>>;

    /// Mono 16 kHz WAV in a fresh audio file.
    fn extract_audio(&self, video: &Path) -> MediaResult<PathBuf>;

    /// Speech-to-text of an audio file.
    fn transcribe(&self, audio: &Path) -> MediaResult<String>;
}

/// [`Media`] backed by the ffmpeg, ffprobe and whisper CLIs.
#[derive(Debug, Clone)]
pub struct MediaToolkit {
    workspace: Workspace,
    whisper_model: String,
    language: Option<String>,
}

impl MediaToolkit {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            whisper_model: "base".to_string(),
            language: None,
        }
    }

    /// Set the Whisper model and spoken language.
    pub fn with_whisper(mut self, model: impl Into<String>, language: Option<String>) -> Self {
        self.whisper_model = model.into();
        self.language = language;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Run `extract` against a fresh frame directory, removing the directory
    /// again if nothing came out of it.
    fn in_frames_dir<F>(&self, video: &Path, extract: F) -> MediaResult<Vec<PathBuf>>
    where
        F: FnOnce(&Path) -> MediaResult<Vec<PathBuf>>,
    {
        let dir = self.workspace.new_frames_dir()?;
        let result = extract(&dir);

        match result {
            Ok(frames) if !frames.is_empty() => Ok(frames),
            other => {
                let (deleted, reason) = self.workspace.safe_delete_dir(&dir);
                if !deleted {
                    warn!("Could not remove empty frame directory {:?}: {}", dir, reason);
                }
                match other {
                    Err(e) => Err(e),
                    Ok(_) => Err(MediaError::NoFrames(video.to_path_buf())),
                }
            }
        }
    }
}

impl Media for MediaToolkit {
    fn get_duration(&self, video: &Path) -> Option<f64> {
        match ffmpeg::probe_duration(video) {
            Ok(duration) => Some(duration),
            Err(e) => {
                warn!("Could not probe duration of {:?}: {}", video, e);
                None
            }
        }
    }

    fn extract_frames_equidistant(
        &self,
        video: &Path,
        duration: f64,
        count: usize,
    ) -> MediaResult<Vec<PathBuf>> {
        self.in_frames_dir(video, |dir| {
            ffmpeg::extract_frames_equidistant(video, dir, duration, count)
        })
    }

    fn extract_frames(
        &self,
        video: &Path,
        interval_sec: u64,
        max_frames: usize,
    ) -> MediaResult<Vec<PathBuf>> {
        self.in_frames_dir(video, |dir| {
            ffmpeg::extract_frames_at_interval(video, dir, interval_sec, max_frames)
        })
    }

    fn extract_audio(&self, video: &Path) -> MediaResult<PathBuf> {
        std::fs::create_dir_all(self.workspace.audio_dir())?;
        ffmpeg::extract_audio(video, &self.workspace.new_audio_path())
    }

    fn transcribe(&self, audio: &Path) -> MediaResult<String> {
        let output_dir = tempfile::tempdir()?;
        let segments = transcribe_audio(
            audio,
            &self.whisper_model,
            self.language.as_deref(),
            output_dir.path(),
        )?;

        let text = segments_to_text(&segments);
        if text.trim().is_empty() {
            return Err(MediaError::TranscriptionError(
                "Whisper produced no text".to_string(),
            ));
        }
        Ok(text)
    }
}
