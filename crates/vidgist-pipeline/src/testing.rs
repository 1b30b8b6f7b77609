//! In-memory fakes of the capability traits for pipeline tests.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;
use vidgist_core::{
    Capabilities, Error, ErrorKind, Metadata, Result, VideoIdentity, VideoSource, Workspace,
};
use vidgist_media::{Media, MediaError, MediaResult};

pub fn fixture() -> (TempDir, Workspace) {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::open(dir.path().join("temp")).unwrap();
    (dir, workspace)
}

/// Metadata for a single-page video of `duration` seconds.
pub fn metadata(duration: u64) -> Metadata {
    Metadata {
        aid: Some(170001),
        cid: Some(279786),
        bvid: "BV1xx411c7mD".to_string(),
        title: "Cats of the week".to_string(),
        description: "A compilation of cats.".to_string(),
        author: "catfan".to_string(),
        duration: Some(duration),
        total_duration: Some(duration),
        page: 1,
        page_title: "P1".to_string(),
        total_pages: 1,
    }
}

/// Number of files and directories left in the workspace.
pub fn temp_entries(workspace: &Workspace) -> usize {
    [workspace.videos_dir(), workspace.frames_dir(), workspace.audio_dir()]
        .iter()
        .map(|d| std::fs::read_dir(d).map(|r| r.count()).unwrap_or(0))
        .sum()
}

#[derive(Default)]
pub struct FakeSource {
    pub metadata: Option<Metadata>,
    pub metadata_error: Option<ErrorKind>,
    pub subtitle: Option<String>,
    pub download_error: Option<ErrorKind>,
    pub metadata_calls: AtomicUsize,
    pub subtitle_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
}

impl FakeSource {
    pub fn with_metadata(metadata: Metadata) -> Self {
        Self {
            metadata: Some(metadata),
            ..Self::default()
        }
    }
}

#[async_trait]
impl VideoSource for FakeSource {
    async fn resolve(&self, text: &str) -> Option<VideoIdentity> {
        text.split_whitespace()
            .find_map(|word| VideoIdentity::new(word, 1))
    }

    async fn fetch_metadata(&self, identity: &VideoIdentity) -> Result<Metadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = self.metadata_error {
            return Err(Error::classified(kind, format!("metadata for {} failed", identity)));
        }
        self.metadata
            .clone()
            .ok_or_else(|| Error::classified(ErrorKind::NotFound, "no such video"))
    }

    async fn fetch_subtitle(&self, _aid: u64, _cid: u64) -> Result<Option<String>> {
        self.subtitle_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.subtitle.clone())
    }

    async fn fetch_download_url(&self, metadata: &Metadata) -> Result<Option<String>> {
        Ok(Some(format!("https://cdn.example.com/{}.mp4", metadata.bvid)))
    }

    async fn download(&self, _url: &str, _max_bytes: u64, dest: &Path) -> Result<PathBuf> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = self.download_error {
            return Err(Error::classified(kind, "download failed"));
        }
        std::fs::write(dest, b"not really a video")?;
        Ok(dest.to_path_buf())
    }
}

#[derive(Default)]
pub struct FakeCapabilities {
    pub image_answer: Option<String>,
    pub video_answer: Option<String>,
    pub text_answer: Option<String>,
    pub image_calls: AtomicUsize,
    pub video_calls: AtomicUsize,
    pub text_calls: AtomicUsize,
    pub text_prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl Capabilities for FakeCapabilities {
    async fn describe_image(&self, _path: &Path, _prompt: &str) -> Option<String> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.image_answer.clone()
    }

    async fn describe_video(&self, _path: &Path, _prompt: &str) -> Option<String> {
        self.video_calls.fetch_add(1, Ordering::SeqCst);
        self.video_answer.clone()
    }

    async fn generate_text(&self, prompt: &str) -> Option<String> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.text_prompts.lock().unwrap().push(prompt.to_string());
        self.text_answer.clone()
    }
}

pub struct FakeMedia {
    pub workspace: Workspace,
    pub fail_frames: bool,
    pub transcript: Option<String>,
    pub probed_duration: Option<f64>,
    pub equidistant_calls: Mutex<Vec<(f64, usize)>>,
    pub cadence_calls: Mutex<Vec<(u64, usize)>>,
}

impl FakeMedia {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            fail_frames: false,
            transcript: None,
            probed_duration: None,
            equidistant_calls: Mutex::new(Vec::new()),
            cadence_calls: Mutex::new(Vec::new()),
        }
    }

    fn write_frames(&self, video: &Path, count: usize) -> MediaResult<Vec<PathBuf>> {
        if self.fail_frames {
            return Err(MediaError::NoFrames(video.to_path_buf()));
        }
        let dir = self.workspace.new_frames_dir()?;
        (1..=count)
            .map(|i| -> MediaResult<PathBuf> {
                let frame = dir.join(format!("frame_{:03}.jpg", i));
                std::fs::write(&frame, b"jpeg")?;
                Ok(frame)
            })
            .collect()
    }
}

impl Media for FakeMedia {
    fn get_duration(&self, _video: &Path) -> Option<f64> {
        self.probed_duration
    }

    fn extract_frames_equidistant(
        &self,
        video: &Path,
        duration: f64,
        count: usize,
    ) -> MediaResult<Vec<PathBuf>> {
        self.equidistant_calls.lock().unwrap().push((duration, count));
        self.write_frames(video, count)
    }

    fn extract_frames(
        &self,
        video: &Path,
        interval_sec: u64,
        max_frames: usize,
    ) -> MediaResult<Vec<PathBuf>> {
        self.cadence_calls.lock().unwrap().push((interval_sec, max_frames));
        self.write_frames(video, max_frames.min(3))
    }

    fn extract_audio(&self, _video: &Path) -> MediaResult<PathBuf> {
        let audio = self.workspace.new_audio_path();
        std::fs::write(&audio, b"RIFF")?;
        Ok(audio)
    }

    fn transcribe(&self, audio: &Path) -> MediaResult<String> {
        self.transcript
            .clone()
            .ok_or_else(|| MediaError::TranscriptionError(format!("nothing heard in {:?}", audio)))
    }
}
