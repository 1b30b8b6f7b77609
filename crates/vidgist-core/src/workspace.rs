//! Temp-file workspace and guarded deletion.
//!
//! Every downloaded video, frame directory and audio track lives under one
//! temp root. Nothing is deleted unless its name carries one of our prefixes
//! and its resolved path is inside that root.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

pub const VIDEO_PREFIX: &str = "bili_video_";
pub const AUDIO_PREFIX: &str = "bili_audio_";
pub const FRAMES_PREFIX: &str = "bili_frames_";

const FILE_PREFIXES: &[&str] = &[VIDEO_PREFIX, AUDIO_PREFIX];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Counts from one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub files_deleted: usize,
    pub dirs_deleted: usize,
    pub errors: usize,
}

/// Handle to the temp root and its `videos/`, `frames/` and `audio/` subdirectories.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the workspace and its subdirectories.
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let workspace = Self::new(root);
        workspace.ensure_dirs()?;
        Ok(workspace)
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(self.videos_dir())?;
        fs::create_dir_all(self.frames_dir())?;
        fs::create_dir_all(self.audio_dir())?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.root.join("videos")
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.root.join("frames")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join("audio")
    }

    /// Fresh path for a downloaded video. The file is not created.
    pub fn new_video_path(&self) -> PathBuf {
        self.videos_dir()
            .join(format!("{}{}.mp4", VIDEO_PREFIX, short_id()))
    }

    /// Fresh path for an extracted audio track. The file is not created.
    pub fn new_audio_path(&self) -> PathBuf {
        self.audio_dir()
            .join(format!("{}{}.wav", AUDIO_PREFIX, short_id()))
    }

    /// Create a fresh, empty frame directory.
    pub fn new_frames_dir(&self) -> std::io::Result<PathBuf> {
        let dir = self
            .frames_dir()
            .join(format!("{}{}", FRAMES_PREFIX, short_id()));
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Delete a file or frame directory, whichever `path` is.
    pub fn delete(&self, path: &Path) -> (bool, String) {
        if path.is_dir() {
            self.safe_delete_dir(path)
        } else {
            self.safe_delete_file(path)
        }
    }

    /// Delete a video or audio file after the safety checks pass.
    ///
    /// Returns whether the file was deleted and why not if it wasn't.
    pub fn safe_delete_file(&self, path: &Path) -> (bool, String) {
        if let Err(reason) = self.check_file(path) {
            warn!("Refusing to delete {:?}: {}", path, reason);
            return (false, reason);
        }

        match fs::remove_file(path) {
            Ok(()) => {
                debug!("Deleted temp file {:?}", path);
                (true, "deleted".to_string())
            }
            Err(e) => (false, format!("delete failed: {}", e)),
        }
    }

    /// Delete a frame directory after the safety checks pass.
    ///
    /// The directory must hold nothing but image files.
    pub fn safe_delete_dir(&self, path: &Path) -> (bool, String) {
        if let Err(reason) = self.check_dir(path) {
            warn!("Refusing to delete {:?}: {}", path, reason);
            return (false, reason);
        }

        match fs::remove_dir_all(path) {
            Ok(()) => {
                debug!("Deleted temp directory {:?}", path);
                (true, "deleted".to_string())
            }
            Err(e) => (false, format!("delete failed: {}", e)),
        }
    }

    fn check_file(&self, path: &Path) -> Result<(), String> {
        if path.as_os_str().is_empty() {
            return Err("empty path".to_string());
        }
        if !path.exists() {
            return Err("path does not exist".to_string());
        }
        if !path.is_file() {
            return Err("not a regular file".to_string());
        }
        let name = file_name(path);
        if !FILE_PREFIXES.iter().any(|p| name.starts_with(p)) {
            return Err(format!("file name {:?} has no allowed prefix", name));
        }
        self.check_contained(path)
    }

    fn check_dir(&self, path: &Path) -> Result<(), String> {
        if path.as_os_str().is_empty() {
            return Err("empty path".to_string());
        }
        if !path.exists() {
            return Err("path does not exist".to_string());
        }
        if !path.is_dir() {
            return Err("not a directory".to_string());
        }
        let name = file_name(path);
        if !name.starts_with(FRAMES_PREFIX) {
            return Err(format!("directory name {:?} has no allowed prefix", name));
        }
        self.check_contained(path)?;

        let entries = fs::read_dir(path).map_err(|e| format!("cannot list directory: {}", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| format!("cannot list directory: {}", e))?;
            let entry_path = entry.path();
            if entry_path.is_dir() {
                return Err("directory contains subdirectories".to_string());
            }
            if !is_image(&entry_path) {
                return Err(format!("directory contains non-image file {:?}", entry.file_name()));
            }
        }
        Ok(())
    }

    fn check_contained(&self, path: &Path) -> Result<(), String> {
        let root = self
            .root
            .canonicalize()
            .map_err(|e| format!("cannot resolve temp root: {}", e))?;
        let resolved = path
            .canonicalize()
            .map_err(|e| format!("cannot resolve path: {}", e))?;

        if resolved == root || !resolved.starts_with(&root) {
            return Err("path is outside the temp root".to_string());
        }
        Ok(())
    }

    /// Delete prefixed entries older than `max_age` from every subdirectory.
    pub fn sweep(&self, max_age: Duration) -> SweepStats {
        let mut stats = SweepStats::default();
        let now = SystemTime::now();

        for dir in [self.videos_dir(), self.audio_dir(), self.frames_dir()] {
            if !dir.is_dir() {
                continue;
            }

            for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("Sweep could not read an entry in {:?}: {}", dir, e);
                        stats.errors += 1;
                        continue;
                    }
                };

                let name = entry.file_name().to_string_lossy();
                let is_dir = entry.file_type().is_dir();
                let ours = if is_dir {
                    name.starts_with(FRAMES_PREFIX)
                } else {
                    FILE_PREFIXES.iter().any(|p| name.starts_with(p))
                };
                if !ours {
                    continue;
                }

                let age = entry
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .and_then(|modified| now.duration_since(modified).ok())
                    .unwrap_or_default();
                if age < max_age {
                    continue;
                }

                let (deleted, reason) = if is_dir {
                    self.safe_delete_dir(entry.path())
                } else {
                    self.safe_delete_file(entry.path())
                };

                match (deleted, is_dir) {
                    (true, true) => stats.dirs_deleted += 1,
                    (true, false) => stats.files_deleted += 1,
                    (false, _) => {
                        debug!("Sweep skipped {:?}: {}", entry.path(), reason);
                        stats.errors += 1;
                    }
                }
            }
        }

        if stats.files_deleted + stats.dirs_deleted > 0 {
            info!(
                "Swept {} files and {} directories from {:?}",
                stats.files_deleted, stats.dirs_deleted, self.root
            );
        }
        stats
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}
