//! Traits for the remote services the pipeline depends on.

use crate::error::Result;
use crate::types::{Metadata, VideoIdentity};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A video-hosting API.
///
/// Errors should be [`crate::Error::Classified`] so callers can tell
/// retryable failures from terminal ones.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Find the first video reference in `text` and resolve it to an identity,
    /// following short links if needed.
    async fn resolve(&self, text: &str) -> Option<VideoIdentity>;

    /// Fetch metadata for the page named by `identity`.
    async fn fetch_metadata(&self, identity: &VideoIdentity) -> Result<Metadata>;

    /// Fetch the subtitle text of a page, if it has one.
    async fn fetch_subtitle(&self, aid: u64, cid: u64) -> Result<Option<String>>;

    /// Resolve a direct download URL for the page described by `metadata`.
    async fn fetch_download_url(&self, metadata: &Metadata) -> Result<Option<String>>;

    /// Download `url` to `dest`, failing with `TooLarge` past `max_bytes`.
    ///
    /// On any failure nothing is left at `dest`.
    async fn download(&self, url: &str, max_bytes: u64, dest: &Path) -> Result<PathBuf>;
}

/// Model-backed analysis.
///
/// Every method degrades to `None` instead of failing; providers log their
/// own errors and apply their own retry policy.
#[async_trait]
pub trait Capabilities: Send + Sync {
    /// Describe a single image.
    async fn describe_image(&self, path: &Path, prompt: &str) -> Option<String>;

    /// Describe a whole video file.
    async fn describe_video(&self, path: &Path, prompt: &str) -> Option<String>;

    /// Generate free text from a prompt.
    async fn generate_text(&self, prompt: &str) -> Option<String>;
}
