//! Core domain types for vidgist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numbering scheme of a Bilibili video id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoKind {
    Bv,
    Av,
}

impl VideoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoKind::Bv => "bv",
            VideoKind::Av => "av",
        }
    }

    /// Infer the scheme from an id such as `BV1xx411c7mD` or `av170001`.
    pub fn from_id(id: &str) -> Option<Self> {
        if id.starts_with("BV") {
            Some(VideoKind::Bv)
        } else if id.len() > 2
            && id.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("av"))
            && id[2..].chars().all(|c| c.is_ascii_digit())
        {
            Some(VideoKind::Av)
        } else {
            None
        }
    }
}

/// One page of one video. Pages are numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoIdentity {
    pub kind: VideoKind,
    pub id: String,
    pub page: u32,
}

impl VideoIdentity {
    /// Build an identity, inferring the id scheme. Page 0 is treated as page 1.
    pub fn new(id: impl Into<String>, page: u32) -> Option<Self> {
        let id = id.into();
        let kind = VideoKind::from_id(&id)?;
        let id = match kind {
            VideoKind::Bv => id,
            VideoKind::Av => format!("av{}", &id[2..]),
        };
        Some(Self {
            kind,
            id,
            page: page.max(1),
        })
    }

    /// Cache key for this identity: the bare id for page 1, `<id>_p<page>` otherwise.
    pub fn fingerprint(&self) -> String {
        if self.page > 1 {
            format!("{}_p{}", self.id, self.page)
        } else {
            self.id.clone()
        }
    }

    /// Numeric aid for `av` identities.
    pub fn aid(&self) -> Option<u64> {
        match self.kind {
            VideoKind::Av => self.id[2..].parse().ok(),
            VideoKind::Bv => None,
        }
    }
}

impl fmt::Display for VideoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.page > 1 {
            write!(f, "{} P{}", self.id, self.page)
        } else {
            f.write_str(&self.id)
        }
    }
}

/// A video reference found in text.
///
/// Short links have to be resolved over the network before they become an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Identity(VideoIdentity),
    Short(String),
}

/// Metadata for the selected page of a video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub aid: Option<u64>,
    pub cid: Option<u64>,
    pub bvid: String,
    pub title: String,
    pub description: String,
    pub author: String,
    /// Duration of the selected page in seconds.
    pub duration: Option<u64>,
    /// Sum of all page durations in seconds.
    pub total_duration: Option<u64>,
    pub page: u32,
    pub page_title: String,
    pub total_pages: u32,
}

impl Metadata {
    /// Whole minutes of the selected page, if known.
    pub fn duration_minutes(&self) -> Option<u64> {
        self.duration.map(|secs| secs / 60)
    }
}

/// How the visual side of a video was analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualMethod {
    /// Sampled frames described by the general model.
    FrameBased,
    /// Sampled frames described by the dedicated vision model.
    BuiltinFrameBased,
    /// The whole file was sent to a video-understanding model.
    WholeVideo,
    #[default]
    None,
}

impl VisualMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisualMethod::FrameBased => "frame_based",
            VisualMethod::BuiltinFrameBased => "builtin_frame_based",
            VisualMethod::WholeVideo => "whole_video",
            VisualMethod::None => "none",
        }
    }

    pub fn is_frame_based(&self) -> bool {
        matches!(self, VisualMethod::FrameBased | VisualMethod::BuiltinFrameBased)
    }
}

impl fmt::Display for VisualMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything extracted from a video before summarization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawInfo {
    pub subtitle_text: String,
    pub asr_text: String,
    pub frame_descriptions: Vec<String>,
    pub visual_analysis: String,
    pub visual_method: VisualMethod,
}

impl RawInfo {
    /// Whether anything beyond bare metadata was extracted.
    pub fn has_content(&self) -> bool {
        !self.subtitle_text.is_empty()
            || !self.asr_text.is_empty()
            || !self.frame_descriptions.is_empty()
            || !self.visual_analysis.is_empty()
    }
}

/// A cached processing outcome, keyed by [`VideoIdentity::fingerprint`].
///
/// Records are replaced wholesale; a record without a summary may later be
/// replaced by one that carries the same `raw_info` plus a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub video_id: String,
    pub page: u32,
    #[serde(default)]
    pub page_title: String,
    #[serde(default = "default_total_pages")]
    pub total_pages: u32,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    pub duration: Option<u64>,
    pub total_duration: Option<u64>,
    #[serde(default)]
    pub raw_info: RawInfo,
    pub summary: Option<String>,
    #[serde(default)]
    pub has_subtitle: bool,
    #[serde(default)]
    pub has_asr: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_total_pages() -> u32 {
    1
}

impl CacheRecord {
    /// Build a summary-less record from metadata and extracted content.
    pub fn new(video_id: impl Into<String>, metadata: &Metadata, raw_info: RawInfo) -> Self {
        Self {
            video_id: video_id.into(),
            page: metadata.page.max(1),
            page_title: metadata.page_title.clone(),
            total_pages: metadata.total_pages.max(1),
            title: metadata.title.clone(),
            author: metadata.author.clone(),
            description: metadata.description.clone(),
            duration: metadata.duration,
            total_duration: metadata.total_duration,
            has_subtitle: !raw_info.subtitle_text.is_empty(),
            has_asr: !raw_info.asr_text.is_empty(),
            raw_info,
            summary: None,
            created_at: Utc::now(),
        }
    }

    /// Replace the record with one carrying `summary`.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self.created_at = Utc::now();
        self
    }

    /// The summary, if present and non-blank.
    pub fn summary_text(&self) -> Option<&str> {
        self.summary.as_deref().filter(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_id() {
        assert_eq!(VideoKind::from_id("BV1xx411c7mD"), Some(VideoKind::Bv));
        assert_eq!(VideoKind::from_id("av170001"), Some(VideoKind::Av));
        assert_eq!(VideoKind::from_id("AV170001"), Some(VideoKind::Av));
        assert_eq!(VideoKind::from_id("avocado"), None);
        assert_eq!(VideoKind::from_id("12345"), None);
    }

    #[test]
    fn test_fingerprint() {
        let first = VideoIdentity::new("BV1xx411c7mD", 1).unwrap();
        assert_eq!(first.fingerprint(), "BV1xx411c7mD");

        let third = VideoIdentity::new("BV1xx411c7mD", 3).unwrap();
        assert_eq!(third.fingerprint(), "BV1xx411c7mD_p3");

        let zero = VideoIdentity::new("av170001", 0).unwrap();
        assert_eq!(zero.page, 1);
        assert_eq!(zero.fingerprint(), "av170001");
    }

    #[test]
    fn test_av_identity_normalized() {
        let identity = VideoIdentity::new("AV170001", 2).unwrap();
        assert_eq!(identity.id, "av170001");
        assert_eq!(identity.aid(), Some(170001));
        assert_eq!(identity.to_string(), "av170001 P2");
    }

    #[test]
    fn test_record_flags_follow_raw_info() {
        let metadata = Metadata {
            title: "Title".to_string(),
            page: 1,
            total_pages: 1,
            duration: Some(90),
            ..Default::default()
        };
        let raw = RawInfo {
            subtitle_text: "hello".to_string(),
            ..Default::default()
        };

        let record = CacheRecord::new("BV1xx411c7mD", &metadata, raw);
        assert!(record.has_subtitle);
        assert!(!record.has_asr);
        assert!(record.summary_text().is_none());

        let record = record.with_summary("A short summary.");
        assert_eq!(record.summary_text(), Some("A short summary."));
    }

    #[test]
    fn test_record_serde_keeps_missing_fields_defaulted() {
        let json = r#"{
            "video_id": "BV1xx411c7mD",
            "page": 1,
            "title": "t",
            "duration": null,
            "total_duration": null,
            "summary": null
        }"#;
        let record: CacheRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.total_pages, 1);
        assert_eq!(record.raw_info.visual_method, VisualMethod::None);
    }
}
