//! Frame descriptions, summaries, replies and plain-text digests.

use crate::result::merge_text;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};
use vidgist_config::{Config, PersonaConfig};
use vidgist_core::{CacheRecord, Capabilities, VisualMethod};

/// Lines that talk about the summary instead of being part of it.
static META_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:note|notes|explanation|rewrite notes?|说明|注|改写说明)\s*[:：]")
        .unwrap()
});

static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)、])\s+").unwrap());

const UNRECOGNIZED: &str = "content unrecognized";

/// Settings for summaries and replies.
#[derive(Debug, Clone)]
pub struct SummarySettings {
    pub enable_summary: bool,
    pub min_chars: usize,
    pub max_chars: usize,
    pub reply_max_chars: usize,
    pub language: String,
    pub description_limit: usize,
    pub text_limit: usize,
    pub text_only_limit: usize,
    pub max_described_frames: usize,
    pub persona: PersonaConfig,
}

impl SummarySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enable_summary: config.summary.enable_summary,
            min_chars: config.summary.min_chars,
            max_chars: config.summary.max_chars,
            reply_max_chars: config.summary.reply_max_chars,
            language: config.summary.language.clone(),
            description_limit: config.summary.description_limit,
            text_limit: config.summary.text_limit,
            text_only_limit: config.summary.text_only_limit,
            max_described_frames: config.analysis.max_described_frames,
            persona: config.persona.clone(),
        }
    }
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Writes summaries and replies with the configured models.
pub struct Summarizer {
    capabilities: Arc<dyn Capabilities>,
    settings: SummarySettings,
}

impl Summarizer {
    pub fn new(capabilities: Arc<dyn Capabilities>, settings: SummarySettings) -> Self {
        Self {
            capabilities,
            settings,
        }
    }

    pub fn settings(&self) -> &SummarySettings {
        &self.settings
    }

    /// Describe the first few frames, one model call at a time.
    ///
    /// Returns one `frame{i}: ...` line per described frame; frames the
    /// model could not make out are kept with a placeholder.
    pub async fn describe_frames(&self, frames: &[PathBuf]) -> Vec<String> {
        let limit = frames.len().min(self.settings.max_described_frames);
        if limit == 0 {
            return Vec::new();
        }
        debug!("Describing {} of {} frames", limit, frames.len());

        let prompt = format!(
            "Describe the key content of this video frame in one {} sentence of no more than 25 words. \
             Describe only what is actually visible; do not guess or invent. \
             If it cannot be determined, answer 'unrecognized'.",
            self.settings.language
        );

        let mut descriptions = Vec::with_capacity(limit);
        for (i, frame) in frames.iter().take(limit).enumerate() {
            let index = i + 1;
            let text = self
                .capabilities
                .describe_image(frame, &prompt)
                .await
                .map(|d| strip_quotes(d.trim()).trim().to_string())
                .filter(|d| !d.is_empty() && !is_unrecognized(d));

            match text {
                Some(text) => descriptions.push(format!("frame{}: {}", index, text)),
                None => descriptions.push(format!("frame{}: {}", index, UNRECOGNIZED)),
            }
        }
        descriptions
    }

    /// Generate a summary of a processed video.
    ///
    /// The strategy follows what the processor managed to extract:
    /// whole-video analysis, frame descriptions, or text alone.
    pub async fn summarize(&self, record: &CacheRecord) -> Option<String> {
        let raw = &record.raw_info;
        let prompt = if raw.visual_method == VisualMethod::WholeVideo
            && !raw.visual_analysis.trim().is_empty()
        {
            debug!("Summarizing {} from whole-video analysis", record.video_id);
            let visual = format!(
                "\n\nVideo content analysis (AI visual understanding):\n{}",
                raw.visual_analysis
            );
            self.summary_prompt(record, Some(visual), self.settings.text_limit, false)
        } else if raw.visual_method.is_frame_based() && !raw.frame_descriptions.is_empty() {
            debug!(
                "Summarizing {} from {} frame descriptions",
                record.video_id,
                raw.frame_descriptions.len()
            );
            let visual = format!(
                "\n\nKey frame descriptions:\n{}",
                raw.frame_descriptions.join("\n")
            );
            self.summary_prompt(record, Some(visual), self.settings.text_limit, false)
        } else {
            debug!("Summarizing {} from text only", record.video_id);
            self.summary_prompt(record, None, self.settings.text_only_limit, true)
        };

        let Some(answer) = self.capabilities.generate_text(&prompt).await else {
            warn!("Summary generation failed for {}", record.video_id);
            return None;
        };

        let summary = clean_summary(&answer);
        if summary.is_empty() {
            warn!("Summary for {} was empty", record.video_id);
            None
        } else {
            Some(summary)
        }
    }

    fn summary_prompt(
        &self,
        record: &CacheRecord,
        visual: Option<String>,
        text_limit: usize,
        text_only: bool,
    ) -> String {
        let mut meta = vec![format!("Title: {}", record.title)];
        if !record.author.is_empty() {
            meta.push(format!("Uploader: {}", record.author));
        }
        if let Some(duration) = record.duration.filter(|d| *d > 0) {
            meta.push(format!("Duration: {}", prompt_duration(duration)));
        }
        if record.raw_info.visual_method.is_frame_based() && visual.is_some() {
            meta.push(format!(
                "Frames analyzed: {}",
                record.raw_info.frame_descriptions.len()
            ));
        }

        let mut prompt = format!(
            "Based on the following Bilibili video information, write a concise, objective \
             third-person summary of the video content in {} ({}-{} words).\n",
            self.settings.language, self.settings.min_chars, self.settings.max_chars
        );
        if text_only {
            prompt.push_str(
                "Note: no visual analysis was performed, so base the summary mainly on the \
                 subtitles, speech transcript and description.\n",
            );
        }
        prompt.push_str(
            "Requirements:\n\
             1. Describe only the objective content of the video, without opinions or feelings\n\
             2. Do not use first or second person pronouns such as 'I' or 'you'\n\
             3. Do not open with phrases like 'This is a video made by...'; describe the content directly\n\
             4. Output only the summary itself, with no title, notes, explanations or formatting\n\n",
        );
        prompt.push_str(&meta.join("\n"));

        if !record.description.trim().is_empty() {
            prompt.push_str("\n\nDescription:\n");
            prompt.push_str(&truncate_chars(
                &record.description,
                self.settings.description_limit,
            ));
        }
        if let Some(visual) = visual {
            prompt.push_str(&visual);
        }
        let text = merge_text(
            Some(record.raw_info.subtitle_text.as_str()),
            Some(record.raw_info.asr_text.as_str()),
        );
        if let Some(text) = text {
            prompt.push_str("\n\nSubtitles / speech:\n");
            prompt.push_str(&truncate_chars(&text, text_limit));
        }
        prompt
    }

    /// A casual reply in the configured persona's voice.
    ///
    /// Uses the record's summary when it has one and the raw extracted
    /// content otherwise.
    pub async fn personalized_reply(&self, record: &CacheRecord) -> Option<String> {
        let persona = &self.settings.persona;

        let mut info = vec![format!("Title: \"{}\"{}", record.title, page_marker(record))];
        if !record.author.is_empty() {
            info.push(format!("Uploader: {}", record.author));
        }
        info.extend(duration_lines(record));
        if !record.description.trim().is_empty() {
            info.push(format!(
                "Description: {}",
                truncate_chars(&record.description, 150)
            ));
        }

        let content = match record.summary_text() {
            Some(summary) => format!("Video summary:\n{}", summary),
            None => format!("Video details:\n{}", raw_sections(record)),
        };

        let prompt = format!(
            "You are {name}, {personality}.\n\n\
             Someone shared a Bilibili video link and wants to hear what you think of it.\n\n\
             Video info:\n{info}\n\n\
             {content}\n\n\
             Reply in your own voice with a short, casual take on the video, in {language} and \
             no longer than {max} words.\n\
             Your speaking style: {style}\n\
             Requirements:\n\
             - Keep it short, like everyday chat\n\
             - It does not need to be structured\n\
             - Do not open with a summary such as \"This video is about...\"\n\
             - Output only the reply, with no prefixes, quotes, brackets, emoji or @mentions",
            name = persona.name,
            personality = persona.personality,
            info = info.join("\n"),
            content = content,
            language = self.settings.language,
            max = self.settings.reply_max_chars,
            style = persona.reply_style,
        );

        let reply = self.capabilities.generate_text(&prompt).await?;
        let reply = strip_quotes(reply.trim()).trim().to_string();
        if reply.is_empty() {
            None
        } else {
            Some(reply)
        }
    }
}

fn is_unrecognized(text: &str) -> bool {
    let text = text.trim_end_matches(&['.', '。'][..]);
    text.eq_ignore_ascii_case("unrecognized") || text == "未识别"
}

/// Remove one pair of matching quotes around the whole text.
fn strip_quotes(text: &str) -> &str {
    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”'), ('「', '」')] {
        if text.chars().count() >= 2 && text.starts_with(open) && text.ends_with(close) {
            return &text[open.len_utf8()..text.len() - close.len_utf8()];
        }
    }
    text
}

/// The first `limit` characters of `text`, with an ellipsis if anything was cut.
pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Tidy a model-written summary into a single paragraph.
///
/// Wrapping quotes, meta-commentary lines, bold markers and list bullets are
/// removed. If nothing is left, the first line of the original answer is used.
pub fn clean_summary(text: &str) -> String {
    let text = strip_quotes(text.trim()).trim();

    let kept: Vec<String> = text
        .lines()
        .filter(|line| !META_LINE.is_match(line))
        .map(|line| {
            let line = line.replace("**", "");
            BULLET.replace(&line, "").trim().to_string()
        })
        .filter(|line| !line.is_empty())
        .collect();

    if kept.is_empty() {
        text.lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string()
    } else {
        kept.join(" ")
    }
}

/// A readable duration such as "4h 2m", "48m" or "30s".
///
/// Seconds are only shown for durations under a minute.
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{}s", seconds);
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    parts.join(" ")
}

fn prompt_duration(seconds: u64) -> String {
    let minutes = seconds / 60;
    let secs = seconds % 60;
    if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

fn page_marker(record: &CacheRecord) -> String {
    if record.total_pages <= 1 {
        String::new()
    } else if record.page_title.is_empty() {
        format!(" P{}", record.page)
    } else {
        format!(" P{} ({})", record.page, record.page_title)
    }
}

fn header(record: &CacheRecord) -> String {
    format!(
        "About this Bilibili video \"{}\"{}:",
        record.title,
        page_marker(record)
    )
}

/// Current-part and series durations for multi-page videos, a single one otherwise.
fn duration_lines(record: &CacheRecord) -> Vec<String> {
    let mut lines = Vec::new();
    if record.total_pages > 1 {
        if let Some(duration) = record.duration.filter(|d| *d > 0) {
            lines.push(format!("Current part: {}", format_duration(duration)));
        }
        if let Some(total) = record.total_duration.filter(|d| *d > 0) {
            lines.push(format!(
                "Series total: {} ({} parts)",
                format_duration(total),
                record.total_pages
            ));
        }
    } else if let Some(duration) = record.duration.filter(|d| *d > 0) {
        lines.push(format!("Duration: {}", format_duration(duration)));
    }
    lines
}

fn raw_sections(record: &CacheRecord) -> String {
    let raw = &record.raw_info;
    let mut sections = Vec::new();
    if let Some(text) = merge_text(Some(raw.subtitle_text.as_str()), Some(raw.asr_text.as_str())) {
        sections.push(text);
    }
    if !raw.frame_descriptions.is_empty() {
        sections.push(format!(
            "[Frame descriptions]\n{}",
            raw.frame_descriptions.join("\n")
        ));
    }
    if !raw.visual_analysis.trim().is_empty() {
        sections.push(format!("[Video analysis]\n{}", raw.visual_analysis));
    }

    if sections.is_empty() {
        "(no detailed content)".to_string()
    } else {
        sections.join("\n\n")
    }
}

/// Everything extracted from a video as plain text, without a model call.
pub fn render_raw_info(record: &CacheRecord) -> String {
    let raw = &record.raw_info;
    let mut parts = vec![header(record)];

    if !record.author.is_empty() {
        parts.push(format!("Uploader: {}", record.author));
    }
    parts.extend(duration_lines(record));
    if !record.description.trim().is_empty() {
        parts.push(format!("Description: {}", record.description));
    }
    if !raw.subtitle_text.is_empty() {
        parts.push(format!("Subtitles: {}", raw.subtitle_text));
    }
    if !raw.asr_text.is_empty() {
        parts.push(format!("Speech transcript: {}", raw.asr_text));
    }
    if !raw.frame_descriptions.is_empty() {
        parts.push(format!("Frames: {}", raw.frame_descriptions.join("; ")));
    }
    if !raw.visual_analysis.is_empty() {
        parts.push(format!("Video analysis: {}", raw.visual_analysis));
    }

    parts.join("\n")
}

/// The digest block shown with a summary.
pub fn render_summary_block(record: &CacheRecord, summary: &str) -> String {
    let mut parts = vec![header(record)];

    if !record.author.is_empty() {
        parts.push(format!("Uploader: {}", record.author));
    }
    parts.extend(duration_lines(record));
    if !record.description.trim().is_empty() {
        parts.push(format!(
            "Description: {}",
            truncate_chars(&record.description, 200)
        ));
    }
    parts.push(format!("Summary: {}", summary));

    parts.join("\n")
}

/// A plain reply for when the persona reply could not be generated.
pub fn fallback_reply(record: &CacheRecord) -> String {
    let raw = &record.raw_info;
    let mut parts = vec![if record.author.is_empty() {
        format!("About \"{}\":", record.title)
    } else {
        format!("About \"{}\" (uploader: {}):", record.title, record.author)
    }];

    if let Some(summary) = record.summary_text() {
        parts.push(summary.to_string());
    } else {
        let text = merge_text(Some(raw.subtitle_text.as_str()), Some(raw.asr_text.as_str()));
        if let Some(text) = text {
            parts.push(format!("Content: {}", truncate_chars(&text, 200)));
        }
        if !raw.frame_descriptions.is_empty() {
            let frames: Vec<&str> = raw
                .frame_descriptions
                .iter()
                .take(3)
                .map(String::as_str)
                .collect();
            parts.push(format!("Frames: {}", frames.join("; ")));
        }
        if !raw.visual_analysis.trim().is_empty() {
            parts.push(format!(
                "Video analysis: {}",
                truncate_chars(&raw.visual_analysis, 200)
            ));
        }
        if parts.len() == 1 && !record.description.trim().is_empty() {
            parts.push(truncate_chars(&record.description, 200));
        }
    }

    parts.join("\n")
}
