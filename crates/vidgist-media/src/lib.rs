//! Vidgist Media - Frame sampling, audio extraction and transcription.
//!
//! This crate provides:
//! - Evenly spaced and fixed-cadence frame extraction (via FFmpeg CLI)
//! - Mono 16 kHz audio extraction and duration probing
//! - Speech-to-text (via Whisper CLI)
//!
//! These rely on external tools being installed on the system. Every output
//! lands in the shared temp workspace under a fresh, prefixed name.

mod error;
mod ffmpeg;
mod toolkit;
mod transcribe;

pub use error::{MediaError, MediaResult};
pub use ffmpeg::{collect_frames, equidistant_timestamps};
pub use toolkit::{Media, MediaToolkit};
pub use transcribe::{segments_to_text, transcribe_audio, TranscriptSegment};

/// Check if required external tools are available.
pub fn check_dependencies() -> Vec<(&'static str, bool)> {
    vec![
        ("ffmpeg", which::which("ffmpeg").is_ok()),
        ("ffprobe", which::which("ffprobe").is_ok()),
        ("whisper", which::which("whisper").is_ok()),
    ]
}

/// Check if all required tools are installed.
pub fn all_tools_available() -> bool {
    check_dependencies().iter().all(|(_, available)| *available)
}
