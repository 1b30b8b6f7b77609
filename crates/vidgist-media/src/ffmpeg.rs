//! FFmpeg integration for frame and audio extraction.

use crate::error::{MediaError, MediaResult};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

fn require(tool: &str) -> MediaResult<()> {
    if which::which(tool).is_err() {
        return Err(MediaError::ToolNotFound {
            tool: tool.to_string(),
        });
    }
    Ok(())
}

fn require_input(path: &Path) -> MediaResult<()> {
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    Ok(())
}

/// Probe the container duration in seconds.
pub(crate) fn probe_duration(path: &Path) -> MediaResult<f64> {
    require_input(path)?;
    require("ffprobe")?;

    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(path)
        .output()?;

    if !output.status.success() {
        return Err(MediaError::FfmpegError(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    let probe: FfprobeOutput = serde_json::from_str(&json_str)
        .map_err(|e| MediaError::ParseError(format!("Failed to parse ffprobe output: {}", e)))?;

    probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| *d > 0.0)
        .ok_or_else(|| MediaError::ParseError("ffprobe reported no duration".to_string()))
}

/// Timestamps for `count` frames spread evenly through `duration`.
///
/// Frame `i` (1-based) sits at `i / (count + 1) * duration`, so neither the
/// first nor the last instant is sampled. A count of zero is treated as one.
pub fn equidistant_timestamps(duration: f64, count: usize) -> Vec<f64> {
    let n = count.max(1);
    (1..=n)
        .map(|i| i as f64 / (n + 1) as f64 * duration)
        .collect()
}

/// Grab one frame per timestamp, skipping the ones that fail.
///
/// Successful frames are returned in timestamp order.
pub fn collect_frames<F>(timestamps: &[f64], mut grab: F) -> Vec<PathBuf>
where
    F: FnMut(usize, f64) -> MediaResult<PathBuf>,
{
    let mut frames = Vec::with_capacity(timestamps.len());
    for (i, &t) in timestamps.iter().enumerate() {
        match grab(i + 1, t) {
            Ok(path) => frames.push(path),
            Err(e) => warn!("Skipping frame {} at {:.2}s: {}", i + 1, t, e),
        }
    }
    frames
}

/// Extract a single frame at `timestamp` into `output_path`.
///
/// The frame is written under a temporary name and renamed once complete.
pub(crate) fn extract_frame_at(
    video_path: &Path,
    output_path: &Path,
    timestamp: f64,
) -> MediaResult<PathBuf> {
    let partial = output_path.with_extension("tmp.jpg");

    let output = Command::new("ffmpeg")
        .arg("-y")
        .args(["-ss", &format!("{:.3}", timestamp)])
        .arg("-i")
        .arg(video_path)
        .args([
            "-frames:v", "1",
            "-qscale:v", "2",
            "-f", "image2",
            "-c:v", "mjpeg",
        ])
        .arg(&partial)
        .output()?;

    if !output.status.success() || !partial.exists() {
        let _ = fs::remove_file(&partial);
        return Err(MediaError::FfmpegError(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    fs::rename(&partial, output_path)?;
    Ok(output_path.to_path_buf())
}

/// Extract `count` evenly spaced frames into `output_dir`.
pub(crate) fn extract_frames_equidistant(
    video_path: &Path,
    output_dir: &Path,
    duration: f64,
    count: usize,
) -> MediaResult<Vec<PathBuf>> {
    require_input(video_path)?;
    require("ffmpeg")?;

    let timestamps = equidistant_timestamps(duration, count);
    info!(
        "Extracting {} evenly spaced frames from {:?} ({:.1}s)",
        timestamps.len(),
        video_path,
        duration
    );

    let frames = collect_frames(&timestamps, |i, t| {
        let path = output_dir.join(format!("frame_{:03}.jpg", i));
        extract_frame_at(video_path, &path, t)
    });

    debug!("Extracted {}/{} frames", frames.len(), timestamps.len());
    Ok(frames)
}

/// Extract one frame every `interval_seconds` from the start, at most `max_frames`.
pub(crate) fn extract_frames_at_interval(
    video_path: &Path,
    output_dir: &Path,
    interval_seconds: u64,
    max_frames: usize,
) -> MediaResult<Vec<PathBuf>> {
    require_input(video_path)?;
    require("ffmpeg")?;

    let interval = interval_seconds.max(1);
    let pattern = output_dir.join("frame_%03d.jpg");

    info!(
        "Extracting up to {} frames from {:?} every {}s",
        max_frames, video_path, interval
    );

    let output = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(video_path)
        .args([
            "-vf",
            &format!("fps=1/{}", interval),
            "-frames:v",
            &max_frames.max(1).to_string(),
            "-qscale:v", "2",
        ])
        .arg(&pattern)
        .output()?;

    if !output.status.success() {
        return Err(MediaError::FfmpegError(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    let mut frames: Vec<PathBuf> = fs::read_dir(output_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("frame_") && n.ends_with(".jpg"))
                .unwrap_or(false)
        })
        .collect();
    frames.sort();
    frames.truncate(max_frames.max(1));

    debug!("Extracted {} frames", frames.len());
    Ok(frames)
}

/// Extract a mono 16 kHz PCM WAV track into `audio_path`.
pub(crate) fn extract_audio(video_path: &Path, audio_path: &Path) -> MediaResult<PathBuf> {
    require_input(video_path)?;
    require("ffmpeg")?;

    let partial = audio_path.with_extension("part.wav");
    info!("Extracting audio from {:?} to {:?}", video_path, audio_path);

    let output = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(video_path)
        .args([
            "-vn",                   // No video
            "-acodec", "pcm_s16le",  // PCM audio
            "-ar", "16000",          // 16kHz sample rate (good for Whisper)
            "-ac", "1",              // Mono
            "-f", "wav",
        ])
        .arg(&partial)
        .output()?;

    if !output.status.success() {
        let _ = fs::remove_file(&partial);
        return Err(MediaError::FfmpegError(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    fs::rename(&partial, audio_path)?;
    debug!("Audio extracted successfully");
    Ok(audio_path.to_path_buf())
}
