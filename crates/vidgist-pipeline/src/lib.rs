//! Vidgist Pipeline - Turning a video reference into a digest.
//!
//! This crate provides:
//! - The [`Processor`], which gathers metadata, subtitles, frames, whole-video
//!   analysis and speech transcripts, degrading gracefully when a step fails
//! - The [`Summarizer`], which describes frames and writes summaries and replies
//! - The [`Orchestrator`], the cache-aware entry point for auto-detected
//!   references and explicit commands
//! - A background sweeper for stale temp files
//!
//! Everything is written against the capability traits in `vidgist-core`.

mod error;
mod orchestrator;
mod processor;
mod result;
mod summarizer;
mod sweeper;

#[cfg(test)]
mod testing;

pub use error::{PipelineError, PipelineResult};
pub use orchestrator::{
    CommandOutcome, Orchestrator, OrchestratorSettings, Presentation, DIGEST_MARKER,
};
pub use processor::{Processor, ProcessorSettings};
pub use result::{merge_text, ProcessResult};
pub use summarizer::{
    clean_summary, fallback_reply, format_duration, render_raw_info, render_summary_block,
    Summarizer, SummarySettings,
};
pub use sweeper::{spawn_sweeper, sweep_once};
