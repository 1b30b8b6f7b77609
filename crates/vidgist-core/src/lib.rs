//! Vidgist Core - Domain types shared by every vidgist crate.
//!
//! This crate provides:
//! - Video identity, metadata and cache record types
//! - The error taxonomy used to decide what is worth retrying
//! - A bounded retry envelope with fixed delays
//! - The temp-file workspace with guarded deletion
//! - Capability traits the pipeline is written against

mod capabilities;
mod error;
pub mod retry;
mod types;
mod workspace;

pub use capabilities::{Capabilities, VideoSource};
pub use error::{Classify, Error, ErrorKind, Result};
pub use retry::{retry, RetryPolicy};
pub use types::*;
pub use workspace::{SweepStats, Workspace, AUDIO_PREFIX, FRAMES_PREFIX, VIDEO_PREFIX};
