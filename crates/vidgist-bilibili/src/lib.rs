//! Vidgist Bilibili - Web API client.
//!
//! This crate provides:
//! - Extraction of video references (links, short links, bare ids) from text
//! - Metadata, subtitle and play-URL lookups
//! - Size-capped streaming downloads
//!
//! [`BiliClient`] implements the pipeline's `VideoSource` trait.

mod client;
mod error;
mod identity;

pub use client::BiliClient;
pub use error::{BiliError, BiliResult};
pub use identity::{page_from_url, parse_reference};
