//! Vidgist LLM - Model provider clients.
//!
//! This crate provides async clients for the providers vidgist can use:
//! Ollama, OpenAI-compatible chat completions, Gemini and the Ark
//! video-understanding API. [`ModelHub`] ties them to the pipeline's
//! capability trait, creating each client lazily on first use.

mod ark;
mod error;
mod gemini;
mod hub;
mod lazy;
mod ollama;
mod openai;
mod types;

pub use ark::ArkClient;
pub use error::{LlmError, LlmResult};
pub use gemini::GeminiClient;
pub use hub::{ChatClient, ModelHub};
pub use lazy::{LazyClient, LazyState};
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use types::*;
