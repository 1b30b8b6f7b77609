//! Auto-detect mode: enrich a chat message that mentions a video.

use super::{build_orchestrator, load_config, runtime};
use anyhow::Result;

/// Print the message, with a digest appended when one could be produced.
///
/// Failures never surface here; the message passes through unchanged.
pub fn run(text: &str) -> Result<()> {
    let (config, paths) = load_config()?;
    let orchestrator = build_orchestrator(&config, &paths)?;

    let rt = runtime()?;
    let enriched = rt.block_on(async {
        orchestrator.reclaim_expired().await;
        orchestrator.on_message(text).await
    });

    println!("{}", enriched.as_deref().unwrap_or(text));
    Ok(())
}
