//! Command mode: summarize the video a piece of text refers to.

use super::{build_orchestrator, load_config, runtime};
use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use vidgist_pipeline::{CommandOutcome, Presentation};

pub fn run(text: &str, raw: bool, reply: bool) -> Result<()> {
    let (config, paths) = load_config()?;
    let orchestrator = build_orchestrator(&config, &paths)?;

    let presentation = if raw {
        Presentation::Raw
    } else if reply {
        Presentation::Reply
    } else {
        Presentation::Summary
    };

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")?,
    );
    pb.set_message("Digesting video...");
    pb.enable_steady_tick(Duration::from_millis(100));

    let rt = runtime()?;
    let outcome = rt.block_on(async {
        orchestrator.reclaim_expired().await;
        orchestrator.command(text, presentation).await
    });

    match outcome {
        CommandOutcome::Replied { reply, record, .. } => {
            pb.finish_and_clear();
            println!(
                "{} {} {}",
                "✓".green(),
                record.title.bold(),
                format!("({} P{})", record.video_id, record.page).dimmed()
            );
            println!("{}", "─".repeat(50));
            println!("{}", reply);
        }
        CommandOutcome::Failed(message) => {
            pb.finish_and_clear();
            println!("{}", message.yellow());
        }
    }

    Ok(())
}
