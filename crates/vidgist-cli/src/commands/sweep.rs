//! Temp file sweeping.

use super::{load_config, open_workspace, runtime};
use anyhow::{Context, Result};
use colored::Colorize;
use std::time::Duration;
use vidgist_pipeline::{spawn_sweeper, sweep_once};

pub fn run(max_age_min: Option<u64>, watch: bool) -> Result<()> {
    let (config, paths) = load_config()?;
    let workspace = open_workspace(&paths)?;

    let minutes = max_age_min.unwrap_or(config.general.temp_file_max_age_min);
    let max_age = Duration::from_secs(minutes * 60);
    let rt = runtime()?;

    if !watch {
        let stats = rt.block_on(sweep_once(&workspace, max_age));
        println!(
            "{} Removed {} files and {} frame directories older than {} min",
            "✓".green(),
            stats.files_deleted,
            stats.dirs_deleted,
            minutes
        );
        if stats.errors > 0 {
            println!(
                "{} {} entries could not be removed (see log)",
                "Note:".yellow().bold(),
                stats.errors
            );
        }
        return Ok(());
    }

    if minutes == 0 {
        anyhow::bail!("Watching needs a max age above zero");
    }

    let every = Duration::from_secs(config.general.sweep_interval_min.max(1) * 60);
    println!(
        "{} {} every {} min",
        "Sweeping".cyan(),
        workspace.root().display(),
        every.as_secs() / 60
    );
    println!("\nPress Ctrl+C to stop.\n");

    rt.block_on(async {
        let handle = spawn_sweeper(workspace, every, max_age)
            .context("Sweeper did not start")?;
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?;
        handle.abort();
        Ok::<_, anyhow::Error>(())
    })?;

    println!("{}", "Sweeper stopped.".dimmed());
    Ok(())
}
