//! Content cache commands.

use super::{load_config, open_cache};
use anyhow::Result;
use colored::Colorize;
use vidgist_pipeline::render_raw_info;

pub fn list() -> Result<()> {
    let (_, paths) = load_config()?;
    let cache = open_cache(&paths)?;

    let entries = cache.entries();
    if entries.is_empty() {
        println!("{}", "Cache is empty.".dimmed());
        return Ok(());
    }

    println!("{}", "Cached Videos".cyan().bold());
    println!("{}", "─".repeat(70));

    for (key, entry) in &entries {
        match cache.get(key) {
            Some(record) => {
                let summary = if record.summary_text().is_some() {
                    "summary".green()
                } else {
                    "raw".yellow()
                };
                println!(
                    "{:<24} {:<8} {} {}",
                    key.cyan(),
                    summary,
                    record.title,
                    record.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
                );
            }
            None => println!("{:<24} {} {}", key.cyan(), "unreadable".red(), entry.file),
        }
    }

    println!();
    println!("{} entries in {}", entries.len(), paths.cache_dir.display());
    Ok(())
}

pub fn show(key: &str) -> Result<()> {
    let (_, paths) = load_config()?;
    let cache = open_cache(&paths)?;

    let record = cache
        .get(key)
        .ok_or_else(|| anyhow::anyhow!("No cached record for {}", key))?;

    println!("{}", record.title.cyan().bold());
    println!("{}", "─".repeat(50));
    println!("{}", render_raw_info(&record));

    if let Some(summary) = record.summary_text() {
        println!();
        println!("{}", "Summary".bold());
        println!("{}", summary);
    }

    println!();
    println!(
        "Cached: {}",
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(())
}

pub fn clear(key: Option<&str>) -> Result<()> {
    let (_, paths) = load_config()?;
    let cache = open_cache(&paths)?;

    if let Some(key) = key {
        if cache.get(key).is_none() {
            println!("{} No cached record for {}", "Note:".yellow().bold(), key);
            return Ok(());
        }
    }

    if !cache.clear(key) {
        anyhow::bail!("Failed to clear cache");
    }

    match key {
        Some(key) => println!("{} Removed {}", "✓".green(), key.cyan()),
        None => println!("{} Cache cleared", "✓".green()),
    }
    Ok(())
}
