//! Configuration commands.

use super::get_paths;
use anyhow::{Context, Result};
use colored::Colorize;
use vidgist_config::Config;

pub fn show() -> Result<()> {
    let paths = get_paths()?;

    if !paths.config_file.exists() {
        anyhow::bail!("Config file not found. Run 'vidgist init' first.");
    }

    let contents = std::fs::read_to_string(&paths.config_file)
        .context("Failed to read config file")?;

    println!("{}", "Current Configuration".cyan().bold());
    println!("{}", "─".repeat(50));
    println!("{}", contents);

    Ok(())
}

pub fn set(key: &str, value: &str) -> Result<()> {
    let paths = get_paths()?;

    let mut config = Config::load_from(&paths.config_file)
        .context("Failed to load config")?;

    config
        .set_value(key, value)
        .with_context(|| format!("Cannot set {}", key))?;

    config.save_to(&paths.config_file)
        .context("Failed to save config")?;

    println!(
        "{} Set {} = {}",
        "✓".green(),
        key.cyan(),
        value
    );

    Ok(())
}

pub fn path() -> Result<()> {
    let paths = get_paths()?;
    println!("{}", paths.config_file.display());
    Ok(())
}
