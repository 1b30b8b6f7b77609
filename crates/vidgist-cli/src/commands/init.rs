//! Initialize vidgist.

use super::get_paths;
use anyhow::{Context, Result};
use colored::Colorize;
use vidgist_config::Config;

pub fn run() -> Result<()> {
    let paths = get_paths()?;

    if paths.is_initialized() {
        println!(
            "{} vidgist is already initialized.",
            "Note:".yellow().bold()
        );
        println!("  Config: {}", paths.config_file.display());
        println!("  Data:   {}", paths.data_dir.display());
        return Ok(());
    }

    println!("{}", "Initializing vidgist...".cyan().bold());

    paths
        .ensure_dirs()
        .context("Failed to create directories")?;
    println!("  {} Created directories", "✓".green());

    Config::create_default_file(&paths.config_file)
        .context("Failed to create config file")?;
    println!(
        "  {} Created config: {}",
        "✓".green(),
        paths.config_file.display()
    );

    println!();
    println!("{}", "vidgist initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  1. Pick a model provider: {}",
        "vidgist config set analysis.text_model.provider openai".cyan()
    );
    println!(
        "  2. Check external tools: {}",
        "vidgist check".cyan()
    );
    println!(
        "  3. Summarize a video: {}",
        "vidgist summarize BV1xx411c7mD".cyan()
    );

    Ok(())
}
