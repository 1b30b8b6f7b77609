//! Check external tools and model providers.

use super::{load_config, runtime};
use anyhow::Result;
use colored::Colorize;
use vidgist_config::{ProviderConfig, ProviderKind};
use vidgist_llm::OllamaClient;

pub fn run() -> Result<()> {
    let (config, paths) = load_config()?;
    let rt = runtime()?;

    println!("{}", "External Tools".cyan().bold());
    println!("{}", "─".repeat(50));
    for (tool, available) in vidgist_media::check_dependencies() {
        if available {
            println!("  {} {}", "✓".green(), tool);
        } else {
            println!("  {} {} (not found)", "✗".red(), tool);
        }
    }

    println!();
    println!("{}", "Models".cyan().bold());
    println!("{}", "─".repeat(50));
    println!("  Analysis mode: {:?}", config.analysis.mode);
    let slots = [
        ("text", &config.analysis.text_model),
        ("vision", &config.analysis.vlm),
        ("video", &config.analysis.video_model),
    ];
    for (name, provider) in slots {
        let status = rt.block_on(provider_status(provider));
        println!(
            "  {:<7} {:?} / {} {}",
            name,
            provider.provider,
            provider.model,
            status
        );
    }

    println!();
    println!("{}", "Bilibili".cyan().bold());
    println!("{}", "─".repeat(50));
    if config.video.auth_token().is_some() {
        println!("  {} SESSDATA set (subtitles available)", "✓".green());
    } else {
        println!(
            "  {} No SESSDATA, subtitles will be skipped",
            "Note:".yellow().bold()
        );
    }

    println!();
    println!("  Config: {}", paths.config_file.display());
    println!("  Cache:  {}", paths.cache_dir.display());
    println!("  Temp:   {}", paths.temp_dir.display());

    Ok(())
}

async fn provider_status(provider: &ProviderConfig) -> colored::ColoredString {
    match provider.provider {
        ProviderKind::Ollama => match OllamaClient::from_config(provider) {
            Ok(client) if client.is_available().await => "reachable".green(),
            Ok(_) => "not reachable".red(),
            Err(e) => format!("invalid ({})", e).red(),
        },
        _ if provider.resolved_api_key().is_some() => "key set".green(),
        _ => "no API key".yellow(),
    }
}
