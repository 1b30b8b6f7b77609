//! Vidgist CLI - Bilibili video digests and summaries from the terminal

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Vidgist - Turn Bilibili links into digests and summaries
#[derive(Parser)]
#[command(name = "vidgist")]
#[command(author = "Lalo Morales <lalomorales22@github.com>")]
#[command(version)]
#[command(about = "Turn Bilibili links into digests and summaries", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize vidgist (create config and data directories)
    Init,

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Summarize the video referenced in TEXT (command mode)
    Summarize {
        /// Text containing a BV/av id, a video URL or a b23.tv link
        text: String,

        /// Print everything extracted, without a generated summary
        #[arg(long, conflicts_with = "reply")]
        raw: bool,

        /// Answer in the persona's voice instead of a summary
        #[arg(long)]
        reply: bool,
    },

    /// Enrich a chat message the way auto-detect mode does
    Detect {
        /// The chat message
        text: String,
    },

    /// Manage the content cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Remove stale temp files
    Sweep {
        /// Delete files older than this many minutes (default: from config)
        #[arg(long)]
        max_age_min: Option<u64>,

        /// Keep sweeping periodically until interrupted
        #[arg(short, long)]
        watch: bool,
    },

    /// Check external tools and model providers
    Check,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., video.max_duration_min)
        key: String,

        /// Value to set
        value: String,
    },

    /// Print the config file location
    Path,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// List cached videos
    List,

    /// Show a cached record
    Show {
        /// Cache key (e.g., BV1xx411c7mD, or BV1xx411c7mD_p2 for later parts)
        key: String,
    },

    /// Remove one cached record, or everything
    Clear {
        /// Cache key; omit to clear the whole cache
        key: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vidgist=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vidgist=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(),
            ConfigCommands::Set { key, value } => commands::config::set(&key, &value),
            ConfigCommands::Path => commands::config::path(),
        },
        Commands::Summarize { text, raw, reply } => commands::summarize::run(&text, raw, reply),
        Commands::Detect { text } => commands::detect::run(&text),
        Commands::Cache(cmd) => match cmd {
            CacheCommands::List => commands::cache::list(),
            CacheCommands::Show { key } => commands::cache::show(&key),
            CacheCommands::Clear { key } => commands::cache::clear(key.as_deref()),
        },
        Commands::Sweep { max_age_min, watch } => commands::sweep::run(max_age_min, watch),
        Commands::Check => commands::check::run(),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
