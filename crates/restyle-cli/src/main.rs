//! Restyle CLI - command-line interface for the restyle pipeline

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{config, generate, review, run, scan};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "restyle")]
#[command(about = "Incremental AI restyling of image folders with human review", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a source folder and report pending work
    Scan {
        /// Source folder of original images
        folder: String,

        /// List every item, not just the summary
        #[arg(long)]
        verbose: bool,
    },

    /// Generate variations for every pending image in a folder
    Run {
        /// Source folder of original images
        folder: String,

        /// Restyling prompt (overrides the configured default)
        #[arg(long, short)]
        prompt: Option<String>,

        /// Provider to use (gemini, mock)
        #[arg(long)]
        provider: Option<String>,

        /// Delay between items in milliseconds
        #[arg(long)]
        item_delay_ms: Option<u64>,
    },

    /// Generate variations for a single image
    Generate {
        /// Path to the source image
        path: String,

        /// Restyling prompt (overrides the configured default)
        #[arg(long, short)]
        prompt: Option<String>,

        /// Output directory (defaults to a sibling of the image)
        #[arg(long, short)]
        output: Option<String>,

        /// Provider to use (gemini, mock)
        #[arg(long)]
        provider: Option<String>,
    },

    /// Review generated variations
    #[command(subcommand)]
    Review(review::ReviewCommands),

    /// Configuration operations
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Scan { folder, verbose } => scan::run(&folder, verbose),
        Commands::Run {
            folder,
            prompt,
            provider,
            item_delay_ms,
        } => run::run(&folder, prompt.as_deref(), provider.as_deref(), item_delay_ms),
        Commands::Generate {
            path,
            prompt,
            output,
            provider,
        } => generate::run(
            &path,
            prompt.as_deref(),
            output.as_deref(),
            provider.as_deref(),
        ),
        Commands::Review(cmd) => review::run(cmd),
        Commands::Config(cmd) => config::run(cmd),
    }
}
