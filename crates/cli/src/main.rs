//! MissionClaw CLI: the main entry point.
//!
//! Commands:
//! - `mission`   : Drive a task to completion with the built-in tools
//! - `translate` : Translate a document section by section

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "missionclaw",
    about = "MissionClaw: LLM missions over a text-completion API",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.missionclaw/config.toml)
    #[arg(short, long, global = true, env = "MISSIONCLAW_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a mission
    Mission {
        /// What the mission should achieve
        #[arg(required = true, num_args = 1..)]
        task: Vec<String>,

        /// Completion request budget, role analysis included
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        max_loops: Option<u32>,

        /// Facts file prepended to every request
        #[arg(short, long)]
        knowledge: Option<PathBuf>,
    },

    /// Translate a URL, a file or literal text
    Translate {
        /// URL, path or text to translate
        #[arg(short, long)]
        target: String,

        /// Target language
        #[arg(short, long)]
        language: Option<String>,

        /// Where the translation is written
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Mission {
            task,
            max_loops,
            knowledge,
        } => commands::mission::run(&config, &task.join(" "), max_loops, knowledge).await?,
        Commands::Translate {
            target,
            language,
            output,
        } => commands::translate::run(&config, &target, language, output).await?,
    }

    Ok(())
}
