//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod collect;
mod merge;
mod session;
mod targets;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;

use collect::CollectArgs;

#[derive(Parser)]
#[command(name = "harvest")]
#[command(about = "Incremental post harvester for JavaScript-rendered search pages")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to a discovered harvest.toml)
    #[arg(short, long, global = true, env = "HARVEST_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and collect posts from every query target into the archive
    Collect(CollectArgs),

    /// Merge archives into one file sorted by date
    Merge {
        /// Archive files, in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Inspect or remove the saved login session
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// List the configured query targets
    Targets {
        /// Targets file (overrides config)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Show session age and whether it will be reused
    Status,
    /// Delete the saved session
    Clear {
        /// Confirm deletion
        #[arg(long)]
        confirm: bool,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Collect(args) => collect::cmd_collect(&config, args).await,
        Commands::Merge { inputs, output } => merge::cmd_merge(&inputs, &output),
        Commands::Session { command } => match command {
            SessionCommands::Status => session::cmd_session_status(&config),
            SessionCommands::Clear { confirm } => session::cmd_session_clear(&config, confirm),
        },
        Commands::Targets { file } => targets::cmd_targets(&config, file.as_deref()),
    }
}
