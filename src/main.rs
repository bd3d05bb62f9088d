use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use leadflow::config::LeadflowConfig;
use leadflow::telemetry;

mod cmd;

#[derive(Parser)]
#[command(name = "leadflow")]
#[command(version, about = "Optimistic Kanban reordering for lead pipelines")]
pub struct Cli {
    /// Debug logging (overrides the configured level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to leadflow.toml. Defaults to .leadflow/leadflow.toml in the project directory.
    #[arg(long, global = true, env = "LEADFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Use a seeded in-memory pipeline instead of the HTTP backend
    #[arg(long, global = true)]
    pub demo: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the pipeline columns
    Board {
        /// Only show this status column (e.g. QUOTE_SENT)
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Drop a lead onto a column or before another lead, and wait for the commit
    Move {
        /// Lead to drag
        lead_id: String,
        /// Status value (column) or lead id (insert before that card)
        target: String,
    },
    /// View or create the configuration file
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default leadflow.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    // Init must work even when the existing file no longer parses.
    if let Commands::Config {
        command: Some(ConfigCommands::Init { force }),
    } = &cli.command
    {
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| LeadflowConfig::default_path(&project_dir));
        return cmd::cmd_config_init(&path, *force);
    }

    let config =
        LeadflowConfig::with_cli_args(&project_dir, cli.config.as_deref(), cli.verbose, cli.demo)?;
    telemetry::init_tracing(config.log_level(), config.log_format())?;
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    match &cli.command {
        Commands::Board { status } => cmd::cmd_board(&config, status.as_deref()).await?,
        Commands::Move { lead_id, target } => cmd::cmd_move(&config, lead_id, target).await?,
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    }

    Ok(())
}
