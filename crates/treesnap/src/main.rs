//! Treesnap - snapshot, restore and diff a directory tree.
//!
//! This is the main entry point for the treesnap CLI.

mod commands;

use clap::{Parser, Subcommand};
use commands::*;
use std::path::PathBuf;
use treesnap_snapshot::SnapshotConfig;
use treesnap_util::{LogConfig, LogLevel};

#[derive(Parser)]
#[command(name = "treesnap")]
#[command(author, version, about = "Snapshot, restore and diff a directory tree", long_about = None)]
struct Cli {
    /// Data directory holding current/, snapshots/ and history.json
    #[arg(long, global = true, conflicts_with = "config")]
    data_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture the working tree as a new snapshot
    Create {
        /// Description of the snapshot
        #[arg(short, long)]
        message: String,
        /// Author to record (defaults to the current user)
        #[arg(long)]
        author: Option<String>,
    },
    /// List snapshots, newest first
    List {
        /// Print output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one snapshot's metadata and files
    Show {
        /// Snapshot ID
        id: String,
    },
    /// Replace the working tree with a snapshot
    Restore {
        /// Snapshot ID
        id: String,
    },
    /// Diff a snapshot against the working tree
    Diff {
        /// Snapshot ID
        id: String,
        /// Unchanged lines shown around each change
        #[arg(long)]
        context: Option<usize>,
        /// Also show files that exist only in the working tree
        #[arg(long)]
        all: bool,
    },
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    treesnap_util::log::init(LogConfig {
        level: LogLevel::verbose(cli.verbose),
    });

    let config = resolve_config(cli.config.as_deref(), cli.data_dir).await?;
    tracing::debug!(
        working_tree = %config.working_tree.display(),
        "Using configuration"
    );

    match cli.command {
        Commands::Create { message, author } => {
            handle_create(config, &message, author.as_deref()).await
        }
        Commands::List { json } => handle_list(config, json).await,
        Commands::Show { id } => handle_show(config, &id).await,
        Commands::Restore { id } => handle_restore(config, &id).await,
        Commands::Diff { id, context, all } => handle_diff(config, &id, context, all).await,
        Commands::Config => show_config(&config),
    }
}

/// Pick the configuration source: `--config`, then `--data-dir`, then the
/// environment and platform defaults.
async fn resolve_config(
    config_file: Option<&std::path::Path>,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<SnapshotConfig> {
    if let Some(path) = config_file {
        return Ok(SnapshotConfig::load_file(path).await?);
    }
    Ok(match data_dir {
        Some(dir) => SnapshotConfig::for_data_dir(dir),
        None => SnapshotConfig::from_env(),
    })
}
