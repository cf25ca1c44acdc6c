//! ListenUp CLI
//!
//! Command-line tools for a ListenUp store.
//!
//! # Commands
//!
//! - `init` - Open the store and create the server record
//! - `status` - Display the server record and engine statistics
//! - `sweep-tokens` - Delete refresh tokens older than a maximum age
//! - `libraries` - List libraries and their directories
//! - `checkpoint` - Compact the write-ahead log

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ListenUp store tools.
#[derive(Parser)]
#[command(name = "listenup")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database directory
    #[arg(global = true, short, long, env = "LISTENUP_DB_PATH")]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the store, creating it and the server record if missing
    Init {
        /// Display name for a newly created server
        #[arg(short, long, env = "LISTENUP_SERVER_NAME")]
        name: Option<String>,
    },

    /// Display the server record and engine statistics
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Delete refresh tokens older than the given age
    SweepTokens {
        /// Maximum token age in seconds
        #[arg(short, long, default_value_t = commands::sweep::DEFAULT_MAX_AGE_SECS)]
        max_age_secs: u64,
    },

    /// List libraries and their directories
    Libraries {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Rewrite the write-ahead log as a single snapshot of live data
    Checkpoint,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Init { name } => {
            let path = cli.path.ok_or("Database path required for init")?;
            commands::init::run(&path, name)?;
        }
        Commands::Status { format } => {
            let path = cli.path.ok_or("Database path required for status")?;
            commands::status::run(&path, &format)?;
        }
        Commands::SweepTokens { max_age_secs } => {
            let path = cli.path.ok_or("Database path required for sweep-tokens")?;
            commands::sweep::run(&path, max_age_secs)?;
        }
        Commands::Libraries { format } => {
            let path = cli.path.ok_or("Database path required for libraries")?;
            commands::libraries::run(&path, &format)?;
        }
        Commands::Checkpoint => {
            let path = cli.path.ok_or("Database path required for checkpoint")?;
            commands::checkpoint::run(&path)?;
        }
        Commands::Version => {
            println!("ListenUp CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
