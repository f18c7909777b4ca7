//! Todo CLI
//!
//! Command-line transport for the todo item service.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use todo_core::{Config, ItemService, SqliteGateway};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "todo")]
#[command(about = "todo - a small item list kept in one local file")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all items
    #[command(alias = "ls")]
    List,
    /// Add a new item
    Add {
        /// Item content
        #[arg(required = true)]
        content: Vec<String>,
    },
    /// Delete an item
    #[command(alias = "rm")]
    Delete {
        /// Item ID
        id: u64,
    },
    /// Show store status
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, db_file, root_bucket, items_bucket, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key.clone(), value.clone(), config_path, &output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let gateway = SqliteGateway::open(config.database_path(), &config.layout())
        .with_context(|| format!("Failed to open store at {:?}", config.database_path()))?;
    let service = ItemService::new(gateway);

    match cli.command {
        Commands::List => commands::item::list(&service, &output),
        Commands::Add { content } => commands::item::add(&service, &content.join(" "), &output),
        Commands::Delete { id } => commands::item::delete(&service, id, &output),
        Commands::Status => commands::status::show(&service, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

/// Initialize logging
///
/// Only initializes if TODO_LOG environment variable is set.
/// Logs to config.log_file when set, otherwise stderr.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("TODO_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!("todo_core={},todo_cli={}", log_level, log_level));

    let Some(log_path) = config.log_file.clone() else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
        return;
    };

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("Logging initialized to {:?}", log_path);
}
