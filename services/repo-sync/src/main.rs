//! GitHub App Repository Sync
//!
//! Clones or refreshes a repository using a GitHub App installation token.
//!
//! ## Usage
//! ```bash
//! # Sync using variables from the environment or ./.env
//! APP_ID=123456 REPO_OWNER=lornu-ai REPO_NAME=lornu.ai repo-sync
//!
//! # Same, with a JSON summary on stdout
//! repo-sync sync --format json
//!
//! # Only print an installation token
//! repo-sync token --output ./token.txt
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use github_repo_sync::config::{Config, DEFAULT_ENV_FILE};
use github_repo_sync::preflight::{check_commands, REQUIRED_COMMANDS};
use github_repo_sync::{AppClient, Pipeline};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// GitHub App Repository Sync
#[derive(Parser, Debug)]
#[command(name = "repo-sync")]
#[command(about = "Clone or refresh a repository with a GitHub App installation token")]
#[command(version)]
struct Cli {
    /// dotenv-style file read before validation, if it exists
    #[arg(long, env = "REPO_SYNC_ENV_FILE", default_value = DEFAULT_ENV_FILE, global = true)]
    env_file: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log line format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone or refresh the repository (default)
    Sync {
        /// Summary format on stdout
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print an installation access token without touching the checkout
    Token {
        /// Output format
        #[arg(long, value_enum, default_value = "token")]
        format: TokenFormat,

        /// Output file path (prints to stdout if not specified)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TokenFormat {
    /// The bare token
    Token,
    /// JSON with installation id and expiry
    Json,
}

#[derive(Serialize)]
struct TokenOutput {
    token: String,
    installation_id: u64,
    expires_at: Option<DateTime<Utc>>,
}

fn init_logging(verbose: bool, format: LogFormat) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn write_token_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .with_context(|| format!("Failed to write token to {}", path.display()))?;
    // Set restrictive permissions on the token file
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);
    check_commands(REQUIRED_COMMANDS)?;

    let config = Config::load(&cli.env_file).context("Invalid configuration")?;
    info!(repository = %config.full_name(), app_id = %config.app_id, "Configuration loaded");

    let api = AppClient::new(config.api_url.clone());
    let mut pipeline = Pipeline::new(&config, &api);

    match cli.command.unwrap_or(Commands::Sync {
        format: OutputFormat::Text,
    }) {
        Commands::Sync { format } => {
            let outcome = pipeline.sync().await?;

            match format {
                OutputFormat::Text => println!("{}", outcome.display()),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&outcome).context("Failed to serialize result")?
                ),
            }
            info!(action = %outcome.action, path = %outcome.path.display(), "Sync complete");
        }

        Commands::Token { format, output } => {
            let issued = pipeline.issue_token().await?;

            let rendered = match format {
                TokenFormat::Json => serde_json::to_string_pretty(&TokenOutput {
                    token: issued.token.token.clone(),
                    installation_id: issued.installation_id,
                    expires_at: issued.token.expires_at,
                })?,
                TokenFormat::Token => issued.token.token.clone(),
            };

            if let Some(path) = output {
                write_token_file(&path, &rendered)?;
                info!(path = %path.display(), "Token saved");
            } else {
                println!("{}", rendered);
                info!(expires_at = ?issued.token.expires_at, "Token generated");
            }
        }
    }

    Ok(())
}
