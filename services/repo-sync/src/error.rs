//! Error types for the sync pipeline

use thiserror::Error;

/// Problems with the pipeline configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more required variables are unset or empty
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    /// The dotenv file exists but could not be parsed
    #[error("Invalid env file {path} at line {line}: {message}")]
    EnvFile {
        path: String,
        line: usize,
        message: String,
    },
}

/// Errors that can occur while authenticating and syncing
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Required external commands are not on PATH
    #[error("Missing required commands on PATH: {}", .0.join(", "))]
    MissingDependency(Vec<String>),

    /// The private key could not be read or used for RS256
    #[error("JWT signing failed: {0}")]
    Signing(String),

    /// No installation of the App belongs to the owner
    #[error("No GitHub App installation found for account '{owner}'")]
    InstallationNotFound { owner: String },

    /// The access token response had no usable `token` field
    #[error("Failed to obtain installation token. Response: {response}")]
    TokenExchange { response: String },

    /// The GitHub API answered with a non-success status
    #[error("GitHub API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A git subprocess exited unsuccessfully
    #[error("{command} failed: {stderr}")]
    Git { command: String, stderr: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
