//! GitHub App Repository Sync
//!
//! Authenticates as a GitHub App, obtains an installation access token for
//! the account that owns a repository, and clones or refreshes a local
//! checkout of that repository.
//!
//! ## Pipeline
//!
//! 1. [`config`]: load `APP_ID`, `REPO_OWNER`, `REPO_NAME`, `PRIVATE_KEY_PATH`
//!    from the environment and an optional `.env` file
//! 2. [`auth`]: sign an RS256 JWT with the App private key
//! 3. [`github`]: find the installation for `REPO_OWNER` and exchange the JWT
//!    for an installation token
//! 4. [`git`]: clone with the token, or reset and clean an existing checkout
//!
//! ## Example
//!
//! ```bash
//! APP_ID=123456 \
//! REPO_OWNER=lornu-ai \
//! REPO_NAME=lornu.ai \
//! PRIVATE_KEY_PATH=./key.pem \
//! repo-sync
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod pipeline;
pub mod preflight;

pub use config::Config;
pub use error::{ConfigError, Result, SyncError};
pub use github::{AppClient, GitHubApi, InstallationToken};
pub use pipeline::{Pipeline, Stage, SyncOutcome};
