//! Sync pipeline
//!
//! Drives one run through
//! `Unconfigured -> Configured -> Authenticated -> Authorized -> TokenIssued -> Synced`.
//! Transitions only move forward; any error ends the run where it happened.

use crate::auth::generate_jwt;
use crate::config::Config;
use crate::error::Result;
use crate::git::{clone_url, sync_repository, SyncAction};
use crate::github::{exchange_token, resolve_installation, GitHubApi, InstallationToken};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::info;

/// Pipeline progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Unconfigured,
    Configured,
    /// App JWT signed
    Authenticated,
    /// Installation id resolved
    Authorized,
    TokenIssued,
    Synced,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Unconfigured => "unconfigured",
            Stage::Configured => "configured",
            Stage::Authenticated => "authenticated",
            Stage::Authorized => "authorized",
            Stage::TokenIssued => "token-issued",
            Stage::Synced => "synced",
        };
        f.write_str(name)
    }
}

/// Token obtained for an installation
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub installation_id: u64,
    pub token: InstallationToken,
}

/// Summary of a completed sync
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub repository: String,
    pub action: SyncAction,
    pub path: PathBuf,
    pub branch: String,
    pub installation_id: u64,
    pub token_expires_at: Option<DateTime<Utc>>,
}

impl SyncOutcome {
    /// Format the result for display
    pub fn display(&self) -> String {
        format!(
            "Repository {} {} at {} (branch: {}, installation: {})",
            self.repository,
            self.action,
            self.path.display(),
            self.branch,
            self.installation_id
        )
    }
}

pub struct Pipeline<'a> {
    config: &'a Config,
    api: &'a dyn GitHubApi,
    stage: Stage,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, api: &'a dyn GitHubApi) -> Self {
        let mut pipeline = Self {
            config,
            api,
            stage: Stage::Unconfigured,
        };
        pipeline.advance(Stage::Configured);
        pipeline
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(next > self.stage, "stage {} -> {} goes backwards", self.stage, next);
        info!(from = %self.stage, to = %next, "Pipeline stage");
        self.stage = next;
    }

    /// Sign the App JWT, resolve the installation and exchange for a token
    pub async fn issue_token(&mut self) -> Result<IssuedToken> {
        info!(app_id = %self.config.app_id, "Generating JWT for GitHub App");
        let jwt = generate_jwt(&self.config.app_id, &self.config.private_key_path)?;
        self.advance(Stage::Authenticated);

        let installation_id = resolve_installation(self.api, &jwt, &self.config.repo_owner).await?;
        self.advance(Stage::Authorized);

        info!(installation_id, "Exchanging JWT for installation token");
        let token = exchange_token(self.api, &jwt, installation_id).await?;
        self.advance(Stage::TokenIssued);

        Ok(IssuedToken {
            installation_id,
            token,
        })
    }

    /// Run the whole pipeline and sync the checkout
    pub async fn sync(mut self) -> Result<SyncOutcome> {
        let issued = self.issue_token().await?;
        let config = self.config;

        let url = clone_url(
            &config.server_url,
            &config.repo_owner,
            &config.repo_name,
            &issued.token.token,
        );
        let action = sync_repository(
            &config.checkout_dir,
            &url,
            &config.branch,
            &issued.token.token,
        )
        .await?;
        self.advance(Stage::Synced);

        Ok(SyncOutcome {
            repository: config.full_name(),
            action,
            path: config.checkout_dir.clone(),
            branch: config.branch.clone(),
            installation_id: issued.installation_id,
            token_expires_at: issued.token.expires_at,
        })
    }
}
