//! GitHub App API
//!
//! Installation lookup and token exchange. The HTTP transport sits behind
//! [`GitHubApi`]; the selection and parsing rules are plain functions so
//! they can be checked against canned responses.

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

const USER_AGENT: &str = "lornu-ai-repo-sync";
const API_VERSION: &str = "2022-11-28";

/// An App installation as returned by `GET /app/installations`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub id: u64,
    pub account: Option<Account>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub login: String,
}

/// Short-lived installation access token
#[derive(Clone, PartialEq, Eq)]
pub struct InstallationToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for InstallationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallationToken")
            .field("token", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Transport for the two App endpoints the pipeline needs
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// List the App's installations
    async fn list_installations(&self, jwt: &str) -> Result<Vec<Installation>>;

    /// Request an access token; returns the raw response body
    async fn create_access_token(&self, jwt: &str, installation_id: u64) -> Result<String>;
}

/// Pick the installation whose account login equals `owner`
pub fn find_installation(installations: &[Installation], owner: &str) -> Result<u64> {
    installations
        .iter()
        .find(|inst| inst.account.as_ref().is_some_and(|a| a.login == owner))
        .map(|inst| inst.id)
        .ok_or_else(|| SyncError::InstallationNotFound {
            owner: owner.to_string(),
        })
}

/// Extract the token from an access-token response body.
///
/// A body that is not JSON, or whose `token` is absent, `null`, or not a
/// non-empty string, fails with the raw body attached.
pub fn parse_access_token(body: &str) -> Result<InstallationToken> {
    let fail = || SyncError::TokenExchange {
        response: body.to_string(),
    };

    let value: serde_json::Value = serde_json::from_str(body).map_err(|_| fail())?;

    let token = value
        .get("token")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .ok_or_else(fail)?;

    let expires_at = value
        .get("expires_at")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(InstallationToken {
        token: token.to_string(),
        expires_at,
    })
}

/// Resolve the installation id for `owner`
pub async fn resolve_installation(api: &dyn GitHubApi, jwt: &str, owner: &str) -> Result<u64> {
    let installations = api.list_installations(jwt).await?;
    debug!(count = installations.len(), "Fetched App installations");

    let id = find_installation(&installations, owner)?;
    info!(installation_id = id, owner = %owner, "Resolved installation");
    Ok(id)
}

/// Exchange the App JWT for an installation access token
pub async fn exchange_token(
    api: &dyn GitHubApi,
    jwt: &str,
    installation_id: u64,
) -> Result<InstallationToken> {
    let body = api.create_access_token(jwt, installation_id).await?;
    parse_access_token(&body)
}

/// reqwest-backed client for the GitHub REST API
pub struct AppClient {
    http: Client,
    api_url: String,
}

impl AppClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.into(),
        }
    }

    fn request(&self, method: Method, path: &str, jwt: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_url, path))
            .header("Authorization", format!("Bearer {}", jwt))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }
}

#[async_trait]
impl GitHubApi for AppClient {
    async fn list_installations(&self, jwt: &str) -> Result<Vec<Installation>> {
        let response = self
            .request(Method::GET, "/app/installations?per_page=100", jwt)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Api { status, body });
        }

        Ok(response.json::<Vec<Installation>>().await?)
    }

    async fn create_access_token(&self, jwt: &str, installation_id: u64) -> Result<String> {
        let path = format!("/app/installations/{}/access_tokens", installation_id);
        let response = self.request(Method::POST, &path, jwt).send().await?;

        debug!(status = %response.status(), "Access token response");
        Ok(response.text().await?)
    }
}
