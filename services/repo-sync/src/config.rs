//! Pipeline configuration
//!
//! Values come from the process environment, with gaps filled from an
//! optional dotenv-style file. The file never overrides a variable that is
//! set to a non-blank value, and the process environment is never modified: lookups go
//! through an explicit source so the resulting [`Config`] is the only state
//! the pipeline sees.

use crate::error::ConfigError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default location of the App private key
pub const DEFAULT_PRIVATE_KEY_PATH: &str = "./private-key.pem";

/// Default dotenv file, relative to the working directory
pub const DEFAULT_ENV_FILE: &str = ".env";

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_SERVER_URL: &str = "https://github.com";
pub const DEFAULT_BRANCH: &str = "main";

/// Required variables, in the order they are reported when missing
const REQUIRED: [&str; 3] = ["APP_ID", "REPO_OWNER", "REPO_NAME"];

/// Immutable configuration for one sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// GitHub App ID (JWT issuer)
    pub app_id: String,
    /// Account that owns the repository and the App installation
    pub repo_owner: String,
    /// Repository name
    pub repo_name: String,
    /// Path to the App private key in PEM format
    pub private_key_path: PathBuf,
    /// REST API base URL
    pub api_url: String,
    /// Web base URL used to build the clone URL
    pub server_url: String,
    /// Branch the checkout is reset to
    pub branch: String,
    /// Local checkout directory
    pub checkout_dir: PathBuf,
}

impl Config {
    /// Load from the process environment, falling back to `env_file` if it exists
    pub fn load(env_file: &Path) -> Result<Self, ConfigError> {
        Self::load_with(env_file, |key| std::env::var(key).ok())
    }

    /// Load from `process`, falling back to `env_file` for variables that
    /// are unset or blank in `process`
    pub fn load_with<F>(env_file: &Path, process: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file_vars = read_env_file(env_file)?;
        Self::from_lookup(|key| {
            process(key)
                .filter(|value| !value.trim().is_empty())
                .or_else(|| file_vars.get(key).cloned())
        })
    }

    /// Build a config from an arbitrary variable source.
    ///
    /// Every missing required variable is collected before failing, so the
    /// error names all of them at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let missing: Vec<&'static str> = REQUIRED
            .iter()
            .copied()
            .filter(|&key| get(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let [app_id, repo_owner, repo_name] = REQUIRED.map(|key| get(key).unwrap_or_default());

        let checkout_dir = get("REPO_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(&repo_name));

        Ok(Self {
            private_key_path: get("PRIVATE_KEY_PATH")
                .unwrap_or_else(|| DEFAULT_PRIVATE_KEY_PATH.to_string())
                .into(),
            api_url: trim_slash(get("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into())),
            server_url: trim_slash(
                get("GITHUB_SERVER_URL").unwrap_or_else(|| DEFAULT_SERVER_URL.into()),
            ),
            branch: get("REPO_BRANCH").unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            checkout_dir,
            app_id,
            repo_owner,
            repo_name,
        })
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.repo_owner, self.repo_name)
    }
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// Read a dotenv file. A missing file yields no variables.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    if !path.is_file() {
        debug!(path = %path.display(), "No env file, using process environment only");
        return Ok(HashMap::new());
    }

    let contents = fs::read_to_string(path).map_err(|e| ConfigError::EnvFile {
        path: path.display().to_string(),
        line: 0,
        message: e.to_string(),
    })?;

    let vars = parse_env_file(&contents).map_err(|(line, message)| ConfigError::EnvFile {
        path: path.display().to_string(),
        line,
        message,
    })?;

    debug!(path = %path.display(), count = vars.len(), "Loaded env file");
    Ok(vars)
}

/// Parse dotenv contents into key/value pairs.
///
/// On failure returns the 1-based line number and a message.
pub fn parse_env_file(contents: &str) -> Result<HashMap<String, String>, (usize, String)> {
    let mut vars = HashMap::new();

    for (idx, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| (idx + 1, format!("expected KEY=VALUE, got '{}'", line)))?;

        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err((idx + 1, format!("invalid variable name '{}'", key)));
        }

        vars.insert(key.to_string(), unquote(value.trim()));
    }

    Ok(vars)
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    // Unquoted values may carry a trailing comment
    match value.find(" #") {
        Some(pos) => value[..pos].trim_end().to_string(),
        None => value.to_string(),
    }
}
