//! Startup checks for external commands

use crate::error::{Result, SyncError};
use tracing::debug;

/// Commands the pipeline shells out to
pub const REQUIRED_COMMANDS: &[&str] = &["git"];

/// Fail with every missing command if any of `commands` is not on `PATH`
pub fn check_commands(commands: &[&str]) -> Result<()> {
    let missing: Vec<String> = commands
        .iter()
        .filter(|name| match which::which(name) {
            Ok(found) => {
                debug!(command = %name, path = %found.display(), "Found dependency");
                false
            }
            Err(_) => true,
        })
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SyncError::MissingDependency(missing))
    }
}
