//! Bearer token sources
//!
//! The mirror does not run an OAuth flow. It consumes an already-issued
//! access token, looked up in this order:
//!
//! 1. `remote.access_token_file` (trimmed file contents)
//! 2. The environment variable named by `remote.access_token_env`

use std::path::Path;

use drivemirror_core::config::RemoteConfig;
use tracing::debug;

use crate::DriveError;

/// Loads the access token configured in `config`
///
/// # Errors
/// Returns [`DriveError::MissingToken`] when no source yields a non-empty token
pub fn load_access_token(config: &RemoteConfig) -> Result<String, DriveError> {
    resolve_access_token(
        config.access_token_file.as_deref(),
        &config.access_token_env,
        |var| std::env::var(var).ok(),
    )
}

fn resolve_access_token(
    file: Option<&Path>,
    env_var: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, DriveError> {
    if let Some(file) = file {
        let content = std::fs::read_to_string(file).map_err(|e| {
            DriveError::MissingToken(format!("cannot read {}: {e}", file.display()))
        })?;
        let token = content.trim();
        if token.is_empty() {
            return Err(DriveError::MissingToken(format!(
                "{} is empty",
                file.display()
            )));
        }
        debug!(file = %file.display(), "Using access token from file");
        return Ok(token.to_string());
    }

    match lookup(env_var) {
        Some(value) if !value.trim().is_empty() => {
            debug!(env_var, "Using access token from environment");
            Ok(value.trim().to_string())
        }
        _ => Err(DriveError::MissingToken(format!(
            "set {env_var} or remote.access_token_file"
        ))),
    }
}
