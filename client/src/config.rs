//! Client configuration from the environment.

use std::{env, path::PathBuf, time::Duration};

use url::Url;

use crate::error::ClientError;

/// API base used when `BLOGDESK_API_BASE` is unset.
pub const DEFAULT_API_BASE: &str = "https://api.theplayersrising.com/";
/// Route the user is sent to when the session cannot be refreshed.
pub const LOGIN_ROUTE: &str = "/login";

const DEFAULT_DATA_DIR: &str = "./.blogdesk";
const DEFAULT_AUTOSAVE_MS: u64 = 2000;
const MIN_AUTOSAVE_MS: u64 = 200;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Settings of one client instance.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL every API path is joined onto. Always ends with `/`.
    pub api_base: Url,
    /// Root of the local key/value store (tokens, drafts).
    pub data_dir: PathBuf,
    /// Quiet period before a scheduled autosave runs.
    pub autosave_delay: Duration,
    /// Timeout applied to every HTTP request.
    pub http_timeout: Duration,
}

impl ClientConfig {
    /// Reads `BLOGDESK_*` variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ClientError> {
        let api_base = env::var("BLOGDESK_API_BASE")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let data_dir = env::var("BLOGDESK_DATA_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let autosave_ms = env::var("BLOGDESK_AUTOSAVE_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_AUTOSAVE_MS)
            .max(MIN_AUTOSAVE_MS);
        let timeout_secs = env::var("BLOGDESK_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
            .max(1);

        Ok(Self {
            api_base: parse_api_base(&api_base)?,
            data_dir,
            autosave_delay: Duration::from_millis(autosave_ms),
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Replaces the API base, e.g. from a command-line flag.
    pub fn with_api_base(mut self, raw: &str) -> Result<Self, ClientError> {
        self.api_base = parse_api_base(raw)?;
        Ok(self)
    }

    /// Overrides the data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }
}

/// Parses a base URL, appending the trailing slash `Url::join` needs to
/// keep the last path segment.
pub fn parse_api_base(raw: &str) -> Result<Url, ClientError> {
    let raw = raw.trim();
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&normalized)
        .map_err(|err| ClientError::InvalidInput(format!("invalid API base `{raw}`: {err}")))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::InvalidInput(format!("API base `{raw}` cannot be used as a base URL")));
    }
    Ok(url)
}
