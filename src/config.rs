//! Client configuration: the API origin, the per-request deadline and the
//! optional state directory holding the persisted access token.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use reqwest::Url;

/// Single required environment input: the backend API origin.
pub const ENV_API_URL: &str = "BRIGHTAFRICA_API_URL";
pub const ENV_TIMEOUT_MS: &str = "BRIGHTAFRICA_TIMEOUT_MS";
pub const ENV_STATE_DIR: &str = "BRIGHTAFRICA_STATE_DIR";

/// Matches the request deadline the web client shipped with.
pub const DEFAULT_TIMEOUT_MS: u64 = 8_000;

// Default token location when the caller does not pick one: ~/.brightafrica.
static DEFAULT_STATE_DIR: Lazy<Option<PathBuf>> = Lazy::new(|| {
    std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".brightafrica"))
});

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub timeout: Duration,
    /// Where the access token is persisted; `None` disables persistence.
    pub state_dir: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new(base: &str) -> Result<Self> {
        let base_url = Url::parse(base).context("invalid base URL")?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(anyhow!("unsupported API scheme: {}", base_url.scheme()));
        }
        Ok(Self {
            base_url,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            state_dir: DEFAULT_STATE_DIR.clone(),
        })
    }

    /// Build from the environment; `BRIGHTAFRICA_API_URL` is required.
    pub fn from_env() -> Result<Self> {
        let base = std::env::var(ENV_API_URL)
            .map_err(|_| anyhow!("{} is not set", ENV_API_URL))?;
        let mut cfg = Self::new(&base)?;
        if let Ok(ms) = std::env::var(ENV_TIMEOUT_MS) {
            let ms: u64 = ms.parse().with_context(|| format!("invalid {}", ENV_TIMEOUT_MS))?;
            cfg.timeout = Duration::from_millis(ms);
        }
        if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
            cfg.state_dir = Some(PathBuf::from(dir));
        }
        Ok(cfg)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = Some(dir.into());
        self
    }

    /// Disable token persistence entirely (ephemeral session).
    pub fn without_persistence(mut self) -> Self {
        self.state_dir = None;
        self
    }

    /// Resolve an endpoint path against the configured origin. Plain string
    /// joining, because `Url::join` would drop a path prefix on the origin
    /// (e.g. `https://host/api`) for absolute endpoint paths.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}
