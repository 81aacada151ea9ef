use crate::Result;
use crate::facts::file_cache::state_dir;
use crate::facts::launchpad::{DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE};
use crate::facts::memory_cache::DEFAULT_CAPACITY;
use crate::facts::resilient_http::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_STEP};
use crate::facts::{DEFAULT_FRESHNESS_WINDOW, RetryPolicy};
use camino::Utf8PathBuf;
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use url::Url;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// Name of the configuration file looked up in `<home>/.ppastats`
const CONFIG_FILE_NAME: &str = "ppastats.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root of the Launchpad web service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Publications requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Retries of a request answered with a retryable server error
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Increment of the linear backoff between retries
    #[serde(default = "default_retry_delay_step", with = "humantime_serde")]
    pub retry_delay_step: Duration,

    /// Download totals of days younger than this are not saved
    #[serde(default = "default_freshness_window", with = "humantime_serde")]
    pub freshness_window: Duration,

    /// Maximum number of series metadata entries kept in memory
    #[serde(default = "default_memory_cache_capacity")]
    pub memory_cache_capacity: usize,

    /// User agent sent with every request (default is `ppastats/<version>`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

const fn default_retry_delay_step() -> Duration {
    DEFAULT_RETRY_DELAY_STEP
}

const fn default_freshness_window() -> Duration {
    DEFAULT_FRESHNESS_WINDOW
}

const fn default_memory_cache_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Config {
    /// Load configuration from the given file, from `<home>/.ppastats/ppastats.toml`, or use
    /// defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or holds invalid values
    pub fn load(config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading ppastats configuration file '{path}'"))?;
            return Self::parse(&text, path.as_std_path());
        }

        let path = match state_dir() {
            Ok(dir) => dir.join(CONFIG_FILE_NAME),
            Err(e) => {
                log::debug!("No home directory, using default configuration: {e}");
                return Ok(Self::default());
            }
        };

        match fs::read_to_string(&path) {
            Ok(text) => Self::parse(&text, &path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).into_app_err_with(|| format!("reading ppastats configuration file '{}'", path.display())),
        }
    }

    fn parse(text: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(text).into_app_err_with(|| format!("parsing configuration file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an HTTP(S) URL or a limit is zero
    fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url).into_app_err_with(|| format!("base_url '{}' is not a valid URL", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(app_err!("base_url must be an http or https URL, got '{}'", self.base_url));
        }

        if self.memory_cache_capacity == 0 {
            return Err(app_err!("memory_cache_capacity must be at least 1"));
        }

        if self.freshness_window.is_zero() {
            return Err(app_err!("freshness_window must be greater than zero"));
        }

        Ok(())
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_delay_step)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            max_retries: default_max_retries(),
            retry_delay_step: default_retry_delay_step(),
            freshness_window: default_freshness_window(),
            memory_cache_capacity: default_memory_cache_capacity(),
            user_agent: None,
        }
    }
}
