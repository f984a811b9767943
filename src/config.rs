use crate::errors::{NoCrmError, Result};
use std::fmt;
use std::time::Duration;

/// Default request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the NoCRM API.
///
/// Immutable once built. The base URL is derived from the subdomain unless
/// an explicit override is supplied through [`Config::with_base_url`].
#[derive(Clone, PartialEq)]
pub struct Config {
    api_key: String,
    subdomain: String,
    base_url: String,
    timeout_secs: u64,
}

impl Config {
    /// Creates a configuration for the given access token and tenant subdomain.
    ///
    /// # Errors
    ///
    /// Returns `NoCrmError::Configuration` when either value is empty.
    pub fn new(api_key: impl Into<String>, subdomain: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        let subdomain = subdomain.into();

        if api_key.is_empty() {
            return Err(NoCrmError::Configuration("API key is required".to_string()));
        }
        if subdomain.is_empty() {
            return Err(NoCrmError::Configuration("Subdomain is required".to_string()));
        }

        let base_url = format!("https://{}.nocrm.io/api/v2", subdomain);

        Ok(Self {
            api_key,
            subdomain,
            base_url,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Replaces the derived base URL with an explicit one.
    ///
    /// # Errors
    ///
    /// Returns `NoCrmError::Configuration` unless the URL starts with
    /// `http://` or `https://` and parses as an absolute URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(NoCrmError::Configuration(
                "Invalid base URL format".to_string(),
            ));
        }
        url::Url::parse(&base_url).map_err(|e| {
            NoCrmError::Configuration(format!("Invalid base URL format: {}", e))
        })?;

        self.base_url = base_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    /// Overrides the request timeout (seconds).
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Loads the configuration from the environment (and `.env`, if present).
    ///
    /// Reads `NOCRM_API_KEY`, `NOCRM_SUBDOMAIN`, and optionally
    /// `NOCRM_BASE_URL` and `NOCRM_TIMEOUT`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = env_var("NOCRM_API_KEY").ok_or_else(|| {
            NoCrmError::Configuration("NOCRM_API_KEY environment variable required".to_string())
        })?;
        let subdomain = env_var("NOCRM_SUBDOMAIN").ok_or_else(|| {
            NoCrmError::Configuration(
                "NOCRM_SUBDOMAIN environment variable required".to_string(),
            )
        })?;

        let mut config = Self::new(api_key, subdomain)?;

        if let Some(base_url) = env_var("NOCRM_BASE_URL") {
            config = config.with_base_url(base_url)?;
        }
        if let Some(timeout) = env_var("NOCRM_TIMEOUT") {
            let secs = timeout.parse::<u64>().map_err(|_| {
                NoCrmError::Configuration("NOCRM_TIMEOUT must be a whole number of seconds".to_string())
            })?;
            config = config.with_timeout(secs);
        }

        // Never log the key itself
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("NoCRM Base URL: {}", config.base_url);
        tracing::debug!("Request timeout: {}s", config.timeout_secs);

        Ok(config)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn subdomain(&self) -> &str {
        &self.subdomain
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"[REDACTED]")
            .field("subdomain", &self.subdomain)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}
