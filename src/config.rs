//! Client configuration.
//!
//! Built in code with [`ClientConfig::new`] or read from the environment
//! (`OCR_API_KEY`, `OCR_BASE_URL`, `OCR_USER_AGENT`, `OCR_TIMEOUT_SECS`).

use crate::error::{OcrError, Result};
use std::env;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.leapocr.com/api/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn default_user_agent() -> String {
    format!("ocr-waiter/{}", env!("CARGO_PKG_VERSION"))
}

/// Connection settings for [`OcrClient`](crate::OcrClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    /// Base URL without a trailing slash.
    pub base_url: String,
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: default_user_agent(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Read configuration from environment variables. Only `OCR_API_KEY` is required.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OCR_API_KEY")
            .map_err(|_| OcrError::InvalidConfig("OCR_API_KEY not set".to_string()))?;
        let mut config = Self::new(api_key);

        if let Ok(base_url) = env::var("OCR_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        if let Ok(user_agent) = env::var("OCR_USER_AGENT") {
            config = config.with_user_agent(user_agent);
        }
        if let Ok(secs) = env::var("OCR_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                OcrError::InvalidConfig(format!("OCR_TIMEOUT_SECS is not a number: {secs:?}"))
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        debug!("Loaded client config: base_url={}", config.base_url);
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(OcrError::InvalidConfig("API key is required".to_string()));
        }
        let host = self
            .base_url
            .strip_prefix("https://")
            .or_else(|| self.base_url.strip_prefix("http://"));
        if host.map_or(true, str::is_empty) {
            return Err(OcrError::InvalidConfig(format!(
                "base URL must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(OcrError::InvalidConfig("timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}
