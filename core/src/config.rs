//! Client configuration.

use std::env;

use thiserror::Error;
use url::Url;

pub const BASE_URL_VAR: &str = "TROVEBOX_BASE_URL";
pub const USER_AGENT_VAR: &str = "TROVEBOX_USER_AGENT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("missing environment variable {0}")]
    MissingVar(&'static str),
}

/// Where the service lives and how this client identifies itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: Option<String>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Read `TROVEBOX_BASE_URL` and, optionally, `TROVEBOX_USER_AGENT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var(BASE_URL_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingVar(BASE_URL_VAR))?;
        let user_agent = env::var(USER_AGENT_VAR).ok().filter(|v| !v.trim().is_empty());
        Ok(Self { base_url, user_agent })
    }

    pub(crate) fn parse_base_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason,
        };
        let url = Url::parse(self.base_url.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("base URL must not carry a query or fragment".to_string()));
        }
        Ok(url)
    }
}
