//! Client configuration.
//!
//! Defaults: a 60 second transport timeout and a computed `User-Agent` of the
//! form `api-request/<version> (<os>; <arch>)`. Either can be overridden in
//! code, through serde (`timeout_secs`, `user_agent`), or through the
//! `API_REQUEST_TIMEOUT_SECS` / `API_REQUEST_USER_AGENT` environment variables.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub const TIMEOUT_ENV: &str = "API_REQUEST_TIMEOUT_SECS";
pub const USER_AGENT_ENV: &str = "API_REQUEST_USER_AGENT";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    #[serde(rename = "timeout_secs", deserialize_with = "duration_from_secs")]
    pub timeout: Duration,
    /// Replaces the computed `User-Agent` when set.
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }
}

impl ClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Defaults overlaid with the environment. Unparseable values are logged
    /// and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => config.timeout = Duration::from_secs(secs),
                Err(err) => tracing::warn!("ignoring {TIMEOUT_ENV}={raw:?}: {err}"),
            }
        }
        if let Some(ua) = lookup(USER_AGENT_ENV).filter(|ua| !ua.trim().is_empty()) {
            config.user_agent = Some(ua);
        }
        config
    }

    /// The `User-Agent` sent with every request.
    pub fn user_agent(&self) -> String {
        self.user_agent.clone().unwrap_or_else(default_user_agent)
    }
}

fn default_user_agent() -> String {
    format!(
        "api-request/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

fn duration_from_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}
