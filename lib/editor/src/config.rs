//! Editor configuration.
//!
//! Loaded via the `config` crate from `PAGECRAFT__`-prefixed environment
//! variables, e.g. `PAGECRAFT__API__BASE_URL` or
//! `PAGECRAFT__EXECUTION__POLL_INTERVAL_MS`.

use serde::Deserialize;
use std::time::Duration;

/// Editor configuration composed from the backend and execution sections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditorConfig {
    /// Workflow backend connection.
    #[serde(default)]
    pub api: ApiConfig,

    /// Execution driver timing.
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Workflow backend connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL the workflow endpoints hang off, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every request.
    #[serde(default)]
    pub token: Option<String>,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl ApiConfig {
    /// Returns the request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Execution driver timing.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Interval between backend status polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Percentage added per simulated tick for unsaved workflows.
    #[serde(default = "default_simulated_step")]
    pub simulated_step: u8,

    /// Interval between simulated ticks, in milliseconds.
    #[serde(default = "default_simulated_tick_ms")]
    pub simulated_tick_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_simulated_step() -> u8 {
    10
}

fn default_simulated_tick_ms() -> u64 {
    200
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            simulated_step: default_simulated_step(),
            simulated_tick_ms: default_simulated_tick_ms(),
        }
    }
}

impl ExecutionConfig {
    /// Returns the backend poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the simulated tick interval.
    #[must_use]
    pub fn simulated_tick(&self) -> Duration {
        Duration::from_millis(self.simulated_tick_ms)
    }
}

/// `PAGECRAFT__SECTION__KEY` variables, values parsed into numbers where
/// they look like one.
fn environment() -> config::Environment {
    config::Environment::with_prefix("PAGECRAFT")
        .separator("__")
        .try_parsing(true)
}

impl EditorConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(environment())
    }

    fn from_environment(source: config::Environment) -> Result<Self, config::ConfigError> {
        Self::from_config(config::Config::builder().add_source(source).build()?)
    }

    /// Deserializes configuration from an already-built source.
    ///
    /// # Errors
    ///
    /// Returns an error if a value has the wrong type.
    pub fn from_config(config: config::Config) -> Result<Self, config::ConfigError> {
        config.try_deserialize()
    }
}
