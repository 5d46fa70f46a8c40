//! Server configuration.
//!
//! Configuration is assembled once at startup from, in priority order:
//! a YAML file (when `-c/--config` is given), environment variables
//! (`.env` is loaded into the environment by `main`), and defaults.
//! Only `OPENAI_API_KEY` is mandatory; without it the process refuses to start.

mod env;
mod merge;
mod validation;
mod yaml;

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

pub use yaml::YamlConfig;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Process-wide configuration, immutable after startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Host used in generated stream and redirect URLs; falls back to the
    /// request's `Host` header when unset
    pub public_host: Option<String>,

    pub openai_api_key: String,
    pub realtime_model: String,
    pub realtime_voice: String,

    /// Default CustomGPT credential when the webhook does not carry one
    pub knowledge_api_key: Option<String>,
    pub knowledge_base_url: String,
    pub knowledge_max_retries: u32,
    pub knowledge_retry_delay_ms: u64,
    pub knowledge_timeout_seconds: u64,

    /// `redis://...` for a shared store, unset or `memory://` for in-process
    pub signal_store_url: Option<String>,
    pub signal_ttl_seconds: u64,

    /// Number dialed when a call ends without a hangup disposition
    pub callback_phone_number: Option<String>,
    pub idle_timeout_seconds: u64,
    pub idle_poll_seconds: u64,

    pub static_dir: PathBuf,
    pub thinking_sound_path: PathBuf,
}

impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.openai_api_key.zeroize();
        if let Some(ref mut key) = self.knowledge_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file, with environment variables
    /// filling whatever the file leaves out.
    ///
    /// # Example
    /// ```rust,no_run
    /// use phonebridge_gateway::config::ServerConfig;
    /// use std::path::Path;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ServerConfig::from_file(Path::new("config.yaml"))?;
    /// println!("Server listening on {}", config.address());
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml_config = YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as "host:port".
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    pub fn idle_poll_interval(&self) -> Duration {
        Duration::from_secs(self.idle_poll_seconds)
    }

    pub fn knowledge_retry_delay(&self) -> Duration {
        Duration::from_millis(self.knowledge_retry_delay_ms)
    }

    pub fn knowledge_timeout(&self) -> Duration {
        Duration::from_secs(self.knowledge_timeout_seconds)
    }

    pub fn signal_ttl(&self) -> Duration {
        Duration::from_secs(self.signal_ttl_seconds)
    }
}
