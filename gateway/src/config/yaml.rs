use serde::Deserialize;
use std::path::Path;

use super::ConfigError;

/// Complete YAML configuration structure
///
/// Every field is optional; whatever the file leaves out is taken from the
/// environment or defaults.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 5050
///   public_host: "calls.example.com"
///
/// realtime:
///   api_key: "sk-..."
///   model: "gpt-4o-realtime-preview-2024-10-01"
///   voice: "alloy"
///
/// knowledge:
///   api_key: "your-customgpt-key"
///   base_url: "https://app.customgpt.ai"
///   max_retries: 2
///   retry_delay_ms: 2000
///   timeout_seconds: 30
///
/// signals:
///   url: "redis://localhost:6379"
///   ttl_seconds: 3600
///
/// call:
///   callback_phone_number: "+15551234567"
///   idle_timeout_seconds: 40
///   idle_poll_seconds: 5
///
/// assets:
///   static_dir: "static"
///   thinking_sound_path: "static/typing.wav"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub realtime: Option<RealtimeYaml>,
    pub knowledge: Option<KnowledgeYaml>,
    pub signals: Option<SignalsYaml>,
    pub call: Option<CallYaml>,
    pub assets: Option<AssetsYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_host: Option<String>,
}

/// Realtime backend settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RealtimeYaml {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
}

/// Knowledge base (CustomGPT) settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct KnowledgeYaml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SignalsYaml {
    pub url: Option<String>,
    pub ttl_seconds: Option<u64>,
}

/// Per-call policy from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CallYaml {
    pub callback_phone_number: Option<String>,
    pub idle_timeout_seconds: Option<u64>,
    pub idle_poll_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AssetsYaml {
    pub static_dir: Option<String>,
    pub thinking_sound_path: Option<String>,
}

impl YamlConfig {
    /// Load and parse a YAML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&contents)?)
    }
}
