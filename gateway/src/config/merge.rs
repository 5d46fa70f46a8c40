//! Merge YAML values over environment variables over defaults.

use std::path::PathBuf;

use super::env::{parse, var};
use super::yaml::YamlConfig;
use super::{ConfigError, ServerConfig};
use crate::core::realtime::openai::DEFAULT_REALTIME_MODEL;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5050;
const DEFAULT_VOICE: &str = "alloy";
const DEFAULT_KNOWLEDGE_BASE_URL: &str = "https://app.customgpt.ai";
const DEFAULT_KNOWLEDGE_MAX_RETRIES: u32 = 2;
const DEFAULT_KNOWLEDGE_RETRY_DELAY_MS: u64 = 2000;
const DEFAULT_KNOWLEDGE_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_SIGNAL_TTL_SECONDS: u64 = 3600;
const DEFAULT_IDLE_TIMEOUT_SECONDS: u64 = 40;
const DEFAULT_IDLE_POLL_SECONDS: u64 = 5;
const DEFAULT_STATIC_DIR: &str = "static";
const DEFAULT_THINKING_SOUND: &str = "static/typing.wav";

pub(super) fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, ConfigError> {
    let yaml = yaml.unwrap_or_default();
    let server = yaml.server.unwrap_or_default();
    let realtime = yaml.realtime.unwrap_or_default();
    let knowledge = yaml.knowledge.unwrap_or_default();
    let signals = yaml.signals.unwrap_or_default();
    let call = yaml.call.unwrap_or_default();
    let assets = yaml.assets.unwrap_or_default();

    let openai_api_key = realtime
        .api_key
        .filter(|k| !k.is_empty())
        .or_else(|| var("OPENAI_API_KEY"))
        .ok_or(ConfigError::MissingVar("OPENAI_API_KEY"))?;

    Ok(ServerConfig {
        host: server
            .host
            .or_else(|| var("HOST"))
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: match server.port {
            Some(port) => port,
            None => parse("PORT")?.unwrap_or(DEFAULT_PORT),
        },
        public_host: server.public_host.or_else(|| var("PUBLIC_HOST")),

        openai_api_key,
        realtime_model: realtime
            .model
            .or_else(|| var("OPENAI_REALTIME_MODEL"))
            .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string()),
        realtime_voice: realtime
            .voice
            .or_else(|| var("OPENAI_REALTIME_VOICE"))
            .unwrap_or_else(|| DEFAULT_VOICE.to_string()),

        knowledge_api_key: knowledge.api_key.or_else(|| var("CUSTOMGPT_API_KEY")),
        knowledge_base_url: knowledge
            .base_url
            .or_else(|| var("CUSTOMGPT_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_KNOWLEDGE_BASE_URL.to_string()),
        knowledge_max_retries: match knowledge.max_retries {
            Some(n) => n,
            None => parse("KNOWLEDGE_MAX_RETRIES")?.unwrap_or(DEFAULT_KNOWLEDGE_MAX_RETRIES),
        },
        knowledge_retry_delay_ms: match knowledge.retry_delay_ms {
            Some(ms) => ms,
            None => parse("KNOWLEDGE_RETRY_DELAY_MS")?.unwrap_or(DEFAULT_KNOWLEDGE_RETRY_DELAY_MS),
        },
        knowledge_timeout_seconds: match knowledge.timeout_seconds {
            Some(s) => s,
            None => {
                parse("KNOWLEDGE_TIMEOUT_SECONDS")?.unwrap_or(DEFAULT_KNOWLEDGE_TIMEOUT_SECONDS)
            }
        },

        signal_store_url: signals.url.or_else(|| var("REDIS_URL")),
        signal_ttl_seconds: match signals.ttl_seconds {
            Some(s) => s,
            None => parse("SIGNAL_TTL_SECONDS")?.unwrap_or(DEFAULT_SIGNAL_TTL_SECONDS),
        },

        callback_phone_number: call
            .callback_phone_number
            .or_else(|| var("PERSONAL_PHONE_NUMBER")),
        idle_timeout_seconds: match call.idle_timeout_seconds {
            Some(s) => s,
            None => parse("IDLE_TIMEOUT_SECONDS")?.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECONDS),
        },
        idle_poll_seconds: match call.idle_poll_seconds {
            Some(s) => s,
            None => parse("IDLE_POLL_SECONDS")?.unwrap_or(DEFAULT_IDLE_POLL_SECONDS),
        },

        static_dir: PathBuf::from(
            assets
                .static_dir
                .or_else(|| var("STATIC_DIR"))
                .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()),
        ),
        thinking_sound_path: PathBuf::from(
            assets
                .thinking_sound_path
                .or_else(|| var("THINKING_SOUND_PATH"))
                .unwrap_or_else(|| DEFAULT_THINKING_SOUND.to_string()),
        ),
    })
}
