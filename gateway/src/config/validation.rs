use super::{ConfigError, ServerConfig};

pub(super) fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.port == 0 {
        return Err(ConfigError::InvalidValue {
            name: "PORT",
            reason: "port must be non-zero".to_string(),
        });
    }

    if config.idle_poll_seconds == 0 {
        return Err(ConfigError::InvalidValue {
            name: "IDLE_POLL_SECONDS",
            reason: "poll interval must be at least one second".to_string(),
        });
    }

    if config.idle_poll_seconds > config.idle_timeout_seconds {
        return Err(ConfigError::InvalidValue {
            name: "IDLE_POLL_SECONDS",
            reason: format!(
                "poll interval {}s exceeds idle timeout {}s",
                config.idle_poll_seconds, config.idle_timeout_seconds
            ),
        });
    }

    if let Some(url) = &config.signal_store_url {
        let supported = ["memory://", "redis://", "rediss://"];
        if !supported.iter().any(|scheme| url.starts_with(scheme)) {
            return Err(ConfigError::InvalidValue {
                name: "REDIS_URL",
                reason: format!("unsupported store scheme in {url:?}"),
            });
        }
    }

    Ok(())
}
