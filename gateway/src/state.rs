//! Process-wide dependencies, built once at startup and shared by handlers.

use std::path::Path;
use std::sync::Arc;

use base64::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::core::knowledge::{CustomGptApi, KnowledgeClient, KnowledgeError, RetryPolicy};
use crate::core::realtime::{BackendConnector, OpenAIRealtimeConnector, RealtimeError};
use crate::core::relay::persona::realtime_session;
use crate::core::relay::{RelayDeps, RelaySettings};
use crate::core::signal::{SignalStore, StoreError, create_signal_store};

/// Startup failures while assembling [`AppState`].
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),
}

pub struct AppState {
    pub config: ServerConfig,
    pub signals: Arc<dyn SignalStore>,
    pub knowledge: Arc<KnowledgeClient>,
    pub connector: Arc<dyn BackendConnector>,
    pub relay_settings: RelaySettings,
    /// Base64 payload of the thinking sound, when the file could be read
    pub thinking_sound: Option<Arc<str>>,
}

impl AppState {
    pub async fn new(config: ServerConfig) -> Result<Arc<Self>, StateError> {
        let signals =
            create_signal_store(config.signal_store_url.as_deref(), config.signal_ttl()).await?;

        let api = CustomGptApi::new(&config.knowledge_base_url, config.knowledge_timeout())?;
        let knowledge = KnowledgeClient::new(
            Arc::new(api),
            RetryPolicy::new(config.knowledge_max_retries, config.knowledge_retry_delay()),
        );

        let session = realtime_session(
            &config.openai_api_key,
            &config.realtime_model,
            &config.realtime_voice,
        );
        let connector = OpenAIRealtimeConnector::new(session)?;

        let thinking_sound = load_thinking_sound(&config.thinking_sound_path).await;

        Ok(Self::from_parts(
            config,
            Arc::new(connector),
            Arc::new(knowledge),
            signals,
            thinking_sound,
        ))
    }

    /// Assemble state from ready-made parts.
    pub fn from_parts(
        config: ServerConfig,
        connector: Arc<dyn BackendConnector>,
        knowledge: Arc<KnowledgeClient>,
        signals: Arc<dyn SignalStore>,
        thinking_sound: Option<Arc<str>>,
    ) -> Arc<Self> {
        let relay_settings = RelaySettings {
            idle_timeout: config.idle_timeout(),
            idle_poll: config.idle_poll_interval(),
            ..RelaySettings::default()
        };

        Arc::new(Self {
            config,
            signals,
            knowledge,
            connector,
            relay_settings,
            thinking_sound,
        })
    }

    /// Dependencies handed to each call's supervisor.
    pub fn relay_deps(&self) -> RelayDeps {
        RelayDeps {
            connector: self.connector.clone(),
            knowledge: self.knowledge.clone(),
            signals: self.signals.clone(),
            settings: self.relay_settings.clone(),
            thinking_sound: self.thinking_sound.clone(),
        }
    }
}

/// Read the thinking sound and encode it for telephony media events.
pub async fn load_thinking_sound(path: &Path) -> Option<Arc<str>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let audio = wav_data(&bytes).unwrap_or(&bytes[..]);
            info!(path = %path.display(), bytes = audio.len(), "Loaded thinking sound");
            Some(Arc::from(BASE64_STANDARD.encode(audio)))
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Thinking sound unavailable");
            None
        }
    }
}

/// Samples of a RIFF/WAVE file's `data` chunk; `None` if not a WAV file.
fn wav_data(bytes: &[u8]) -> Option<&[u8]> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return None;
    }

    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        let size = u32::from_le_bytes(bytes[offset + 4..offset + 8].try_into().ok()?) as usize;
        let body = offset + 8;
        if id == b"data" {
            let end = body.saturating_add(size).min(bytes.len());
            return Some(&bytes[body..end]);
        }
        // Chunks are word aligned
        offset = body.saturating_add(size).saturating_add(size & 1);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav(samples: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(4 + 8 + 18 + 8 + samples.len() as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&18u32.to_le_bytes());
        out.extend_from_slice(&[7, 0, 1, 0, 0x40, 0x1f, 0, 0, 0x40, 0x1f, 0, 0, 1, 0, 8, 0, 0, 0]);
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(samples.len() as u32).to_le_bytes());
        out.extend_from_slice(samples);
        out
    }

    #[test]
    fn test_wav_data_chunk() {
        let file = wav(&[0xff, 0x7f, 0x00]);
        assert_eq!(wav_data(&file), Some(&[0xff, 0x7f, 0x00][..]));
    }

    #[test]
    fn test_non_wav_passthrough() {
        assert_eq!(wav_data(b"not a wav file"), None);
        assert_eq!(wav_data(b"RIFF"), None);
    }

    #[tokio::test]
    async fn test_load_thinking_sound() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("typing.wav");
        std::fs::write(&path, wav(&[1, 2, 3])).unwrap();

        let sound = load_thinking_sound(&path).await.unwrap();
        assert_eq!(&*sound, BASE64_STANDARD.encode([1u8, 2, 3]));

        assert!(load_thinking_sound(&dir.path().join("missing.wav")).await.is_none());
    }
}
