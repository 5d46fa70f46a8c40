//! Realtime speech backend.
//!
//! The relay depends on the [`BackendConnector`] seam only; the OpenAI
//! Realtime API is the one production implementation.

mod base;
pub mod openai;

pub use base::{
    BackendConnector, RealtimeConfig, RealtimeError, RealtimeResult, ToolDefinition,
    TurnDetectionConfig,
};
pub use openai::{
    DEFAULT_REALTIME_MODEL, OPENAI_REALTIME_URL, TELEPHONY_AUDIO_FORMAT,
    OpenAIRealtimeConnector, OpenAIRealtimeVoice,
};
