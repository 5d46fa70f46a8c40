//! OpenAI Realtime API backend.
//!
//! # Supported Voices
//!
//! alloy, ash, ballad, coral, echo, sage, shimmer, verse
//!
//! # Audio Format
//!
//! Calls are relayed as G.711 u-law at 8kHz in both directions.

mod client;
mod config;
pub(crate) mod messages;

pub use client::OpenAIRealtimeConnector;
pub use config::{
    DEFAULT_REALTIME_MODEL, OPENAI_REALTIME_URL, TELEPHONY_AUDIO_FORMAT, OpenAIRealtimeVoice,
    realtime_url,
};
pub use messages::{
    ApiError, ClientEvent, ContentPart, ConversationItem, ResponseSummary, ServerEvent,
    SessionConfig, ToolDef, TurnDetection,
};
