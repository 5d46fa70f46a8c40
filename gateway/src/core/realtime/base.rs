//! Base traits and types for the realtime speech backend.
//!
//! The relay speaks to exactly one backend connection per call. This module
//! defines the error taxonomy for that connection, the session configuration
//! sent while bootstrapping, and the [`BackendConnector`] seam the session
//! supervisor uses to open a fresh connection.
//!
//! # Audio Format
//!
//! Telephony media streams carry 8kHz G.711 u-law, so sessions are configured
//! with `g711_ulaw` in both directions and audio is relayed without transcoding.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::openai::messages::ClientEvent;
use crate::core::relay::Link;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while talking to the realtime backend.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the backend failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Configuration Types
// =============================================================================

/// Session configuration for the realtime backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// API key for authentication
    pub api_key: String,

    /// Model to use (e.g., "gpt-4o-realtime-preview-2024-10-01")
    #[serde(default)]
    pub model: String,

    /// Voice ID for audio output
    #[serde(default)]
    pub voice: Option<String>,

    /// System instructions for the assistant
    #[serde(default)]
    pub instructions: Option<String>,

    /// Temperature for response generation
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Input audio format
    #[serde(default)]
    pub input_audio_format: Option<String>,

    /// Output audio format
    #[serde(default)]
    pub output_audio_format: Option<String>,

    /// Turn detection configuration
    #[serde(default)]
    pub turn_detection: Option<TurnDetectionConfig>,

    /// Tool definitions for function calling
    #[serde(default)]
    pub tools: Option<Vec<ToolDefinition>>,

    /// Response modalities (text, audio, or both)
    #[serde(default)]
    pub modalities: Option<Vec<String>>,
}

/// Configuration for turn detection (VAD).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetectionConfig {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold (0.0 to 1.0)
        #[serde(default)]
        threshold: Option<f32>,
        /// Amount of audio to include before voice detection (ms)
        #[serde(default)]
        prefix_padding_ms: Option<u32>,
        /// Silence duration before end of turn (ms)
        #[serde(default)]
        silence_duration_ms: Option<u32>,
    },
    /// Manual turn control
    #[serde(rename = "none")]
    None,
}

/// A function the assistant may call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name
    pub name: String,
    /// What the function does, as shown to the model
    pub description: String,
    /// JSON schema for the arguments
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
}

// =============================================================================
// Connector
// =============================================================================

/// Opens a fresh backend connection for one call.
///
/// Implementations must never pool or reuse connections: every call gets its
/// own [`Link`], and dropping the link's sender closes the socket.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    /// Connect and return the duplex link carrying backend events.
    async fn connect(&self) -> RealtimeResult<Link<ClientEvent>>;

    /// Session configuration to send once connected.
    fn session(&self) -> &RealtimeConfig;
}
