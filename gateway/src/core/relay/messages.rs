//! Telephony media stream protocol.
//!
//! Inbound frames are JSON objects discriminated by `event`:
//! `connected`, `start`, `media`, `dtmf`, `mark` and `stop`. Outbound the
//! relay only ever sends `media` (audio for the caller) and `clear` (drop
//! any audio queued for playback). Audio payloads are base64 G.711 u-law at
//! 8kHz and are passed through untouched.

use serde::{Deserialize, Serialize};

// =============================================================================
// Incoming Messages
// =============================================================================

/// Event received from the telephony provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyEvent {
    Connected {},

    /// Media stream began; carries the stream handle
    Start { start: StreamStart },

    /// One chunk of caller audio
    Media { media: MediaPayload },

    /// Keypad digit pressed by the caller
    Dtmf { dtmf: DtmfPayload },

    Mark {},

    /// Media stream ended
    Stop {},

    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStart {
    pub stream_sid: String,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub account_sid: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaPayload {
    /// Base64-encoded audio
    pub payload: String,
    #[serde(default)]
    pub track: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DtmfPayload {
    pub digit: String,
}

// =============================================================================
// Outgoing Messages
// =============================================================================

/// Event sent to the telephony provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyOutgoing {
    /// Audio for the caller, addressed to a known stream
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },

    /// Discard audio queued for playback. An unknown stream is sent as
    /// `null`, which the provider treats as a no-op.
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMedia {
    pub payload: String,
}

impl TelephonyOutgoing {
    pub fn media(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        TelephonyOutgoing::Media {
            stream_sid: stream_sid.into(),
            media: OutboundMedia {
                payload: payload.into(),
            },
        }
    }

    pub fn clear(stream_sid: Option<String>) -> Self {
        TelephonyOutgoing::Clear { stream_sid }
    }
}
