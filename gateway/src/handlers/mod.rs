//! HTTP and WebSocket request handlers
//!
//! - `api` - Index banner
//! - `voice` - Incoming-call and end-of-call webhooks (TwiML)
//! - `media_stream` - Telephony media stream WebSocket

pub mod api;
pub mod media_stream;
pub mod voice;

pub use media_stream::media_stream_handler;
