//! Media stream WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::media_stream_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media stream router
///
/// # Endpoint
///
/// `GET /media-stream/project/{project_id}/session/{session_id}/{api_key}` -
/// WebSocket upgrade for one call's telephony media stream.
///
/// # Protocol
///
/// The provider sends JSON events tagged by `event`: `connected`, `start`
/// (carries `streamSid`), `media` (base64 u-law), `dtmf`, `mark`, `stop`.
/// The server sends `media` frames for the caller and `clear` to flush
/// queued playback.
pub fn create_media_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/media-stream/project/{project_id}/session/{session_id}/{api_key}",
            get(media_stream_handler),
        )
        .layer(TraceLayer::new_for_http())
}
