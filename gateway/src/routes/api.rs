use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, voice};
use crate::state::AppState;
use std::sync::Arc;

/// Create the HTTP router: index banner and the telephony webhooks.
///
/// The webhooks accept both GET and POST because providers can be
/// configured to use either.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::index))
        .route(
            "/incoming-call",
            get(voice::incoming_call).post(voice::incoming_call),
        )
        .route(
            "/end-stream/{session_id}",
            get(voice::end_stream).post(voice::end_stream),
        )
        .layer(TraceLayer::new_for_http())
}
