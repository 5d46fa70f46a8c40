//! Telephony media stream WebSocket endpoint.
//!
//! The socket is bridged into a [`Link`] (a reader task feeding text frames
//! to the relay and a writer task serializing outgoing events) and handed to
//! a fresh [`SessionSupervisor`] for the lifetime of the call.

use std::sync::Arc;

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::core::relay::{
    CallContext, LINK_CHANNEL_CAPACITY, Link, LinkSender, SessionSupervisor, TelephonyOutgoing,
    spawn_json_writer,
};
use crate::state::AppState;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct MediaStreamPath {
    pub project_id: u64,
    pub session_id: String,
    pub api_key: String,
}

/// `GET /media-stream/project/{project_id}/session/{session_id}/{api_key}`
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(path): Path<MediaStreamPath>,
) -> Response {
    info!(
        session_id = %path.session_id,
        project_id = path.project_id,
        "Media stream connection attempt"
    );

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_media_socket(socket, state, path))
}

async fn handle_media_socket(socket: WebSocket, state: Arc<AppState>, path: MediaStreamPath) {
    info!(session_id = %path.session_id, "Media stream connection accepted");

    let context = CallContext {
        project_id: path.project_id,
        session_id: path.session_id,
        knowledge_key: path.api_key,
    };
    let supervisor = SessionSupervisor::new(context, state.relay_deps());
    let outcome = supervisor.run(bridge_socket(socket)).await;

    debug!(reason = %outcome.reason, "Media stream handler finished");
}

/// Wrap an accepted telephony socket as a relay link.
fn bridge_socket(socket: WebSocket) -> Link<TelephonyOutgoing> {
    let (sink, mut stream) = socket.split();
    let (incoming_tx, incoming_rx) = mpsc::channel::<String>(LINK_CHANNEL_CAPACITY);
    let (outgoing_tx, outgoing_rx) = mpsc::channel(LINK_CHANNEL_CAPACITY);

    let reader = tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if incoming_tx.send(text.to_string()).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) => {
                    info!("Telephony WebSocket closed by peer");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Telephony WebSocket error: {}", e);
                    break;
                }
            }
        }
    });

    let writer = spawn_json_writer(
        sink,
        outgoing_rx,
        |json| Message::Text(json.into()),
        "telephony",
    );

    Link::new(incoming_rx, LinkSender::new(outgoing_tx), vec![reader, writer])
}
