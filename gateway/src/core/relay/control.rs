use std::time::Duration;

use tracing::debug;

use super::link::LinkSender;
use super::messages::TelephonyOutgoing;
use super::state::CallState;
use crate::core::realtime::openai::ClientEvent;

/// Longest a clear may wait for queue space before the link counts as stalled.
pub(crate) const CONTROL_SEND_TIMEOUT: Duration = Duration::from_secs(2);

/// Drop whatever the caller is about to hear.
///
/// Cancels the in-flight backend response and tells telephony to discard
/// queued playback for the current stream (even when the stream is not
/// known yet). Safe to repeat. A closed or stalled connection on either
/// side is logged and ignored.
pub(crate) async fn clear_buffers(
    state: &CallState,
    backend: &LinkSender<ClientEvent>,
    telephony: &LinkSender<TelephonyOutgoing>,
) {
    if backend
        .send_within(ClientEvent::ResponseCancel, CONTROL_SEND_TIMEOUT)
        .await
        .is_err()
    {
        debug!(session_id = state.session_id(), "Backend closed or stalled, skipping response cancel");
    }

    if telephony
        .send_within(TelephonyOutgoing::clear(state.stream_sid()), CONTROL_SEND_TIMEOUT)
        .await
        .is_err()
    {
        debug!(session_id = state.session_id(), "Telephony closed or stalled, skipping buffer clear");
    }
}
