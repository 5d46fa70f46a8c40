//! Telephony to backend pump.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::control::clear_buffers;
use super::link::LinkSender;
use super::messages::{TelephonyEvent, TelephonyOutgoing};
use super::state::{CallState, TerminationReason};
use crate::core::realtime::openai::ClientEvent;

/// DTMF digit that asks for a live agent.
pub const AGENT_DIGIT: &str = "0";

pub(crate) struct InboundPump {
    state: Arc<CallState>,
    frames: mpsc::Receiver<String>,
    backend: LinkSender<ClientEvent>,
    telephony: LinkSender<TelephonyOutgoing>,
}

impl InboundPump {
    pub(crate) fn new(
        state: Arc<CallState>,
        frames: mpsc::Receiver<String>,
        backend: LinkSender<ClientEvent>,
        telephony: LinkSender<TelephonyOutgoing>,
    ) -> Self {
        Self {
            state,
            frames,
            backend,
            telephony,
        }
    }

    /// Pump until the call ends, then make sure everyone else stops too.
    pub(crate) async fn run(mut self) {
        if let Some(reason) = self.pump().await {
            self.state.terminate(reason);
        }
        clear_buffers(&self.state, &self.backend, &self.telephony).await;
        debug!(session_id = self.state.session_id(), "Inbound pump stopped");
    }

    /// Returns the reason this pump ended the call, or `None` when it only
    /// observed a termination requested elsewhere.
    async fn pump(&mut self) -> Option<TerminationReason> {
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.state.termination().cancelled() => return None,
                frame = self.frames.recv() => frame,
            };

            let Some(frame) = frame else {
                info!(session_id = self.state.session_id(), "Telephony connection closed");
                return Some(TerminationReason::CallerHungUp);
            };

            let event = match serde_json::from_str::<TelephonyEvent>(&frame) {
                Ok(event) => event,
                Err(e) => {
                    warn!(
                        session_id = self.state.session_id(),
                        error = %e,
                        "Ignoring malformed telephony frame"
                    );
                    continue;
                }
            };

            match event {
                TelephonyEvent::Media { media } => {
                    if self.state.is_terminated() {
                        return None;
                    }
                    let append = ClientEvent::InputAudioBufferAppend {
                        audio: media.payload,
                    };
                    if self.backend.send(append).await.is_err() {
                        debug!(
                            session_id = self.state.session_id(),
                            "Backend closed, dropped inbound media frame"
                        );
                    }
                }
                TelephonyEvent::Start { start } => {
                    info!(
                        session_id = self.state.session_id(),
                        stream_sid = %start.stream_sid,
                        call_sid = ?start.call_sid,
                        "Incoming stream has started"
                    );
                    self.state.set_stream_sid(start.stream_sid);
                    self.state.touch();
                }
                TelephonyEvent::Dtmf { dtmf } if dtmf.digit == AGENT_DIGIT => {
                    info!(
                        session_id = self.state.session_id(),
                        "Caller pressed 0, ending call for agent transfer"
                    );
                    self.state.terminate(TerminationReason::CallerRequestedAgent);
                    self.telephony.close();
                    return Some(TerminationReason::CallerRequestedAgent);
                }
                TelephonyEvent::Dtmf { dtmf } => {
                    debug!(session_id = self.state.session_id(), digit = %dtmf.digit, "DTMF ignored");
                }
                TelephonyEvent::Stop {} => {
                    info!(session_id = self.state.session_id(), "Telephony stream stopped");
                    return Some(TerminationReason::CallerHungUp);
                }
                TelephonyEvent::Connected {} | TelephonyEvent::Mark {} | TelephonyEvent::Other => {}
            }
        }
    }
}
