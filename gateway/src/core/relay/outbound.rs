//! Backend to telephony pump, including function call dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use super::control::clear_buffers;
use super::link::LinkSender;
use super::messages::TelephonyOutgoing;
use super::persona::{CALL_SUPPORT, GET_ADDITIONAL_CONTEXT};
use super::state::{CallState, TerminationReason};
use crate::core::knowledge::KnowledgeClient;
use crate::core::realtime::openai::{ClientEvent, ServerEvent};

/// How often a running knowledge lookup refreshes the activity clock.
const LOOKUP_KEEPALIVE: Duration = Duration::from_secs(1);

/// Arguments of `get_additional_context`.
#[derive(Debug, Deserialize)]
struct ContextQuery {
    query: String,
}

pub(crate) struct OutboundPump {
    state: Arc<CallState>,
    events: mpsc::Receiver<String>,
    backend: LinkSender<ClientEvent>,
    telephony: LinkSender<TelephonyOutgoing>,
    knowledge: Arc<KnowledgeClient>,
    thinking_sound: Option<Arc<str>>,
    /// Function names announced by `response.output_item.added`, by call id
    pending_calls: HashMap<String, String>,
}

impl OutboundPump {
    pub(crate) fn new(
        state: Arc<CallState>,
        events: mpsc::Receiver<String>,
        backend: LinkSender<ClientEvent>,
        telephony: LinkSender<TelephonyOutgoing>,
        knowledge: Arc<KnowledgeClient>,
        thinking_sound: Option<Arc<str>>,
    ) -> Self {
        Self {
            state,
            events,
            backend,
            telephony,
            knowledge,
            thinking_sound,
            pending_calls: HashMap::new(),
        }
    }

    pub(crate) async fn run(mut self) {
        if let Some(reason) = self.pump().await {
            self.state.terminate(reason);
        }
        clear_buffers(&self.state, &self.backend, &self.telephony).await;
        debug!(session_id = self.state.session_id(), "Outbound pump stopped");
    }

    async fn pump(&mut self) -> Option<TerminationReason> {
        loop {
            let message = tokio::select! {
                biased;
                _ = self.state.termination().cancelled() => return None,
                message = self.events.recv() => message,
            };

            let Some(message) = message else {
                info!(session_id = self.state.session_id(), "Backend connection closed");
                return Some(TerminationReason::BackendClosed);
            };

            // Any backend traffic counts as activity, decodable or not
            self.state.touch();

            let event = match serde_json::from_str::<ServerEvent>(&message) {
                Ok(event) => event,
                Err(e) => {
                    warn!(
                        session_id = self.state.session_id(),
                        error = %e,
                        "Ignoring malformed backend event"
                    );
                    continue;
                }
            };

            if event.is_lifecycle() {
                info!(session_id = self.state.session_id(), "Received event: {}", event.kind());
            } else {
                trace!(session_id = self.state.session_id(), "Received event: {}", event.kind());
            }

            if let Some(reason) = self.handle(event).await {
                return Some(reason);
            }
        }
    }

    async fn handle(&mut self, event: ServerEvent) -> Option<TerminationReason> {
        match event {
            ServerEvent::Error { error } => {
                error!(
                    session_id = self.state.session_id(),
                    error_type = %error.error_type,
                    code = ?error.code,
                    "Backend error: {}",
                    error.message
                );
            }
            ServerEvent::SessionUpdated {} => {
                info!(session_id = self.state.session_id(), "Session updated successfully");
            }
            ServerEvent::SpeechStarted { audio_start_ms, .. } => {
                debug!(
                    session_id = self.state.session_id(),
                    audio_start_ms, "Caller speech detected, clearing playback"
                );
                clear_buffers(&self.state, &self.backend, &self.telephony).await;
            }
            ServerEvent::AudioDelta { delta, .. } => self.forward_audio(delta).await,
            ServerEvent::OutputItemAdded { item } => {
                if item.item_type == "function_call"
                    && let (Some(call_id), Some(name)) = (item.call_id, item.name)
                {
                    self.pending_calls.insert(call_id, name);
                }
            }
            ServerEvent::FunctionCallArgumentsDone {
                name,
                call_id,
                arguments,
            } => {
                let announced = self.pending_calls.remove(&call_id);
                match name.or(announced) {
                    Some(name) => return self.dispatch(&name, &call_id, &arguments).await,
                    None => warn!(
                        session_id = self.state.session_id(),
                        call_id = %call_id,
                        "Function call without a name, ignoring"
                    ),
                }
            }
            _ => {}
        }
        None
    }

    async fn forward_audio(&self, delta: String) {
        if delta.is_empty() || self.state.is_terminated() {
            return;
        }
        if let Err(e) = ServerEvent::decode_audio_delta(&delta) {
            warn!(
                session_id = self.state.session_id(),
                error = %e,
                "Dropping undecodable audio delta"
            );
            return;
        }
        let Some(stream_sid) = self.state.stream_sid() else {
            debug!(
                session_id = self.state.session_id(),
                "No stream yet, dropping audio delta"
            );
            return;
        };
        // A caller that stopped reading must not hold the pump past termination
        let sent = tokio::select! {
            biased;
            _ = self.state.termination().cancelled() => return,
            sent = self.telephony.send(TelephonyOutgoing::media(stream_sid, delta)) => sent,
        };
        if sent.is_err() {
            debug!(
                session_id = self.state.session_id(),
                "Telephony closed, dropped audio delta"
            );
        }
    }

    async fn dispatch(
        &self,
        name: &str,
        call_id: &str,
        arguments: &str,
    ) -> Option<TerminationReason> {
        match name {
            GET_ADDITIONAL_CONTEXT => {
                match serde_json::from_str::<ContextQuery>(arguments) {
                    Ok(args) => self.answer_query(call_id, &args.query).await,
                    Err(e) => error!(
                        session_id = self.state.session_id(),
                        error = %e,
                        "Invalid arguments for {}",
                        GET_ADDITIONAL_CONTEXT
                    ),
                }
                None
            }
            CALL_SUPPORT => {
                info!(
                    session_id = self.state.session_id(),
                    "Caller asked for support, ending call"
                );
                Some(TerminationReason::SupportHandoff)
            }
            other => {
                debug!(session_id = self.state.session_id(), function = other, "Unknown function call");
                None
            }
        }
    }

    /// Look up the answer while the caller hears the thinking sound, then
    /// hand it to the backend and ask it to speak.
    async fn answer_query(&self, call_id: &str, query: &str) {
        self.play_thinking_sound();
        info!(session_id = self.state.session_id(), "Knowledge lookup started");

        let started = tokio::time::Instant::now();
        let scope = self.state.context().knowledge_scope();
        // A lookup in flight is activity: retries can outlast the idle timeout
        let lookup = self.knowledge.answer(query, &scope);
        tokio::pin!(lookup);
        let mut keepalive = tokio::time::interval(LOOKUP_KEEPALIVE);
        let answer = loop {
            tokio::select! {
                biased;
                _ = self.state.termination().cancelled() => return,
                answer = &mut lookup => break answer,
                _ = keepalive.tick() => self.state.touch(),
            }
        };
        info!(
            session_id = self.state.session_id(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Knowledge lookup finished"
        );

        clear_buffers(&self.state, &self.backend, &self.telephony).await;
        self.state.touch();

        if self
            .backend
            .send(ClientEvent::function_call_output(call_id, &answer))
            .await
            .is_err()
            || self.backend.send(ClientEvent::ResponseCreate).await.is_err()
        {
            debug!(
                session_id = self.state.session_id(),
                "Backend closed before the answer was delivered"
            );
        }
    }

    fn play_thinking_sound(&self) {
        let (Some(sound), Some(stream_sid)) = (&self.thinking_sound, self.state.stream_sid()) else {
            return;
        };
        if self
            .telephony
            .try_send(TelephonyOutgoing::media(stream_sid, sound.to_string()))
            .is_err()
        {
            debug!(session_id = self.state.session_id(), "Could not queue thinking sound");
        }
    }
}
