//! Drives one call from backend handshake to teardown.
//!
//! ```text
//! Bootstrapping -> Active -> Draining -> Closed
//! ```
//!
//! While `Active` the inbound pump, the outbound pump and the idle watchdog
//! run as three tasks of a [`JoinSet`]. Whichever of them ends the call first
//! raises the termination token; the others observe it at their next
//! iteration and return. A panicking unit is treated as a termination too.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};

use super::control::clear_buffers;
use super::inbound::InboundPump;
use super::link::Link;
use super::messages::TelephonyOutgoing;
use super::outbound::OutboundPump;
use super::persona::GREETING;
use super::state::{CallContext, CallState, SessionPhase, TerminationReason};
use super::watchdog::IdleWatchdog;
use crate::core::knowledge::KnowledgeClient;
use crate::core::realtime::BackendConnector;
use crate::core::realtime::openai::ClientEvent;
use crate::core::signal::{Disposition, SignalStore};

/// Default idle threshold.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(40);

/// Default idle watchdog poll interval.
pub const DEFAULT_IDLE_POLL: Duration = Duration::from_secs(5);

/// How long teardown waits for tasks before aborting them.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Per-call timing and script.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub idle_timeout: Duration,
    pub idle_poll: Duration,
    pub greeting: String,
    pub drain_grace: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            idle_poll: DEFAULT_IDLE_POLL,
            greeting: GREETING.to_string(),
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }
}

/// Everything a call needs from the rest of the process.
#[derive(Clone)]
pub struct RelayDeps {
    pub connector: Arc<dyn BackendConnector>,
    pub knowledge: Arc<KnowledgeClient>,
    pub signals: Arc<dyn SignalStore>,
    pub settings: RelaySettings,
    /// Base64 audio played while a knowledge lookup runs
    pub thinking_sound: Option<Arc<str>>,
}

/// How a call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOutcome {
    pub reason: TerminationReason,
    pub disposition: Option<Disposition>,
}

pub struct SessionSupervisor {
    state: Arc<CallState>,
    deps: RelayDeps,
}

impl SessionSupervisor {
    pub fn new(context: CallContext, deps: RelayDeps) -> Self {
        Self {
            state: Arc::new(CallState::new(context)),
            deps,
        }
    }

    /// Shared call state, for observing a running call.
    pub fn state(&self) -> Arc<CallState> {
        self.state.clone()
    }

    /// Run the call over an accepted telephony link until it ends.
    pub async fn run(self, telephony: Link<TelephonyOutgoing>) -> CallOutcome {
        let session_id = self.state.session_id().to_string();
        info!(session_id = %session_id, "Client connected");

        // ===== Bootstrapping =====
        let backend = match self.deps.connector.connect().await {
            Ok(link) => link,
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Failed to connect to realtime backend");
                self.state.terminate(TerminationReason::BackendUnavailable);
                let (_, telephony_tx, telephony_tasks) = telephony.into_parts();
                telephony_tx.close();
                self.finish_links(telephony_tasks).await;
                return self.close();
            }
        };
        let (telephony_rx, telephony_tx, telephony_tasks) = telephony.into_parts();
        let (backend_rx, backend_tx, backend_tasks) = backend.into_parts();

        let opening = [
            ClientEvent::session_update(self.deps.connector.session()),
            ClientEvent::assistant_text(&self.deps.settings.greeting),
            ClientEvent::ResponseCreate,
        ];
        for event in opening {
            let kind = event.kind();
            if backend_tx.send(event).await.is_err() {
                warn!(session_id = %session_id, event = kind, "Backend closed during handshake");
                break;
            }
        }
        self.state.touch();

        // ===== Active =====
        self.state.advance(SessionPhase::Active);

        let mut units = JoinSet::new();
        units.spawn(
            InboundPump::new(
                self.state.clone(),
                telephony_rx,
                backend_tx.clone(),
                telephony_tx.clone(),
            )
            .run(),
        );
        units.spawn(
            OutboundPump::new(
                self.state.clone(),
                backend_rx,
                backend_tx.clone(),
                telephony_tx.clone(),
                self.deps.knowledge.clone(),
                self.deps.thinking_sound.clone(),
            )
            .run(),
        );
        units.spawn(
            IdleWatchdog {
                state: self.state.clone(),
                signals: self.deps.signals.clone(),
                backend: backend_tx.clone(),
                telephony: telephony_tx.clone(),
                timeout: self.deps.settings.idle_timeout,
                poll: self.deps.settings.idle_poll,
            }
            .run(),
        );

        while let Some(result) = units.join_next().await {
            if let Err(e) = result {
                error!(session_id = %session_id, error = %e, "Relay task failed");
                self.state.terminate(TerminationReason::PumpFailed);
            }
            if self.state.is_terminated() {
                break;
            }
        }
        // No-op unless every unit returned without ending the call
        self.state.terminate(TerminationReason::PumpFailed);

        // ===== Draining =====
        self.state.advance(SessionPhase::Draining);

        clear_buffers(&self.state, &backend_tx, &telephony_tx).await;
        backend_tx.close();
        telephony_tx.close();

        let grace = self.deps.settings.drain_grace;
        let drained = tokio::time::timeout(grace, async {
            while let Some(result) = units.join_next().await {
                if let Err(e) = result {
                    error!(session_id = %session_id, error = %e, "Relay task failed while draining");
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!(session_id = %session_id, "Relay tasks did not stop in time, aborting");
            units.abort_all();
        }

        self.finish_links(telephony_tasks.into_iter().chain(backend_tasks))
            .await;

        self.close()
    }

    /// Give link I/O tasks the grace period to flush, then abort them.
    async fn finish_links(&self, tasks: impl IntoIterator<Item = JoinHandle<()>>) {
        let grace = self.deps.settings.drain_grace;
        for mut task in tasks {
            if tokio::time::timeout(grace, &mut task).await.is_err() {
                task.abort();
            }
        }
    }

    // ===== Closed =====
    fn close(&self) -> CallOutcome {
        self.state.clear_stream_sid();
        self.state.advance(SessionPhase::Closed);

        let reason = self
            .state
            .termination_reason()
            .unwrap_or(TerminationReason::PumpFailed);
        let outcome = CallOutcome {
            reason,
            disposition: reason.disposition(),
        };
        info!(
            session_id = self.state.session_id(),
            reason = %outcome.reason,
            disposition = ?outcome.disposition,
            "Call closed"
        );
        outcome
    }
}
