//! Per-call state shared by the pumps and the idle watchdog.
//!
//! Access rules:
//! - stream handle: written by the inbound pump only, read by everyone
//! - activity clock: touched by both pumps, read by the watchdog
//! - termination: set once by whichever participant ends the call first

use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::knowledge::KnowledgeScope;
use crate::core::signal::Disposition;

/// Identity of one call, fixed when the media stream connects.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub project_id: u64,
    /// Knowledge base conversation id, also the signal store key
    pub session_id: String,
    /// Credential for knowledge lookups made during this call
    pub knowledge_key: String,
}

impl CallContext {
    pub fn knowledge_scope(&self) -> KnowledgeScope<'_> {
        KnowledgeScope {
            credential: &self.knowledge_key,
            project_id: self.project_id,
            session_id: &self.session_id,
        }
    }
}

/// Why a call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Telephony stream stopped or disconnected
    CallerHungUp,
    /// Backend connection closed
    BackendClosed,
    /// Caller pressed 0
    CallerRequestedAgent,
    /// Backend invoked `call_support`
    SupportHandoff,
    /// No activity within the idle timeout
    IdleTimeout,
    /// A pump task panicked or ended without a reason
    PumpFailed,
    /// Backend connection could not be opened
    BackendUnavailable,
}

impl TerminationReason {
    /// How the end-of-call webhook should finish the call.
    pub fn disposition(&self) -> Option<Disposition> {
        match self {
            TerminationReason::IdleTimeout => Some(Disposition::Hangup),
            TerminationReason::CallerRequestedAgent | TerminationReason::SupportHandoff => {
                Some(Disposition::Transfer)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::CallerHungUp => "caller_hung_up",
            TerminationReason::BackendClosed => "backend_closed",
            TerminationReason::CallerRequestedAgent => "caller_requested_agent",
            TerminationReason::SupportHandoff => "support_handoff",
            TerminationReason::IdleTimeout => "idle_timeout",
            TerminationReason::PumpFailed => "pump_failed",
            TerminationReason::BackendUnavailable => "backend_unavailable",
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supervisor lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionPhase {
    Bootstrapping,
    Active,
    Draining,
    Closed,
}

pub struct CallState {
    context: CallContext,
    stream_sid: RwLock<Option<String>>,
    last_activity: Mutex<Instant>,
    phase: Mutex<SessionPhase>,
    reason: Mutex<Option<TerminationReason>>,
    termination: CancellationToken,
}

impl CallState {
    pub fn new(context: CallContext) -> Self {
        Self {
            context,
            stream_sid: RwLock::new(None),
            last_activity: Mutex::new(Instant::now()),
            phase: Mutex::new(SessionPhase::Bootstrapping),
            reason: Mutex::new(None),
            termination: CancellationToken::new(),
        }
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    pub fn session_id(&self) -> &str {
        &self.context.session_id
    }

    // ---- stream handle ----

    pub fn stream_sid(&self) -> Option<String> {
        self.stream_sid.read().clone()
    }

    pub(crate) fn set_stream_sid(&self, stream_sid: String) {
        *self.stream_sid.write() = Some(stream_sid);
    }

    pub(crate) fn clear_stream_sid(&self) {
        *self.stream_sid.write() = None;
    }

    // ---- activity clock ----

    /// Mark the call as active now.
    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// Time since the last recorded activity.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    // ---- lifecycle ----

    pub fn phase(&self) -> SessionPhase {
        *self.phase.lock()
    }

    /// Move forward to `next`. Phases never go backwards.
    pub(crate) fn advance(&self, next: SessionPhase) {
        let mut phase = self.phase.lock();
        if next > *phase {
            info!(
                session_id = %self.context.session_id,
                "Call phase {:?} -> {:?}", *phase, next
            );
            *phase = next;
        }
    }

    // ---- termination ----

    /// Reserve `reason` as the call's ending without waking anyone yet.
    ///
    /// Returns false when another participant already ended the call. A
    /// participant with work to finish before the others react (the idle
    /// watchdog storing its hangup) claims first and terminates after.
    pub(crate) fn claim(&self, reason: TerminationReason) -> bool {
        let mut slot = self.reason.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(reason);
        info!(session_id = %self.context.session_id, %reason, "Call termination requested");
        true
    }

    /// Request teardown. The first reason wins; returns whether this call set it.
    pub fn terminate(&self, reason: TerminationReason) -> bool {
        let first = self.claim(reason);
        self.termination.cancel();
        first
    }

    pub fn termination_reason(&self) -> Option<TerminationReason> {
        *self.reason.lock()
    }

    pub fn is_terminated(&self) -> bool {
        self.termination.is_cancelled()
    }

    pub fn termination(&self) -> &CancellationToken {
        &self.termination
    }
}
