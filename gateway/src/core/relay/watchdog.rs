//! Ends calls that have gone quiet.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use super::control::clear_buffers;
use super::link::LinkSender;
use super::messages::TelephonyOutgoing;
use super::state::{CallState, TerminationReason};
use crate::core::realtime::openai::ClientEvent;
use crate::core::signal::{Disposition, SignalStore};

pub(crate) struct IdleWatchdog {
    pub(crate) state: Arc<CallState>,
    pub(crate) signals: Arc<dyn SignalStore>,
    pub(crate) backend: LinkSender<ClientEvent>,
    pub(crate) telephony: LinkSender<TelephonyOutgoing>,
    pub(crate) timeout: Duration,
    pub(crate) poll: Duration,
}

impl IdleWatchdog {
    pub(crate) async fn run(self) {
        loop {
            if self.state.is_terminated() {
                return;
            }

            let idle = self.state.idle_for();
            if idle > self.timeout {
                self.expire(idle).await;
                return;
            }

            tokio::select! {
                biased;
                _ = self.state.termination().cancelled() => return,
                _ = tokio::time::sleep(self.poll) => {}
            }
        }
    }

    async fn expire(&self, idle: Duration) {
        // A handoff that won the race must keep its transfer
        if !self.state.claim(TerminationReason::IdleTimeout) {
            return;
        }
        info!(
            session_id = self.state.session_id(),
            idle_secs = idle.as_secs(),
            timeout_secs = self.timeout.as_secs(),
            "No activity, closing connection"
        );

        // Recorded before waking the others so the end-of-call request sees it
        if let Err(e) = self
            .signals
            .record(self.state.session_id(), Disposition::Hangup)
            .await
        {
            error!(
                session_id = self.state.session_id(),
                error = %e,
                "Failed to record hangup disposition"
            );
        }

        self.state.terminate(TerminationReason::IdleTimeout);
        clear_buffers(&self.state, &self.backend, &self.telephony).await;
        self.telephony.close();
    }
}
