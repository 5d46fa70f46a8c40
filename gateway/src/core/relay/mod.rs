//! The per-call media relay.
//!
//! A call owns two [`Link`]s: the telephony media stream and a fresh
//! realtime backend connection. [`SessionSupervisor`] opens the backend,
//! sends the opening script and runs the inbound pump, the outbound pump
//! and the idle watchdog until one of them terminates the call.

mod control;
mod inbound;
mod link;
mod messages;
mod outbound;
pub mod persona;
mod state;
mod supervisor;
mod watchdog;

pub use inbound::AGENT_DIGIT;
pub use link::{
    LINK_CHANNEL_CAPACITY, Link, LinkClosed, LinkCommand, LinkPeer, LinkSender, spawn_json_writer,
};
pub use messages::{
    DtmfPayload, MediaPayload, OutboundMedia, StreamStart, TelephonyEvent, TelephonyOutgoing,
};
pub use state::{CallContext, CallState, SessionPhase, TerminationReason};
pub use supervisor::{
    CallOutcome, DEFAULT_DRAIN_GRACE, DEFAULT_IDLE_POLL, DEFAULT_IDLE_TIMEOUT, RelayDeps,
    RelaySettings, SessionSupervisor,
};
