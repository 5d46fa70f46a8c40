pub mod knowledge;
pub mod realtime;
pub mod relay;
pub mod signal;

pub use knowledge::{KnowledgeClient, RetryPolicy};
pub use realtime::{BackendConnector, OpenAIRealtimeConnector, RealtimeConfig, RealtimeError};
pub use relay::{CallContext, CallOutcome, RelayDeps, RelaySettings, SessionSupervisor};
pub use signal::{Disposition, SignalStore, create_signal_store};
