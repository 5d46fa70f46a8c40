//! Shared test doubles for relay and webhook tests.
//!
//! - `ScriptedConnector` hands out a pre-built in-process backend link
//! - `ScriptedKnowledge` answers (or fails) after a configurable delay
//! - `CallHarness` runs one supervised call with scripted peers

// Not every test binary uses every helper
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use phonebridge_gateway::ServerConfig;
use phonebridge_gateway::core::knowledge::{
    KnowledgeApi, KnowledgeClient, KnowledgeError, KnowledgeResult, KnowledgeScope, RetryPolicy,
};
use phonebridge_gateway::core::realtime::openai::ClientEvent;
use phonebridge_gateway::core::realtime::{
    BackendConnector, RealtimeConfig, RealtimeError, RealtimeResult,
};
use phonebridge_gateway::core::relay::persona::realtime_session;
use phonebridge_gateway::core::relay::{
    CallContext, CallOutcome, CallState, Link, LinkCommand, LinkPeer, RelayDeps, RelaySettings,
    SessionSupervisor, TelephonyOutgoing,
};
use phonebridge_gateway::core::signal::{MemorySignalStore, SignalStore};

pub const SESSION_ID: &str = "sess-1";
pub const PROJECT_ID: u64 = 42;
pub const THINKING_SOUND: &str = "dHlwaW5n";

// =============================================================================
// Configuration
// =============================================================================

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 5050,
        public_host: Some("calls.example.com".to_string()),
        openai_api_key: "sk-test".to_string(),
        realtime_model: "gpt-4o-realtime-preview-2024-10-01".to_string(),
        realtime_voice: "alloy".to_string(),
        knowledge_api_key: Some("cg-default".to_string()),
        knowledge_base_url: "http://127.0.0.1:9".to_string(),
        knowledge_max_retries: 2,
        knowledge_retry_delay_ms: 2000,
        knowledge_timeout_seconds: 5,
        signal_store_url: None,
        signal_ttl_seconds: 3600,
        callback_phone_number: Some("+15550001111".to_string()),
        idle_timeout_seconds: 40,
        idle_poll_seconds: 5,
        static_dir: PathBuf::from("static"),
        thinking_sound_path: PathBuf::from("static/typing.wav"),
    }
}

// =============================================================================
// Backend
// =============================================================================

/// Connector that returns one prepared link, then refuses.
pub struct ScriptedConnector {
    link: Mutex<Option<Link<ClientEvent>>>,
    session: RealtimeConfig,
}

impl ScriptedConnector {
    pub fn with_link(link: Link<ClientEvent>) -> Self {
        Self {
            link: Mutex::new(Some(link)),
            session: realtime_session("sk-test", "", "alloy"),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            link: Mutex::new(None),
            session: realtime_session("sk-test", "", "alloy"),
        }
    }
}

#[async_trait]
impl BackendConnector for ScriptedConnector {
    async fn connect(&self) -> RealtimeResult<Link<ClientEvent>> {
        self.link
            .lock()
            .take()
            .ok_or_else(|| RealtimeError::ConnectionFailed("connection refused".to_string()))
    }

    fn session(&self) -> &RealtimeConfig {
        &self.session
    }
}

// =============================================================================
// Knowledge
// =============================================================================

/// Knowledge service answering after `delay`, failing the first `failures` calls.
pub struct ScriptedKnowledge {
    pub delay: Duration,
    pub failures: usize,
    pub answer: String,
    pub queries: Mutex<Vec<String>>,
}

impl ScriptedKnowledge {
    pub fn answering(answer: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            failures: 0,
            answer: answer.to_string(),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Self::stalling(Duration::ZERO)
    }

    /// Every attempt hangs for `delay`, then fails.
    pub fn stalling(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            failures: usize::MAX,
            answer: String::new(),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().len()
    }
}

#[async_trait]
impl KnowledgeApi for ScriptedKnowledge {
    async fn create_conversation(
        &self,
        _credential: &str,
        _project_id: u64,
        _name: &str,
    ) -> KnowledgeResult<String> {
        if self.failures > 0 {
            return Err(KnowledgeError::Http("unreachable".to_string()));
        }
        Ok("kb-session-7".to_string())
    }

    async fn send_message(
        &self,
        _scope: &KnowledgeScope<'_>,
        prompt: &str,
    ) -> KnowledgeResult<String> {
        let attempt = {
            let mut queries = self.queries.lock();
            queries.push(prompt.to_string());
            queries.len()
        };
        tokio::time::sleep(self.delay).await;
        if attempt <= self.failures {
            return Err(KnowledgeError::Api {
                status: 503,
                body: "busy".to_string(),
            });
        }
        Ok(self.answer.clone())
    }
}

/// Knowledge service with a bug: any question panics the task asking it.
pub struct PanickingKnowledge;

#[async_trait]
impl KnowledgeApi for PanickingKnowledge {
    async fn create_conversation(
        &self,
        _credential: &str,
        _project_id: u64,
        _name: &str,
    ) -> KnowledgeResult<String> {
        Ok("kb-session-7".to_string())
    }

    async fn send_message(
        &self,
        _scope: &KnowledgeScope<'_>,
        _prompt: &str,
    ) -> KnowledgeResult<String> {
        panic!("knowledge backend bug");
    }
}

pub fn knowledge_client(api: Arc<dyn KnowledgeApi>) -> Arc<KnowledgeClient> {
    Arc::new(KnowledgeClient::new(
        api,
        RetryPolicy::new(2, Duration::from_secs(2)),
    ))
}

// =============================================================================
// Call harness
// =============================================================================

pub struct CallHarness {
    pub telephony: LinkPeer<TelephonyOutgoing>,
    pub backend: LinkPeer<ClientEvent>,
    pub signals: Arc<dyn SignalStore>,
    pub state: Arc<CallState>,
    pub call: JoinHandle<CallOutcome>,
}

impl CallHarness {
    pub fn start(knowledge: Arc<dyn KnowledgeApi>, signals: Arc<dyn SignalStore>) -> Self {
        let (backend_link, backend) = Link::pair();
        Self::start_with(
            Arc::new(ScriptedConnector::with_link(backend_link)),
            backend,
            knowledge,
            signals,
        )
    }

    pub fn start_with(
        connector: Arc<dyn BackendConnector>,
        backend: LinkPeer<ClientEvent>,
        knowledge: Arc<dyn KnowledgeApi>,
        signals: Arc<dyn SignalStore>,
    ) -> Self {
        let (telephony_link, telephony) = Link::pair();

        let deps = RelayDeps {
            connector,
            knowledge: knowledge_client(knowledge),
            signals: signals.clone(),
            settings: RelaySettings::default(),
            thinking_sound: Some(Arc::from(THINKING_SOUND)),
        };
        let context = CallContext {
            project_id: PROJECT_ID,
            session_id: SESSION_ID.to_string(),
            knowledge_key: "cg-key".to_string(),
        };

        let supervisor = SessionSupervisor::new(context, deps);
        let state = supervisor.state();
        let call = tokio::spawn(supervisor.run(telephony_link));

        Self {
            telephony,
            backend,
            signals,
            state,
            call,
        }
    }

    pub async fn caller(&self, frame: &str) {
        assert!(self.telephony.push(frame).await, "relay stopped reading telephony");
    }

    pub async fn model(&self, frame: &str) {
        assert!(self.backend.push(frame).await, "relay stopped reading backend");
    }
}

pub fn memory_signals() -> Arc<dyn SignalStore> {
    Arc::new(MemorySignalStore::new(Duration::from_secs(3600)))
}

// =============================================================================
// Frames
// =============================================================================

pub fn start_frame(stream_sid: &str) -> String {
    format!(
        r#"{{"event":"start","start":{{"streamSid":"{stream_sid}","callSid":"CA1","accountSid":"AC1"}}}}"#
    )
}

pub fn media_frame(payload: &str) -> String {
    format!(r#"{{"event":"media","media":{{"payload":"{payload}","track":"inbound"}}}}"#)
}

pub fn dtmf_frame(digit: &str) -> String {
    format!(r#"{{"event":"dtmf","dtmf":{{"digit":"{digit}"}}}}"#)
}

pub const STOP_FRAME: &str = r#"{"event":"stop","stop":{}}"#;

pub fn audio_delta(delta: &str) -> String {
    format!(r#"{{"type":"response.audio.delta","response_id":"r1","item_id":"i1","delta":"{delta}"}}"#)
}

pub const SPEECH_STARTED: &str =
    r#"{"type":"input_audio_buffer.speech_started","audio_start_ms":120,"item_id":"i2"}"#;

pub fn function_call(name: &str, call_id: &str, arguments: &str) -> String {
    serde_json::json!({
        "type": "response.function_call_arguments.done",
        "name": name,
        "call_id": call_id,
        "arguments": arguments,
    })
    .to_string()
}

// =============================================================================
// Assertions
// =============================================================================

/// Wire names of queued backend commands, `close` for a close request.
pub fn backend_kinds(commands: &[LinkCommand<ClientEvent>]) -> Vec<&'static str> {
    commands
        .iter()
        .map(|c| match c {
            LinkCommand::Send(event) => event.kind(),
            LinkCommand::Close => "close",
        })
        .collect()
}

/// Short labels for queued telephony commands: `media:<payload>`, `clear`, `close`.
pub fn telephony_labels(commands: &[LinkCommand<TelephonyOutgoing>]) -> Vec<String> {
    commands
        .iter()
        .map(|c| match c {
            LinkCommand::Send(TelephonyOutgoing::Media { media, .. }) => {
                format!("media:{}", media.payload)
            }
            LinkCommand::Send(TelephonyOutgoing::Clear { .. }) => "clear".to_string(),
            LinkCommand::Close => "close".to_string(),
        })
        .collect()
}
