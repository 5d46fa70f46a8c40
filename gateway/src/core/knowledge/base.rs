use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Answer spoken to the caller when every attempt failed.
pub const FALLBACK_ANSWER: &str = "Sorry, I didn't get your query.";

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("knowledge request failed: {0}")]
    Http(String),

    #[error("knowledge API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid knowledge API response: {0}")]
    InvalidResponse(String),

    #[error("no knowledge API credential available")]
    MissingCredential,
}

pub type KnowledgeResult<T> = Result<T, KnowledgeError>;

/// Which knowledge base conversation a query belongs to.
#[derive(Debug, Clone, Copy)]
pub struct KnowledgeScope<'a> {
    pub credential: &'a str,
    pub project_id: u64,
    pub session_id: &'a str,
}

/// A single attempt against the knowledge service. Retries live in
/// [`super::KnowledgeClient`].
#[async_trait]
pub trait KnowledgeApi: Send + Sync {
    /// Create a conversation and return its session id.
    async fn create_conversation(
        &self,
        credential: &str,
        project_id: u64,
        name: &str,
    ) -> KnowledgeResult<String>;

    /// Ask a question inside an existing conversation.
    async fn send_message(&self, scope: &KnowledgeScope<'_>, prompt: &str)
    -> KnowledgeResult<String>;
}

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Pause between consecutive attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Total attempts, including the first.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_secs(2),
        }
    }
}
