use async_trait::async_trait;
use thiserror::Error;

/// How a call should be finished once the media stream is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// End the call
    Hangup,
    /// Dial the callback number
    Transfer,
}

impl Disposition {
    /// Token stored for this disposition.
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Hangup => "hangup",
            Disposition::Transfer => "transfer",
        }
    }

    /// Parse a stored token. Unknown tokens are treated as absent.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim() {
            "hangup" => Some(Disposition::Hangup),
            "transfer" => Some(Disposition::Transfer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("signal store connection failed: {0}")]
    Connection(String),

    #[error("signal store command failed: {0}")]
    Command(String),

    #[error("{0}")]
    Unsupported(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value store of session id to disposition token.
///
/// Each call owns its key, so a single get or set is the only access pattern
/// and no read-modify-write is needed.
#[async_trait]
pub trait SignalStore: Send + Sync {
    async fn get(&self, session_id: &str) -> StoreResult<Option<String>>;

    async fn set(&self, session_id: &str, token: &str) -> StoreResult<()>;

    /// Read the stored disposition for a session.
    async fn disposition(&self, session_id: &str) -> StoreResult<Option<Disposition>> {
        Ok(self
            .get(session_id)
            .await?
            .as_deref()
            .and_then(Disposition::from_token))
    }

    /// Record a disposition for a session.
    async fn record(&self, session_id: &str, disposition: Disposition) -> StoreResult<()> {
        self.set(session_id, disposition.as_str()).await
    }
}
