use std::sync::Arc;

use tokio::time::sleep;
use tracing::{error, info, warn};

use super::base::{FALLBACK_ANSWER, KnowledgeApi, KnowledgeScope, RetryPolicy};

/// Knowledge lookups with bounded retries.
///
/// Neither operation ever fails: lookups degrade to [`FALLBACK_ANSWER`] and
/// session creation degrades to a random session id, so a flaky knowledge
/// service never surfaces as a technical error to the caller.
#[derive(Clone)]
pub struct KnowledgeClient {
    api: Arc<dyn KnowledgeApi>,
    retry: RetryPolicy,
}

impl KnowledgeClient {
    pub fn new(api: Arc<dyn KnowledgeApi>, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Answer `query` within the caller's conversation.
    ///
    /// Attempts are separated by the policy delay; there is no delay after
    /// the last failure.
    pub async fn answer(&self, query: &str, scope: &KnowledgeScope<'_>) -> String {
        let attempts = self.retry.attempts();

        for attempt in 1..=attempts {
            match self.api.send_message(scope, query).await {
                Ok(answer) => return answer,
                Err(e) => {
                    warn!(
                        session_id = scope.session_id,
                        project_id = scope.project_id,
                        "Knowledge lookup failed on attempt {}/{}: {}",
                        attempt,
                        attempts,
                        e
                    );
                }
            }

            if attempt < attempts {
                sleep(self.retry.delay).await;
            }
        }

        error!(
            session_id = scope.session_id,
            "Knowledge lookup exhausted {} attempts, using fallback answer", attempts
        );
        FALLBACK_ANSWER.to_string()
    }

    /// Create a knowledge conversation named after the caller.
    ///
    /// Falls back to a fresh UUID when the service is unreachable so the
    /// call can still be connected.
    pub async fn open_session(&self, credential: &str, project_id: u64, caller: &str) -> String {
        let attempts = self.retry.attempts();

        for attempt in 1..=attempts {
            match self
                .api
                .create_conversation(credential, project_id, caller)
                .await
            {
                Ok(session_id) => {
                    info!(%session_id, project_id, "Knowledge session created");
                    return session_id;
                }
                Err(e) => {
                    warn!(
                        project_id,
                        "Knowledge session creation failed on attempt {}/{}: {}",
                        attempt,
                        attempts,
                        e
                    );
                }
            }
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        warn!(%session_id, "Using generated session id");
        session_id
    }
}
