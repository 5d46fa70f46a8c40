use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;

use super::messages::{
    ApiEnvelope, ConversationData, CreateConversationRequest, MessageData, SendMessageRequest,
    VOICE_PERSONA,
};
use crate::core::knowledge::{KnowledgeApi, KnowledgeError, KnowledgeResult, KnowledgeScope};

/// Production CustomGPT endpoint.
pub const CUSTOMGPT_BASE_URL: &str = "https://app.customgpt.ai";

/// CustomGPT HTTP client. One attempt per call.
#[derive(Debug, Clone)]
pub struct CustomGptApi {
    http: reqwest::Client,
    base_url: String,
}

impl CustomGptApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> KnowledgeResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KnowledgeError::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn conversations_url(&self, project_id: u64) -> String {
        format!(
            "{}/api/v1/projects/{}/conversations",
            self.base_url, project_id
        )
    }

    fn messages_url(&self, project_id: u64, session_id: &str) -> String {
        format!(
            "{}/{}/messages",
            self.conversations_url(project_id),
            session_id
        )
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> KnowledgeResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KnowledgeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| KnowledgeError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl KnowledgeApi for CustomGptApi {
    async fn create_conversation(
        &self,
        credential: &str,
        project_id: u64,
        name: &str,
    ) -> KnowledgeResult<String> {
        if credential.is_empty() {
            return Err(KnowledgeError::MissingCredential);
        }

        let response = self
            .http
            .post(self.conversations_url(project_id))
            .bearer_auth(credential)
            .header(ACCEPT, "application/json")
            .json(&CreateConversationRequest { name })
            .send()
            .await
            .map_err(|e| KnowledgeError::Http(e.to_string()))?;

        let envelope: ApiEnvelope<ConversationData> = Self::parse(response).await?;
        Ok(envelope.data.session_id)
    }

    async fn send_message(
        &self,
        scope: &KnowledgeScope<'_>,
        prompt: &str,
    ) -> KnowledgeResult<String> {
        if scope.credential.is_empty() {
            return Err(KnowledgeError::MissingCredential);
        }

        let response = self
            .http
            .post(self.messages_url(scope.project_id, scope.session_id))
            .bearer_auth(scope.credential)
            .header(ACCEPT, "application/json")
            .json(&SendMessageRequest {
                prompt,
                custom_persona: VOICE_PERSONA,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| KnowledgeError::Http(e.to_string()))?;

        let envelope: ApiEnvelope<MessageData> = Self::parse(response).await?;
        envelope
            .data
            .openai_response
            .filter(|answer| !answer.trim().is_empty())
            .ok_or_else(|| KnowledgeError::InvalidResponse("empty answer".to_string()))
    }
}
