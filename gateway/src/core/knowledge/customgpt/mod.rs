//! CustomGPT knowledge base API.
//!
//! - Create conversation: `POST /api/v1/projects/{project_id}/conversations`
//! - Send message: `POST /api/v1/projects/{project_id}/conversations/{session_id}/messages`
//!
//! Both use bearer authentication and wrap their payload in `{"data": ...}`.

mod client;
mod messages;

pub use client::{CUSTOMGPT_BASE_URL, CustomGptApi};
pub use messages::{
    ApiEnvelope, ConversationData, CreateConversationRequest, MessageData, SendMessageRequest,
    VOICE_PERSONA,
};
