use serde::{Deserialize, Serialize};

/// Persona sent with every question. Answers are read aloud, so they must
/// be short and tolerant of transcription errors.
pub const VOICE_PERSONA: &str = "\
You are an AI assistant answering caller questions from a knowledge base. \
The question was transcribed from a phone call, so it may contain transcription errors.

When answering:
1. Match the question to the knowledge base using both phonetic and semantic similarity.
2. Answer even when the match is not exact, as long as it is reasonably close.

Keep the answer to at most three sentences.";

#[derive(Debug, Clone, Serialize)]
pub struct CreateConversationRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest<'a> {
    pub prompt: &'a str,
    pub custom_persona: &'a str,
    pub stream: bool,
}

/// `{"status": "success", "data": {...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationData {
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageData {
    #[serde(default)]
    pub openai_response: Option<String>,
}
