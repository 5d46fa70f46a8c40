//! What the assistant is told at the start of every call.

use serde_json::json;

use crate::core::realtime::{RealtimeConfig, ToolDefinition, TurnDetectionConfig};
use crate::core::realtime::openai::{OpenAIRealtimeVoice, TELEPHONY_AUDIO_FORMAT};

/// Function the assistant calls to consult the knowledge base.
pub const GET_ADDITIONAL_CONTEXT: &str = "get_additional_context";

/// Function the assistant calls to hand the caller to a person.
pub const CALL_SUPPORT: &str = "call_support";

/// Spoken once the backend session is configured.
pub const GREETING: &str = "Hello, how can I assist you today?";

pub const SESSION_INSTRUCTIONS: &str = "\
You are a helpful phone assistant that answers questions using only the context returned by the \
get_additional_context function. Respond to greetings directly; for anything else you must call \
get_additional_context. \
Turn each caller question into a detailed, context-rich request that starts with 'A user asked: ' \
followed by the exact transcription of the question, then expand on its intent with the depth and \
specificity an expert would need. Do not read the elaborated request aloud; pass it straight to \
get_additional_context. \
Never answer from your own knowledge. Base every answer only on what get_additional_context \
returns, and if it cannot answer, do not add anything beyond what it provides. Never mention the \
lookup itself. \
Keep answers concise and natural, under 50 words unless absolutely necessary, with varied \
intonation, brief pauses and small verbal cues such as 'hmm' or 'I see'. Adapt to the caller's \
tone and pace. \
If you misunderstand or cannot answer three times in a row, offer a live agent: tell the caller \
to press 0 or ask for a transfer. When the caller says things like 'operator', 'help' or \
'live agent', call call_support. \
Never start speaking unless asked.";

const TURN_THRESHOLD: f32 = 0.6;
const TURN_PREFIX_PADDING_MS: u32 = 300;
const TURN_SILENCE_MS: u32 = 500;
const TEMPERATURE: f32 = 0.6;

/// The two functions the assistant may call.
pub fn relay_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: GET_ADDITIONAL_CONTEXT.to_string(),
            description: "Elaborate on the caller's question with context, specificity and \
                          clarity so an expert could answer it, then look it up in the knowledge \
                          base."
                .to_string(),
            parameters: Some(json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The elaborated caller question, fully describing what \
                                        was asked with the background an expert would need. \
                                        Start with 'Please use your knowledge base'."
                    }
                },
                "required": ["query"]
            })),
        },
        ToolDefinition {
            name: CALL_SUPPORT.to_string(),
            description: "Transfer the caller to a live agent when the assistant repeatedly \
                          cannot answer, or when the caller asks for support or a person."
                .to_string(),
            parameters: None,
        },
    ]
}

/// Backend session for a telephony call.
pub fn realtime_session(api_key: &str, model: &str, voice: &str) -> RealtimeConfig {
    let format = TELEPHONY_AUDIO_FORMAT.to_string();

    RealtimeConfig {
        api_key: api_key.to_string(),
        model: model.to_string(),
        voice: Some(OpenAIRealtimeVoice::from_str_or_default(voice).to_string()),
        instructions: Some(SESSION_INSTRUCTIONS.to_string()),
        temperature: Some(TEMPERATURE),
        input_audio_format: Some(format.clone()),
        output_audio_format: Some(format),
        turn_detection: Some(TurnDetectionConfig::ServerVad {
            threshold: Some(TURN_THRESHOLD),
            prefix_padding_ms: Some(TURN_PREFIX_PADDING_MS),
            silence_duration_ms: Some(TURN_SILENCE_MS),
        }),
        tools: Some(relay_tools()),
        modalities: Some(vec!["text".to_string(), "audio".to_string()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::realtime::openai::ClientEvent;

    #[test]
    fn test_session_update_payload() {
        let session = realtime_session("sk", "", "alloy");
        let json = serde_json::to_value(ClientEvent::session_update(&session)).unwrap();
        let s = &json["session"];

        assert_eq!(s["voice"], "alloy");
        assert_eq!(s["input_audio_format"], "g711_ulaw");
        assert_eq!(s["output_audio_format"], "g711_ulaw");
        assert_eq!(s["modalities"], json!(["text", "audio"]));
        assert_eq!(s["turn_detection"]["silence_duration_ms"], 500);
        assert_eq!(s["tools"].as_array().unwrap().len(), 2);
        assert_eq!(s["tools"][0]["name"], GET_ADDITIONAL_CONTEXT);
        assert_eq!(s["tools"][0]["parameters"]["required"], json!(["query"]));
        assert_eq!(s["tools"][1]["name"], CALL_SUPPORT);
        assert!(s["tools"][1].get("parameters").is_none());
    }

    #[test]
    fn test_unknown_voice_falls_back() {
        let session = realtime_session("sk", "", "robot");
        assert_eq!(session.voice.as_deref(), Some("alloy"));
    }
}
