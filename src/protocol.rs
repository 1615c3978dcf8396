//! Wire types for the conversational WebSocket session.
//!
//! These mirror the service's published event schema. Only the subset the
//! client reacts to is modeled; anything else decodes to `Unknown` and is
//! ignored rather than treated as fatal.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages pushed by the server over the session socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "conversation_initiation_metadata")]
    ConversationInitiationMetadata {
        conversation_initiation_metadata_event: InitiationMetadata,
    },
    #[serde(rename = "audio")]
    Audio { audio_event: AudioEvent },
    #[serde(rename = "interruption")]
    Interruption {
        interruption_event: InterruptionEvent,
    },
    #[serde(rename = "ping")]
    Ping { ping_event: PingEvent },
    #[serde(rename = "agent_response")]
    AgentResponse {
        agent_response_event: AgentResponseEvent,
    },
    #[serde(rename = "user_transcript")]
    UserTranscript {
        user_transcription_event: UserTranscriptEvent,
    },
    #[serde(rename = "client_tool_call")]
    ClientToolCall { client_tool_call: ToolCallEvent },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct InitiationMetadata {
    pub conversation_id: String,
    pub agent_output_audio_format: Option<String>,
    pub user_input_audio_format: Option<String>,
}

/// One chunk of synthesized speech, base64-encoded PCM.
#[derive(Debug, Deserialize)]
pub struct AudioEvent {
    pub audio_base_64: String,
    pub event_id: u64,
}

impl AudioEvent {
    pub fn decode_pcm(&self) -> anyhow::Result<Vec<u8>> {
        Ok(BASE64.decode(&self.audio_base_64)?)
    }
}

#[derive(Debug, Deserialize)]
pub struct InterruptionEvent {
    pub event_id: Option<u64>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PingEvent {
    pub event_id: u64,
    pub ping_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct AgentResponseEvent {
    pub agent_response: String,
}

#[derive(Debug, Deserialize)]
pub struct UserTranscriptEvent {
    pub user_transcript: String,
}

/// The agent invoked a client-side tool.
#[derive(Debug, Deserialize)]
pub struct ToolCallEvent {
    pub tool_name: String,
    pub tool_call_id: String,
    #[serde(default)]
    pub parameters: Value,
}

/// One microphone frame, base64-encoded PCM.
#[derive(Debug, Serialize)]
pub struct UserAudioChunk {
    pub user_audio_chunk: String,
}

impl UserAudioChunk {
    pub fn from_pcm(frame: &[u8]) -> Self {
        Self {
            user_audio_chunk: BASE64.encode(frame),
        }
    }
}

/// Keep-alive reply; echoes the ping's event id.
#[derive(Debug, Serialize)]
pub struct Pong {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub event_id: u64,
}

impl Pong {
    pub fn new(event_id: u64) -> Self {
        Self {
            msg_type: "pong",
            event_id,
        }
    }
}

/// Result of a client tool call, success or failure.
#[derive(Debug, Serialize)]
pub struct ClientToolResult {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub tool_call_id: String,
    pub result: Value,
    pub is_error: bool,
}

impl ClientToolResult {
    pub fn new(tool_call_id: String, outcome: Result<Value, String>) -> Self {
        let (result, is_error) = match outcome {
            Ok(value) => (value, false),
            Err(message) => (Value::String(message), true),
        };
        Self {
            msg_type: "client_tool_result",
            tool_call_id,
            result,
            is_error,
        }
    }
}

/// Session kick-off. Overrides and dynamic variables stay empty; the agent
/// is used exactly as configured server-side.
#[derive(Debug, Serialize)]
pub struct ConversationInitiation {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub conversation_config_override: Value,
    pub dynamic_variables: Value,
}

impl Default for ConversationInitiation {
    fn default() -> Self {
        Self {
            msg_type: "conversation_initiation_client_data",
            conversation_config_override: serde_json::json!({}),
            dynamic_variables: serde_json::json!({}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_audio_event() {
        let text = r#"{"type":"audio","audio_event":{"audio_base_64":"AAAA","event_id":3}}"#;
        match serde_json::from_str::<ServerEvent>(text).unwrap() {
            ServerEvent::Audio { audio_event } => {
                assert_eq!(audio_event.event_id, 3);
                assert_eq!(audio_event.decode_pcm().unwrap(), vec![0u8; 3]);
            }
            other => panic!("wrong event: {:?}", other),
        }
    }

    #[test]
    fn decodes_ping_and_builds_pong() {
        let text = r#"{"type":"ping","ping_event":{"event_id":7,"ping_ms":42}}"#;
        let ServerEvent::Ping { ping_event } = serde_json::from_str::<ServerEvent>(text).unwrap()
        else {
            panic!("wrong event");
        };
        let pong = serde_json::to_string(&Pong::new(ping_event.event_id)).unwrap();
        assert_eq!(pong, r#"{"type":"pong","event_id":7}"#);
    }

    #[test]
    fn decodes_client_tool_call() {
        let text = r#"{
            "type": "client_tool_call",
            "client_tool_call": {
                "tool_name": "logMessage",
                "tool_call_id": "call_1",
                "parameters": {"message": "hello"}
            }
        }"#;
        let ServerEvent::ClientToolCall { client_tool_call } =
            serde_json::from_str::<ServerEvent>(text).unwrap()
        else {
            panic!("wrong event");
        };
        assert_eq!(client_tool_call.tool_name, "logMessage");
        assert_eq!(client_tool_call.parameters["message"], "hello");
    }

    #[test]
    fn decodes_interruption() {
        let text = r#"{"type":"interruption","interruption_event":{"event_id":12,"reason":"user"}}"#;
        assert!(matches!(
            serde_json::from_str::<ServerEvent>(text).unwrap(),
            ServerEvent::Interruption { .. }
        ));
    }

    #[test]
    fn unknown_event_types_are_tolerated() {
        let text = r#"{"type":"internal_tentative_agent_response","data":{}}"#;
        assert!(matches!(
            serde_json::from_str::<ServerEvent>(text).unwrap(),
            ServerEvent::Unknown
        ));
    }

    #[test]
    fn audio_chunk_is_base64() {
        let chunk = UserAudioChunk::from_pcm(&[0u8, 0, 0]);
        let text = serde_json::to_string(&chunk).unwrap();
        assert_eq!(text, r#"{"user_audio_chunk":"AAAA"}"#);
    }

    #[test]
    fn tool_errors_are_flagged() {
        let msg = ClientToolResult::new("call_1".into(), Err("Tool x not found".into()));
        let text = serde_json::to_string(&msg).unwrap();
        assert!(text.contains(r#""is_error":true"#));
        assert!(text.contains("Tool x not found"));
    }
}
