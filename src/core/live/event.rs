//! Upstream event model and the normalization boundary.
//!
//! Upstream frames deserialize into one exhaustive [`ServerMessage`] with
//! nullable members; [`normalize`] matches that shape once and emits the
//! internal [`LiveEvent`] representation consumed by the egress pump.
//! Client-originated control traffic uses [`ControlMessage`].

use base64::prelude::*;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::warn;

// =============================================================================
// Upstream event model (wire shape, exhaustive)
// =============================================================================

/// One inbound frame from the upstream live session.
///
/// Every member is optional; a single frame may carry several at once.
/// Unrecognized fields are ignored by serde.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerMessage {
    /// Handshake acknowledgement; consumed by the connector, never forwarded.
    pub setup_complete: Option<SetupComplete>,
    pub server_content: Option<ServerContent>,
    pub tool_call: Option<ToolCall>,
    /// Advance notice that the upstream will drop the connection.
    pub go_away: Option<GoAway>,
}

/// Empty handshake acknowledgement body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetupComplete {}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerContent {
    pub model_turn: Option<ModelTurn>,
    pub input_transcription: Option<Transcription>,
    pub output_transcription: Option<Transcription>,
    pub turn_complete: bool,
    pub interrupted: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelTurn {
    pub parts: Vec<ContentPart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentPart {
    pub inline_data: Option<InlineBlob>,
    pub text: Option<String>,
}

/// Base64-encoded media payload with its mime tag.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InlineBlob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Transcription {
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolCall {
    pub function_calls: Vec<FunctionCall>,
}

/// Function call requested by the model.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub args: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoAway {
    pub time_left: Option<String>,
}

// =============================================================================
// Client control traffic
// =============================================================================

/// Client-originated control message, forwarded upstream by the
/// control-forward pump.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    /// A text turn, with the end-of-turn flag.
    ContentTurn { text: String, turn_complete: bool },
    /// Results for one or more function calls.
    ToolResponse(Vec<FunctionResult>),
}

/// One function call result from the client.
///
/// `response` is optional on the wire; the forwarding pump substitutes a
/// generic success marker when it is absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FunctionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
}

// =============================================================================
// Normalized events
// =============================================================================

/// Direction of a transcript: what the user said or what the model said.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptDirection {
    Input,
    Output,
}

/// Uniform internal representation of upstream-originated happenings.
///
/// Produced by the receive pump, consumed by the egress pump.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// Raw model audio (PCM 16-bit mono, 24 kHz).
    Audio(Bytes),
    /// The upstream session is ready.
    SetupComplete,
    /// The model requests one or more function calls.
    ToolCall(Vec<FunctionCall>),
    /// Transcription of user or model speech.
    Transcript {
        direction: TranscriptDirection,
        text: String,
    },
    /// The model finished its turn.
    TurnComplete,
    /// The model was interrupted by new user input.
    Interrupted,
    /// Session-level error. Terminal when emitted by the receive pump.
    Error(String),
    /// The upstream stream is exhausted. Always terminal.
    Ended,
}

/// Normalize one upstream frame into zero or more [`LiveEvent`]s.
///
/// Detection order is fixed: model audio parts, input transcription,
/// output transcription, turn-complete, interruption, tool calls.
/// Undecodable audio parts are logged and skipped.
pub fn normalize(msg: &ServerMessage) -> Vec<LiveEvent> {
    let mut events = Vec::new();

    if let Some(content) = &msg.server_content {
        if let Some(turn) = &content.model_turn {
            for part in &turn.parts {
                if let Some(blob) = &part.inline_data {
                    match BASE64_STANDARD.decode(&blob.data) {
                        Ok(bytes) => events.push(LiveEvent::Audio(Bytes::from(bytes))),
                        Err(e) => warn!("Dropping undecodable audio part: {}", e),
                    }
                }
            }
        }

        if let Some(t) = &content.input_transcription {
            events.push(LiveEvent::Transcript {
                direction: TranscriptDirection::Input,
                text: t.text.clone(),
            });
        }

        if let Some(t) = &content.output_transcription {
            events.push(LiveEvent::Transcript {
                direction: TranscriptDirection::Output,
                text: t.text.clone(),
            });
        }

        if content.turn_complete {
            events.push(LiveEvent::TurnComplete);
        }

        if content.interrupted {
            events.push(LiveEvent::Interrupted);
        }
    }

    if let Some(call) = &msg.tool_call {
        events.push(LiveEvent::ToolCall(call.function_calls.clone()));
    }

    if let Some(go_away) = &msg.go_away {
        warn!(time_left = ?go_away.time_left, "Upstream announced disconnect");
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> ServerMessage {
        serde_json::from_value(value).expect("valid server message")
    }

    #[test]
    fn normalize_preserves_detection_order() {
        let audio = BASE64_STANDARD.encode([0u8, 1, 2, 3]);
        let msg = parse(json!({
            "serverContent": {
                "modelTurn": {
                    "parts": [{"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": audio}}]
                },
                "inputTranscription": {"text": "hi"},
                "outputTranscription": {"text": "hello"},
                "turnComplete": true,
                "interrupted": true
            },
            "toolCall": {
                "functionCalls": [{"name": "lookup", "id": "c1", "args": {"q": 1}}]
            }
        }));

        let events = normalize(&msg);
        assert_eq!(events.len(), 6);
        assert!(matches!(events[0], LiveEvent::Audio(ref b) if b.as_ref() == [0, 1, 2, 3]));
        assert_eq!(
            events[1],
            LiveEvent::Transcript {
                direction: TranscriptDirection::Input,
                text: "hi".into()
            }
        );
        assert_eq!(
            events[2],
            LiveEvent::Transcript {
                direction: TranscriptDirection::Output,
                text: "hello".into()
            }
        );
        assert_eq!(events[3], LiveEvent::TurnComplete);
        assert_eq!(events[4], LiveEvent::Interrupted);
        assert!(matches!(events[5], LiveEvent::ToolCall(ref calls) if calls.len() == 1));
    }

    #[test]
    fn normalize_empty_message_yields_nothing() {
        assert!(normalize(&ServerMessage::default()).is_empty());
    }

    #[test]
    fn normalize_skips_undecodable_audio() {
        let msg = parse(json!({
            "serverContent": {
                "modelTurn": {
                    "parts": [
                        {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "not base64!"}},
                        {"text": "ignored"}
                    ]
                }
            }
        }));
        assert!(normalize(&msg).is_empty());
    }

    #[test]
    fn normalize_handles_partial_content() {
        let msg = parse(json!({"serverContent": {"turnComplete": true}}));
        assert_eq!(normalize(&msg), vec![LiveEvent::TurnComplete]);
    }

    #[test]
    fn function_result_round_trips_without_nulls() {
        let result = FunctionResult {
            id: Some("c1".into()),
            name: Some("lookup".into()),
            response: None,
        };
        let wire = serde_json::to_value(&result).unwrap();
        assert_eq!(wire, json!({"id": "c1", "name": "lookup"}));
    }
}
