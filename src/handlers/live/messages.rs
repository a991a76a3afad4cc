//! Client-facing WebSocket frame shapes for the live session proxy.
//!
//! # Client → Server
//!
//! - First frame (text): `{"setup": {...}}`
//! - Binary frames: raw PCM 16-bit mono at the configured input rate
//! - `{"clientContent": {"turns": "...", "turnComplete": false}}`
//! - `{"toolResponse": {"functionResponses": {...} | [{...}]}}`
//!
//! # Server → Client
//!
//! - Binary frames: raw PCM 16-bit mono at 24 kHz
//! - `{"setupComplete": true}`
//! - `{"toolCall": {"functionCalls": [{"name", "args", "id"}]}}`
//! - `{"serverContent": {...}}` (transcriptions, turnComplete, interrupted)
//! - `{"error": "..."}`

use serde::{Deserialize, Serialize};

use crate::core::live::event::{
    ControlMessage, FunctionCall, FunctionResult, LiveEvent, TranscriptDirection,
};

/// Close code for a failed or missing setup handshake.
pub const CLOSE_CODE_SETUP: u16 = 4000;

/// Close code for a failed identity check.
pub const CLOSE_CODE_AUTH: u16 = 4001;

// =============================================================================
// Incoming frames
// =============================================================================

/// A client text frame after setup. Exactly one member is expected; frames
/// matching none are dropped by the ingress pump.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientFrame {
    pub client_content: Option<ClientContentFrame>,
    pub tool_response: Option<ToolResponseFrame>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientContentFrame {
    pub turns: String,
    pub turn_complete: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolResponseFrame {
    pub function_responses: Option<OneOrMany<FunctionResult>>,
}

/// A value the client may send as a single object or a list of objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

impl ClientFrame {
    /// Map a parsed frame onto a [`ControlMessage`], or `None` for shapes
    /// the proxy does not handle.
    pub fn into_control(self) -> Option<ControlMessage> {
        if let Some(content) = self.client_content {
            return Some(ControlMessage::ContentTurn {
                text: content.turns,
                turn_complete: content.turn_complete,
            });
        }
        if let Some(tool_response) = self.tool_response {
            let responses = tool_response.function_responses?;
            return Some(ControlMessage::ToolResponse(responses.into_vec()));
        }
        None
    }
}

// =============================================================================
// Outgoing frames
// =============================================================================

/// A server JSON frame. Externally tagged, so each variant serializes as
/// the single-key object the client protocol expects.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerFrame {
    SetupComplete(bool),
    ToolCall(ToolCallFrame),
    ServerContent(ServerContentFrame),
    Error(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallFrame {
    pub function_calls: Vec<FunctionCallFrame>,
}

#[derive(Debug, Serialize)]
pub struct FunctionCallFrame {
    pub name: String,
    pub args: serde_json::Value,
    pub id: Option<String>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContentFrame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_transcription: Option<TranscriptionFrame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_transcription: Option<TranscriptionFrame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupted: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptionFrame {
    pub text: String,
}

impl ServerFrame {
    /// Build the JSON frame for a normalized event.
    ///
    /// `Audio` and `Ended` have no JSON form — the egress pump writes audio
    /// as binary frames and treats `Ended` as its exit signal.
    pub fn from_event(event: &LiveEvent) -> Option<ServerFrame> {
        match event {
            LiveEvent::Audio(_) | LiveEvent::Ended => None,
            LiveEvent::SetupComplete => Some(ServerFrame::SetupComplete(true)),
            LiveEvent::ToolCall(calls) => Some(ServerFrame::ToolCall(ToolCallFrame {
                function_calls: calls.iter().map(FunctionCallFrame::from).collect(),
            })),
            LiveEvent::Transcript { direction, text } => {
                let transcription = Some(TranscriptionFrame { text: text.clone() });
                let content = match direction {
                    TranscriptDirection::Input => ServerContentFrame {
                        input_transcription: transcription,
                        ..Default::default()
                    },
                    TranscriptDirection::Output => ServerContentFrame {
                        output_transcription: transcription,
                        ..Default::default()
                    },
                };
                Some(ServerFrame::ServerContent(content))
            }
            LiveEvent::TurnComplete => Some(ServerFrame::ServerContent(ServerContentFrame {
                turn_complete: Some(true),
                ..Default::default()
            })),
            LiveEvent::Interrupted => Some(ServerFrame::ServerContent(ServerContentFrame {
                interrupted: Some(true),
                ..Default::default()
            })),
            LiveEvent::Error(message) => Some(ServerFrame::Error(message.clone())),
        }
    }
}

impl From<&FunctionCall> for FunctionCallFrame {
    fn from(call: &FunctionCall) -> Self {
        FunctionCallFrame {
            name: call.name.clone(),
            args: call.args.clone().unwrap_or_else(|| serde_json::json!({})),
            id: call.id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn control(value: serde_json::Value) -> Option<ControlMessage> {
        serde_json::from_value::<ClientFrame>(value)
            .ok()
            .and_then(ClientFrame::into_control)
    }

    #[test]
    fn client_content_maps_to_content_turn() {
        let msg = control(json!({
            "clientContent": {"turns": "How long do I roast it?", "turnComplete": true}
        }));
        assert_eq!(
            msg,
            Some(ControlMessage::ContentTurn {
                text: "How long do I roast it?".into(),
                turn_complete: true,
            })
        );
    }

    #[test]
    fn single_tool_response_equals_one_element_list() {
        let single = control(json!({
            "toolResponse": {"functionResponses": {"name": "f", "id": "1"}}
        }));
        let list = control(json!({
            "toolResponse": {"functionResponses": [{"name": "f", "id": "1"}]}
        }));
        assert_eq!(single, list);
        assert!(matches!(
            single,
            Some(ControlMessage::ToolResponse(ref r)) if r.len() == 1
        ));
    }

    #[test]
    fn unknown_shapes_map_to_nothing() {
        assert_eq!(control(json!({"somethingElse": 1})), None);
        assert_eq!(control(json!({"toolResponse": {}})), None);
    }

    #[test]
    fn setup_complete_frame_shape() {
        let frame = ServerFrame::from_event(&LiveEvent::SetupComplete).unwrap();
        assert_eq!(serde_json::to_value(&frame).unwrap(), json!({"setupComplete": true}));
    }

    #[test]
    fn transcript_frame_shapes() {
        let frame = ServerFrame::from_event(&LiveEvent::Transcript {
            direction: TranscriptDirection::Output,
            text: "hello".into(),
        })
        .unwrap();
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({"serverContent": {"outputTranscription": {"text": "hello"}}})
        );
    }

    #[test]
    fn tool_call_frame_defaults_missing_args() {
        let frame = ServerFrame::from_event(&LiveEvent::ToolCall(vec![FunctionCall {
            id: Some("c1".into()),
            name: "add_to_cart".into(),
            args: None,
        }]))
        .unwrap();
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({"toolCall": {"functionCalls": [{"name": "add_to_cart", "args": {}, "id": "c1"}]}})
        );
    }

    #[test]
    fn audio_and_ended_have_no_json_form() {
        assert!(ServerFrame::from_event(&LiveEvent::Audio(bytes::Bytes::new())).is_none());
        assert!(ServerFrame::from_event(&LiveEvent::Ended).is_none());
    }
}
