//! Gemini Live API wire types (client-bound frames).
//!
//! The Live WebSocket protocol frames every client message as a JSON object
//! with a single top-level key; that maps directly onto an externally
//! tagged serde enum. Inbound frames deserialize into the exhaustive
//! [`ServerMessage`](crate::core::live::event::ServerMessage) model.

use serde::Serialize;

use crate::core::live::event::FunctionResult;
use crate::core::live::setup::SetupConfig;

/// One outbound frame to the Live API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(SetupMessage),
    RealtimeInput(RealtimeInput),
    ClientContent(ClientContent),
    ToolResponse(ToolResponse),
}

/// Session setup, sent once immediately after the socket opens.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupMessage {
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_window_compression: Option<ContextWindowCompression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<EmptyConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_transcription: Option<EmptyConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextWindowCompression {
    pub sliding_window: EmptyConfig,
}

/// Marker object for presence-only configuration keys.
#[derive(Debug, Default, Serialize)]
pub struct EmptyConfig {}

/// Realtime media input: one base64 audio blob.
#[derive(Debug, Serialize)]
pub struct RealtimeInput {
    pub audio: AudioBlob,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioBlob {
    pub mime_type: String,
    pub data: String,
}

/// A complete or partial user text turn.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Turn>,
    pub turn_complete: bool,
}

#[derive(Debug, Serialize)]
pub struct Turn {
    pub role: &'static str,
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub function_responses: Vec<FunctionResult>,
}

impl SetupMessage {
    /// Build the wire setup frame from a translated session configuration.
    pub fn from_config(model: &str, config: &SetupConfig) -> Self {
        SetupMessage {
            model: format!("models/{model}"),
            generation_config: GenerationConfig {
                response_modalities: config
                    .response_modalities
                    .iter()
                    .map(|m| m.as_str())
                    .collect(),
                speech_config: config.voice_name.clone().map(|voice_name| SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig { voice_name },
                    },
                }),
            },
            system_instruction: config.system_instruction.clone().map(|text| Content {
                parts: vec![TextPart { text }],
            }),
            tools: if config.tools.is_empty() {
                Vec::new()
            } else {
                vec![Tool {
                    function_declarations: config
                        .tools
                        .iter()
                        .map(|t| FunctionDeclaration {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.parameters.clone(),
                        })
                        .collect(),
                }]
            },
            context_window_compression: config
                .sliding_window_compression
                .then(|| ContextWindowCompression {
                    sliding_window: EmptyConfig {},
                }),
            input_audio_transcription: config.input_audio_transcription.then(EmptyConfig::default),
            output_audio_transcription: config
                .output_audio_transcription
                .then(EmptyConfig::default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn setup_frame_matches_wire_shape() {
        let config = SetupConfig::from_value(&json!({
            "systemInstruction": "Help with cooking.",
            "outputAudioTranscription": {},
            "speechConfig": {"voiceConfig": {"prebuiltVoiceConfig": {"voiceName": "Puck"}}}
        }));
        let frame = ClientMessage::Setup(SetupMessage::from_config("gemini-live-test", &config));
        let wire = serde_json::to_value(&frame).unwrap();

        assert_eq!(wire["setup"]["model"], "models/gemini-live-test");
        assert_eq!(
            wire["setup"]["generationConfig"]["responseModalities"],
            json!(["AUDIO"])
        );
        assert_eq!(
            wire["setup"]["generationConfig"]["speechConfig"]["voiceConfig"]
                ["prebuiltVoiceConfig"]["voiceName"],
            "Puck"
        );
        assert_eq!(
            wire["setup"]["systemInstruction"]["parts"][0]["text"],
            "Help with cooking."
        );
        assert_eq!(wire["setup"]["outputAudioTranscription"], json!({}));
        assert!(wire["setup"].get("inputAudioTranscription").is_none());
        assert!(wire["setup"].get("tools").is_none());
    }

    #[test]
    fn realtime_input_is_externally_tagged() {
        let frame = ClientMessage::RealtimeInput(RealtimeInput {
            audio: AudioBlob {
                mime_type: "audio/pcm;rate=16000".into(),
                data: "AAAA".into(),
            },
        });
        let wire = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            wire,
            json!({"realtimeInput": {"audio": {"mimeType": "audio/pcm;rate=16000", "data": "AAAA"}}})
        );
    }
}
