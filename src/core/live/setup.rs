//! Session setup configuration and its translator.
//!
//! [`SetupConfig::from_value`] maps the client's raw setup object into the
//! upstream session configuration. It is total: a malformed sub-field is
//! logged and skipped, the rest of the setup is honored. A degraded session
//! always beats a hard failure here.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Response modality requested from the upstream model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Audio,
    Text,
}

impl Modality {
    fn parse(value: &Value) -> Option<Self> {
        match value.as_str()?.to_ascii_uppercase().as_str() {
            "AUDIO" => Some(Modality::Audio),
            "TEXT" => Some(Modality::Text),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Audio => "AUDIO",
            Modality::Text => "TEXT",
        }
    }
}

/// One tool (function) the client exposes to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: Option<String>,
    /// JSON schema for the function parameters, passed through verbatim.
    pub parameters: Option<Value>,
}

/// Immutable session configuration, parsed once from the client's setup
/// frame and frozen for the lifetime of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SetupConfig {
    pub response_modalities: Vec<Modality>,
    pub system_instruction: Option<String>,
    pub tools: Vec<ToolDeclaration>,
    pub sliding_window_compression: bool,
    pub input_audio_transcription: bool,
    pub output_audio_transcription: bool,
    pub voice_name: Option<String>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            response_modalities: vec![Modality::Audio],
            system_instruction: None,
            tools: Vec::new(),
            sliding_window_compression: false,
            input_audio_transcription: false,
            output_audio_transcription: false,
            voice_name: None,
        }
    }
}

/// System instruction as the client may send it: a bare string or the
/// structured `{parts: [{text}]}` form.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SystemInstruction {
    Text(String),
    Structured { parts: Vec<InstructionPart> },
}

#[derive(Debug, Deserialize)]
struct InstructionPart {
    #[serde(default)]
    text: Option<String>,
}

impl SystemInstruction {
    fn normalize(self) -> Option<String> {
        match self {
            SystemInstruction::Text(text) => Some(text),
            SystemInstruction::Structured { parts } => {
                parts.into_iter().next().and_then(|part| part.text)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolBlock {
    #[serde(default)]
    function_declarations: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct DeclarationWire {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<Value>,
}

impl SetupConfig {
    /// Translate a raw client setup object into a session configuration.
    ///
    /// Never fails; every unrecognized or malformed sub-key degrades to its
    /// default while the remaining keys are still honored.
    pub fn from_value(setup: &Value) -> Self {
        let mut config = SetupConfig::default();

        if let Some(raw) = setup.get("responseModalities") {
            let modalities: Vec<Modality> = raw
                .as_array()
                .map(|entries| entries.iter().filter_map(Modality::parse).collect())
                .unwrap_or_default();
            if modalities.is_empty() {
                warn!("No usable response modalities in setup, defaulting to audio");
            } else {
                config.response_modalities = modalities;
            }
        }

        if let Some(raw) = setup.get("systemInstruction") {
            match serde_json::from_value::<SystemInstruction>(raw.clone()) {
                Ok(instruction) => config.system_instruction = instruction.normalize(),
                Err(e) => warn!("Skipping malformed system instruction: {}", e),
            }
        }

        if let Some(raw) = setup.get("tools") {
            config.tools = parse_tools(raw);
        }

        config.sliding_window_compression = setup
            .get("contextWindowCompression")
            .and_then(|c| c.get("slidingWindow"))
            .is_some();

        config.input_audio_transcription = setup.get("inputAudioTranscription").is_some();
        config.output_audio_transcription = setup.get("outputAudioTranscription").is_some();

        config.voice_name = setup
            .get("speechConfig")
            .and_then(|v| v.get("voiceConfig"))
            .and_then(|v| v.get("prebuiltVoiceConfig"))
            .and_then(|v| v.get("voiceName"))
            .and_then(Value::as_str)
            .map(str::to_owned);

        config
    }
}

fn parse_tools(raw: &Value) -> Vec<ToolDeclaration> {
    let Some(blocks) = raw.as_array() else {
        warn!("Skipping tools config: expected an array");
        return Vec::new();
    };

    let mut tools = Vec::new();
    for block in blocks {
        let block: ToolBlock = match serde_json::from_value(block.clone()) {
            Ok(block) => block,
            Err(e) => {
                warn!("Skipping malformed tool block: {}", e);
                continue;
            }
        };
        for declaration in block.function_declarations {
            match serde_json::from_value::<DeclarationWire>(declaration) {
                Ok(DeclarationWire {
                    name: Some(name),
                    description,
                    parameters,
                }) => tools.push(ToolDeclaration {
                    name,
                    description,
                    parameters,
                }),
                Ok(_) => warn!("Skipping function declaration without a name"),
                Err(e) => warn!("Skipping malformed function declaration: {}", e),
            }
        }
    }
    tools
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_to_audio_only() {
        let config = SetupConfig::from_value(&json!({}));
        assert_eq!(config.response_modalities, vec![Modality::Audio]);
        assert!(config.tools.is_empty());
        assert!(!config.output_audio_transcription);
    }

    #[test]
    fn string_and_structured_instructions_are_equivalent() {
        let from_string =
            SetupConfig::from_value(&json!({"systemInstruction": "You are a chef."}));
        let from_parts = SetupConfig::from_value(
            &json!({"systemInstruction": {"parts": [{"text": "You are a chef."}]}}),
        );
        assert_eq!(from_string.system_instruction, from_parts.system_instruction);
        assert_eq!(from_string.system_instruction.as_deref(), Some("You are a chef."));
    }

    #[test]
    fn malformed_instruction_nesting_is_skipped() {
        let config = SetupConfig::from_value(&json!({
            "systemInstruction": {"parts": "oops"},
            "outputAudioTranscription": {}
        }));
        assert!(config.system_instruction.is_none());
        assert!(config.output_audio_transcription);
    }

    #[test]
    fn unknown_modalities_are_filtered() {
        let config =
            SetupConfig::from_value(&json!({"responseModalities": ["TEXT", "HOLOGRAM"]}));
        assert_eq!(config.response_modalities, vec![Modality::Text]);
    }

    #[test]
    fn all_invalid_modalities_fall_back_to_audio() {
        let config = SetupConfig::from_value(&json!({"responseModalities": [42, "HOLOGRAM"]}));
        assert_eq!(config.response_modalities, vec![Modality::Audio]);
    }

    #[test]
    fn tools_survive_partially_malformed_declarations() {
        let config = SetupConfig::from_value(&json!({
            "tools": [{
                "functionDeclarations": [
                    {"name": "add_to_cart", "description": "Add an item", "parameters": {"type": "object"}},
                    {"description": "missing name"},
                    "not even an object"
                ]
            }]
        }));
        assert_eq!(config.tools.len(), 1);
        assert_eq!(config.tools[0].name, "add_to_cart");
    }

    #[test]
    fn malformed_tools_never_fail_the_setup() {
        let config = SetupConfig::from_value(&json!({
            "tools": "nonsense",
            "speechConfig": {"voiceConfig": {"prebuiltVoiceConfig": {"voiceName": "Puck"}}}
        }));
        assert!(config.tools.is_empty());
        assert_eq!(config.voice_name.as_deref(), Some("Puck"));
    }

    #[test]
    fn voice_is_omitted_when_path_is_incomplete() {
        let config = SetupConfig::from_value(&json!({"speechConfig": {"voiceConfig": {}}}));
        assert!(config.voice_name.is_none());
    }

    #[test]
    fn sliding_window_enables_compression() {
        let config = SetupConfig::from_value(
            &json!({"contextWindowCompression": {"slidingWindow": {}}}),
        );
        assert!(config.sliding_window_compression);
    }
}
