//! Upstream live-session abstractions and the Gemini implementation.
//!
//! The session proxy depends only on the traits in [`base`]; the concrete
//! Gemini connector in [`gemini`] is wired in at application startup.

pub mod base;
pub mod event;
pub mod gemini;
pub mod setup;

pub use base::{
    LiveError, LiveResult, OUTPUT_SAMPLE_RATE, UpstreamConnector, UpstreamHandle, UpstreamSession,
};
pub use event::{
    ControlMessage, FunctionCall, FunctionResult, LiveEvent, ServerMessage, TranscriptDirection,
    normalize,
};
pub use gemini::GeminiConnector;
pub use setup::{Modality, SetupConfig, ToolDeclaration};
