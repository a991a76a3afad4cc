//! Base traits and types for upstream live conversational sessions.
//!
//! This module defines the collaborator surface the session proxy depends
//! on: a connector that opens an upstream streaming session and a handle
//! for pushing data into it. The concrete Gemini implementation lives in
//! [`super::gemini`]; tests substitute channel-backed stubs.
//!
//! # Audio Format
//!
//! Client input audio is PCM 16-bit signed little-endian mono at the
//! configured input rate (16 kHz by default). Upstream output audio is
//! PCM 16-bit mono at 24 kHz.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

use super::event::{FunctionResult, ServerMessage};
use super::setup::SetupConfig;

/// Sample rate of audio produced by the upstream model (Hz).
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while talking to the upstream live session.
#[derive(Debug, Error)]
pub enum LiveError {
    /// Connection to the upstream service failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The upstream session handshake did not complete
    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    /// Sending data to the upstream session failed
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The upstream stream ended unexpectedly
    #[error("Upstream stream closed")]
    StreamClosed,

    /// Serialization error on the upstream wire
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Operation timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Upstream reported an error
    #[error("Upstream error: {0}")]
    Upstream(String),
}

/// Result type for upstream live operations.
pub type LiveResult<T> = Result<T, LiveError>;

// =============================================================================
// Collaborator Traits
// =============================================================================

/// Handle for pushing client data into an open upstream session.
///
/// All methods take `&self` so the audio-forward and control-forward pumps
/// can share one handle behind an `Arc` without a lock.
#[async_trait]
pub trait UpstreamHandle: Send + Sync {
    /// Forward a chunk of raw PCM audio, tagged with its sample rate.
    async fn send_audio(&self, data: Bytes, sample_rate: u32) -> LiveResult<()>;

    /// Forward a text turn, optionally marking the end of the user's turn.
    async fn send_content(&self, text: &str, turn_complete: bool) -> LiveResult<()>;

    /// Forward one or more function call results.
    async fn send_tool_results(&self, results: Vec<FunctionResult>) -> LiveResult<()>;

    /// Close the upstream session. Idempotent; closing twice is not an error.
    async fn close(&self) -> LiveResult<()>;
}

/// An open upstream session: a send handle plus the inbound event stream.
///
/// The receiver yields one [`ServerMessage`] per upstream frame and an
/// `Err` for a stream-level failure; the channel closes when the upstream
/// stream is exhausted.
pub struct UpstreamSession {
    pub handle: std::sync::Arc<dyn UpstreamHandle>,
    pub events: mpsc::Receiver<LiveResult<ServerMessage>>,
}

/// Opens upstream sessions from a translated setup configuration.
#[async_trait]
pub trait UpstreamConnector: Send + Sync {
    /// Connect and complete the upstream handshake.
    ///
    /// Returns only once the session is ready to accept realtime input.
    async fn connect(&self, config: &SetupConfig) -> LiveResult<UpstreamSession>;
}
