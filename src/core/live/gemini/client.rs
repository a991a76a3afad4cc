//! Gemini Live API connector.
//!
//! Opens one WebSocket per session against the `BidiGenerateContent`
//! endpoint, completes the setup handshake, then runs a single IO task that
//! multiplexes the outbound frame channel and the inbound event stream.
//! There is no reconnection: one upstream session per client session.

use std::sync::Arc;

use async_trait::async_trait;
use base64::prelude::*;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::messages::{
    AudioBlob, ClientContent, ClientMessage, RealtimeInput, SetupMessage, TextPart, ToolResponse,
    Turn,
};
use crate::core::live::base::{
    LiveError, LiveResult, UpstreamConnector, UpstreamHandle, UpstreamSession,
};
use crate::core::live::event::{FunctionResult, ServerMessage};
use crate::core::live::setup::SetupConfig;

/// Live API WebSocket endpoint.
const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Maximum time to wait for the upstream setup acknowledgement.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound frame channel capacity.
const OUTBOUND_CAPACITY: usize = 256;

/// Inbound event channel capacity.
const EVENT_CAPACITY: usize = 256;

/// Connector for the Gemini Live API, authenticated with an API key.
pub struct GeminiConnector {
    api_key: String,
    model: String,
}

impl GeminiConnector {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn ws_url(&self) -> String {
        format!("{}?key={}", GEMINI_LIVE_URL, self.api_key)
    }
}

#[async_trait]
impl UpstreamConnector for GeminiConnector {
    async fn connect(&self, config: &SetupConfig) -> LiveResult<UpstreamSession> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(self.ws_url())
            .await
            .map_err(|e| LiveError::ConnectionFailed(e.to_string()))?;

        let (mut sink, mut stream) = ws_stream.split();

        let setup = ClientMessage::Setup(SetupMessage::from_config(&self.model, config));
        let frame = serde_json::to_string(&setup)
            .map_err(|e| LiveError::Serialization(e.to_string()))?;
        sink.send(Message::Text(frame.into()))
            .await
            .map_err(|e| LiveError::ConnectionFailed(e.to_string()))?;

        // The session is not usable until the service acknowledges the setup.
        wait_for_setup_ack(&mut stream).await?;
        info!(model = %self.model, "Gemini Live session established");

        let (out_tx, mut out_rx) = mpsc::channel::<Message>(OUTBOUND_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<LiveResult<ServerMessage>>(EVENT_CAPACITY);
        let shutdown = CancellationToken::new();
        let io_shutdown = shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = io_shutdown.cancelled() => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                    frame = out_rx.recv() => {
                        let Some(frame) = frame else { break };
                        if let Err(e) = sink.send(frame).await {
                            warn!("Failed to send frame upstream: {}", e);
                            let _ = event_tx
                                .send(Err(LiveError::SendFailed(e.to_string())))
                                .await;
                            break;
                        }
                    }
                    inbound = stream.next() => {
                        match inbound {
                            Some(Ok(msg)) => {
                                let Some(message) = parse_server_frame(msg) else { continue };
                                if event_tx.send(Ok(message)).await.is_err() {
                                    break;
                                }
                            }
                            Some(Err(e)) => {
                                let _ = event_tx.send(Err(LiveError::Upstream(e.to_string()))).await;
                                break;
                            }
                            None => break,
                        }
                    }
                }
            }
            debug!("Gemini Live IO task finished");
        });

        Ok(UpstreamSession {
            handle: Arc::new(GeminiHandle { out_tx, shutdown }),
            events: event_rx,
        })
    }
}

/// Send handle for one open Gemini Live session.
pub struct GeminiHandle {
    out_tx: mpsc::Sender<Message>,
    shutdown: CancellationToken,
}

impl GeminiHandle {
    async fn send(&self, message: &ClientMessage) -> LiveResult<()> {
        let frame =
            serde_json::to_string(message).map_err(|e| LiveError::Serialization(e.to_string()))?;
        self.out_tx
            .send(Message::Text(frame.into()))
            .await
            .map_err(|_| LiveError::StreamClosed)
    }
}

#[async_trait]
impl UpstreamHandle for GeminiHandle {
    async fn send_audio(&self, data: Bytes, sample_rate: u32) -> LiveResult<()> {
        self.send(&ClientMessage::RealtimeInput(RealtimeInput {
            audio: AudioBlob {
                mime_type: format!("audio/pcm;rate={sample_rate}"),
                data: BASE64_STANDARD.encode(&data),
            },
        }))
        .await
    }

    async fn send_content(&self, text: &str, turn_complete: bool) -> LiveResult<()> {
        self.send(&ClientMessage::ClientContent(ClientContent {
            turns: vec![Turn {
                role: "user",
                parts: vec![TextPart { text: text.into() }],
            }],
            turn_complete,
        }))
        .await
    }

    async fn send_tool_results(&self, results: Vec<FunctionResult>) -> LiveResult<()> {
        self.send(&ClientMessage::ToolResponse(ToolResponse {
            function_responses: results,
        }))
        .await
    }

    async fn close(&self) -> LiveResult<()> {
        // Idempotent: cancelling an already-cancelled token is a no-op.
        self.shutdown.cancel();
        Ok(())
    }
}

/// Decode one inbound WebSocket message into a [`ServerMessage`].
///
/// The Live API delivers JSON in both text and binary frames. Frames that
/// fail to parse are logged and dropped.
fn parse_server_frame(msg: Message) -> Option<ServerMessage> {
    let parsed = match &msg {
        Message::Text(text) => serde_json::from_str::<ServerMessage>(text),
        Message::Binary(data) => serde_json::from_slice::<ServerMessage>(data),
        _ => return None,
    };
    match parsed {
        Ok(message) => Some(message),
        Err(e) => {
            warn!("Dropping unparseable upstream frame: {}", e);
            None
        }
    }
}

async fn wait_for_setup_ack<S>(stream: &mut S) -> LiveResult<()>
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let ack = timeout(HANDSHAKE_TIMEOUT, async {
        while let Some(msg) = stream.next().await {
            let msg = msg.map_err(|e| LiveError::HandshakeFailed(e.to_string()))?;
            if let Some(message) = parse_server_frame(msg)
                && message.setup_complete.is_some()
            {
                return Ok(());
            }
        }
        Err(LiveError::HandshakeFailed(
            "stream closed before setup acknowledgement".into(),
        ))
    })
    .await;

    match ack {
        Ok(result) => result,
        Err(_) => Err(LiveError::Timeout(
            "waiting for setup acknowledgement".into(),
        )),
    }
}
