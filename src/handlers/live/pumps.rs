//! The five data pumps of an active session.
//!
//! Each pump moves data from one queue/stream to the next until its source
//! is exhausted or the supervisor cancels it. Pumps never talk to each
//! other directly; every hand-off goes through a channel.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::messages::{ClientFrame, ServerFrame};
use crate::core::live::base::{LiveResult, UpstreamHandle};
use crate::core::live::event::{ControlMessage, LiveEvent, ServerMessage, normalize};

/// Client ingress: demultiplex frames into the audio and control channels.
///
/// Binary frames become audio chunks; text frames parse into control
/// messages. Anything else is logged and dropped — malformed client input
/// is never an error. Exits on disconnect or transport error.
pub(crate) async fn ingress_pump(
    mut receiver: SplitStream<WebSocket>,
    audio_tx: mpsc::Sender<Bytes>,
    control_tx: mpsc::Sender<ControlMessage>,
) {
    loop {
        match receiver.next().await {
            Some(Ok(Message::Binary(data))) => {
                if audio_tx.send(data).await.is_err() {
                    break;
                }
            }
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => match frame.into_control() {
                    Some(control) => {
                        if control_tx.send(control).await.is_err() {
                            break;
                        }
                    }
                    None => debug!("Unhandled client JSON message"),
                },
                Err(_) => debug!("Dropping non-JSON text frame"),
            },
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(Message::Close(_))) => {
                info!("Client closed the connection");
                break;
            }
            Some(Err(e)) => {
                info!("Client transport error: {}", e);
                break;
            }
            None => break,
        }
    }
}

/// Audio forward: drain the audio channel into the upstream session.
pub(crate) async fn forward_audio_pump(
    mut audio_rx: mpsc::Receiver<Bytes>,
    handle: Arc<dyn UpstreamHandle>,
    sample_rate: u32,
) {
    while let Some(chunk) = audio_rx.recv().await {
        if let Err(e) = handle.send_audio(chunk, sample_rate).await {
            warn!("Failed to forward audio upstream: {}", e);
            break;
        }
    }
}

/// Control forward: drain the control channel into the upstream session.
///
/// A tool result without a payload is forwarded with a generic success
/// marker.
pub(crate) async fn forward_control_pump(
    mut control_rx: mpsc::Receiver<ControlMessage>,
    handle: Arc<dyn UpstreamHandle>,
) {
    while let Some(message) = control_rx.recv().await {
        let sent = match message {
            ControlMessage::ContentTurn {
                text,
                turn_complete,
            } => handle.send_content(&text, turn_complete).await,
            ControlMessage::ToolResponse(mut results) => {
                for result in &mut results {
                    if result.response.is_none() {
                        result.response = Some(json!({"result": "ok"}));
                    }
                }
                handle.send_tool_results(results).await
            }
        };
        if let Err(e) = sent {
            warn!("Failed to forward control message upstream: {}", e);
            break;
        }
    }
}

/// Upstream receive: normalize the upstream event stream.
///
/// Emits `SetupComplete` first (the connector completed the handshake
/// before this pump starts), then one normalized event per recognized
/// substructure. Emits exactly one terminal event — `Ended` on clean
/// exhaustion, `Error` on a stream failure — and stops. No reconnection.
pub(crate) async fn receive_pump(
    mut upstream_events: mpsc::Receiver<LiveResult<ServerMessage>>,
    event_tx: mpsc::Sender<LiveEvent>,
) {
    if event_tx.send(LiveEvent::SetupComplete).await.is_err() {
        return;
    }

    loop {
        match upstream_events.recv().await {
            Some(Ok(message)) => {
                for event in normalize(&message) {
                    if event_tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                warn!("Upstream stream error: {}", e);
                let _ = event_tx.send(LiveEvent::Error(e.to_string())).await;
                return;
            }
            None => {
                debug!("Upstream stream exhausted");
                let _ = event_tx.send(LiveEvent::Ended).await;
                return;
            }
        }
    }
}

/// Client egress: serialize normalized events onto the transport.
///
/// Audio goes out as binary, everything else as its JSON mirror. An
/// `Error` event is forwarded and the pump keeps running — deciding to
/// close is the supervisor's job. Exits on `Ended`, channel close, or a
/// write failure, returning the sink so the supervisor can close it
/// gracefully.
pub(crate) async fn egress_pump(
    mut event_rx: mpsc::Receiver<LiveEvent>,
    mut sender: SplitSink<WebSocket, Message>,
) -> SplitSink<WebSocket, Message> {
    while let Some(event) = event_rx.recv().await {
        let frame = match &event {
            LiveEvent::Ended => break,
            LiveEvent::Audio(data) => Message::Binary(data.clone()),
            other => match ServerFrame::from_event(other).map(|f| serde_json::to_string(&f)) {
                Some(Ok(text)) => Message::Text(text.into()),
                Some(Err(e)) => {
                    warn!("Failed to serialize outgoing frame: {}", e);
                    continue;
                }
                None => continue,
            },
        };

        if let Err(e) = sender.send(frame).await {
            info!("Client write failed, stopping egress: {}", e);
            break;
        }
    }
    sender
}
