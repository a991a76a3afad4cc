//! Live session WebSocket handler.
//!
//! Upgrades the connection, runs the connection gate (identity check and
//! setup handshake), then supervises the five pumps of the active session:
//! ingress, audio-forward, control-forward, receive, and egress. The
//! supervisor owns the session state machine, the single wall-clock
//! deadline over the Active phase, and coordinated teardown on every exit
//! path.

use std::sync::Arc;

use axum::{
    extract::{
        RawQuery, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderMap,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};
use tracing::{info, warn};

use super::messages::{CLOSE_CODE_AUTH, CLOSE_CODE_SETUP};
use super::pumps::{
    egress_pump, forward_audio_pump, forward_control_pump, ingress_pump, receive_pump,
};
use super::session::{Session, SessionState};
use crate::auth::{Identity, extract_token};
use crate::core::live::base::UpstreamSession;
use crate::core::live::event::LiveEvent;
use crate::core::live::setup::SetupConfig;
use crate::state::AppState;

/// Maximum WebSocket frame and message size (10 MB).
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Audio channel capacity, sized for audio chunk bursts.
const AUDIO_CHANNEL_SIZE: usize = 1024;

/// Control message channel capacity.
const CONTROL_CHANNEL_SIZE: usize = 64;

/// Normalized event channel capacity.
const EVENT_CHANNEL_SIZE: usize = 256;

/// Budget for best-effort terminal sends into the event channel.
const TERMINAL_SEND_GRACE: Duration = Duration::from_secs(1);

/// How long the egress pump gets to flush before it is aborted.
const EGRESS_FLUSH_GRACE: Duration = Duration::from_secs(2);

/// Live proxy WebSocket handler.
///
/// # Returns
/// * `Response` - HTTP response that upgrades the connection to WebSocket
pub async fn live_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_FRAME_SIZE)
        .on_upgrade(move |socket| handle_live_socket(socket, state, query, headers))
}

async fn handle_live_socket(
    mut socket: WebSocket,
    state: Arc<AppState>,
    query: Option<String>,
    headers: HeaderMap,
) {
    // ------------------------------------------------------------------
    // Connection gate: identity first. The protocol handshake never
    // begins for an unverified client.
    // ------------------------------------------------------------------
    let identity = if state.config.auth_required {
        let verified = match extract_token(query.as_deref(), &headers) {
            Ok(token) => state.verifier.verify(&token).await,
            Err(e) => Err(e),
        };
        match verified {
            Ok(identity) => identity,
            Err(e) => {
                warn!("WebSocket auth rejected: {}", e);
                close_with(&mut socket, CLOSE_CODE_AUTH, format!("Auth failed: {e}")).await;
                return;
            }
        }
    } else {
        Identity {
            uid: "anonymous".into(),
            email: None,
        }
    };

    let mut session = Session::new(identity.uid.clone(), state.config.session_time_limit);
    info!(session = %session.id, uid = %session.uid, "WebSocket connected");
    session.advance(SessionState::AwaitingSetup);

    // ------------------------------------------------------------------
    // Setup handshake: exactly one text frame within the timeout.
    // ------------------------------------------------------------------
    let setup = match timeout(state.config.setup_timeout, await_setup(&mut socket)).await {
        Ok(Some(setup)) => setup,
        Ok(None) => {
            warn!(session = %session.id, "First message was not a setup frame");
            close_with(&mut socket, CLOSE_CODE_SETUP, "Invalid setup").await;
            return;
        }
        Err(_) => {
            warn!(session = %session.id, "Timeout waiting for setup message");
            close_with(&mut socket, CLOSE_CODE_SETUP, "Setup timeout").await;
            return;
        }
    };

    let config = SetupConfig::from_value(&setup);

    // ------------------------------------------------------------------
    // Upstream connect. One upstream session per client session.
    // ------------------------------------------------------------------
    let upstream = match state.connector.connect(&config).await {
        Ok(upstream) => upstream,
        Err(e) => {
            warn!(session = %session.id, "Upstream connect failed: {}", e);
            let frame = serde_json::json!({"error": format!("Upstream connect failed: {e}")});
            let _ = socket.send(Message::Text(frame.to_string().into())).await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    run_session(socket, state, session, upstream).await;
}

/// Read the one setup frame: `{"setup": {...}}`.
///
/// Returns `None` for a malformed or missing setup; transport keepalive
/// frames are skipped, everything else ends the handshake.
async fn await_setup(socket: &mut WebSocket) -> Option<Value> {
    loop {
        let msg = match socket.recv().await {
            Some(Ok(msg)) => msg,
            _ => return None,
        };
        match msg {
            Message::Text(text) => {
                let mut parsed: Value = serde_json::from_str(&text).ok()?;
                return parsed.get_mut("setup").map(Value::take);
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            _ => return None,
        }
    }
}

/// Supervise one active session until the first of: upstream end, client
/// disconnect, or deadline expiry. Owns teardown on every path.
async fn run_session(
    socket: WebSocket,
    state: Arc<AppState>,
    mut session: Session,
    upstream: UpstreamSession,
) {
    session.advance(SessionState::Active);

    let (ws_sink, ws_stream) = socket.split();
    let (audio_tx, audio_rx) = mpsc::channel(AUDIO_CHANNEL_SIZE);
    let (control_tx, control_rx) = mpsc::channel(CONTROL_CHANNEL_SIZE);
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);

    let UpstreamSession {
        handle,
        events: upstream_events,
    } = upstream;

    let mut ingress = tokio::spawn(ingress_pump(ws_stream, audio_tx, control_tx));
    let audio_forward = tokio::spawn(forward_audio_pump(
        audio_rx,
        handle.clone(),
        state.config.input_sample_rate,
    ));
    let control_forward = tokio::spawn(forward_control_pump(control_rx, handle.clone()));
    let mut receive = tokio::spawn(receive_pump(upstream_events, event_tx.clone()));
    let mut egress = tokio::spawn(egress_pump(event_rx, ws_sink));

    // One hard deadline races the entire Active phase.
    let deadline = tokio::time::sleep(session.deadline);
    tokio::pin!(deadline);

    let mut timed_out = false;
    let mut egress_result = None;

    tokio::select! {
        _ = &mut deadline => {
            info!(session = %session.id, "Session time limit reached ({:?})", session.deadline);
            timed_out = true;
        }
        result = &mut egress => {
            // Egress exits on upstream end or a client write failure.
            egress_result = Some(result);
        }
        _ = &mut ingress => {
            info!(session = %session.id, "Client disconnected");
        }
        _ = &mut receive => {
            info!(session = %session.id, "Upstream stream finished");
        }
    }

    session.advance(SessionState::Closing);

    // Best-effort notification; failure to send is swallowed.
    if timed_out {
        let _ = timeout(
            TERMINAL_SEND_GRACE,
            event_tx.send(LiveEvent::Error("Session time limit reached".into())),
        )
        .await;
    }

    // Ended is the egress pump's internal exit signal; it is never
    // serialized to the client.
    let _ = timeout(TERMINAL_SEND_GRACE, event_tx.send(LiveEvent::Ended)).await;
    drop(event_tx);

    ingress.abort();
    audio_forward.abort();
    control_forward.abort();
    receive.abort();

    let egress_result = match egress_result {
        Some(result) => Some(result),
        None => match timeout(EGRESS_FLUSH_GRACE, &mut egress).await {
            Ok(result) => Some(result),
            Err(_) => {
                egress.abort();
                None
            }
        },
    };

    // Closing an already-closed transport is tolerated.
    if let Some(Ok(mut sink)) = egress_result {
        let _ = sink.close().await;
    }

    if let Err(e) = handle.close().await {
        warn!(session = %session.id, "Failed to close upstream session: {}", e);
    }

    session.advance(SessionState::Closed);
    info!(
        session = %session.id,
        uid = %session.uid,
        elapsed = ?session.created_at.elapsed(),
        "Live session ended"
    );
}

async fn close_with(socket: &mut WebSocket, code: u16, reason: impl Into<String>) {
    let frame = CloseFrame {
        code,
        reason: reason.into().into(),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}
