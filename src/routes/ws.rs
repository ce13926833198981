//! WebSocket handler — depth frame request/response and streaming.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming client messages → decode + dispatch, replies sent in order
//! - Stream ticks (only while streaming) → capture + push `frame_data`
//! - Server shutdown → close frame, then exit
//!
//! Everything for one connection runs on one task, so a `get_frame` reply is
//! always written before any stream frame that follows it. Streaming state is
//! per connection; two clients streaming at different rates do not interact.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → register client in stats
//! 2. Client sends messages → dispatch → zero or more replies
//! 3. `start_stream` arms a ticker; `stop_stream` disarms it
//! 4. Close / error / shutdown → unregister

use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade, close_code};
use axum::response::Response;
use frames::{CodecError, Message};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services;
use crate::state::AppState;

pub const INVALID_JSON: &str = "Invalid JSON format";
pub const BINARY_NOT_SUPPORTED: &str = "Binary messages are not supported";
pub const STREAMING_ENABLED: &str = "Streaming enabled";
pub const STREAMING_DISABLED: &str = "Streaming disabled";

// =============================================================================
// SESSION
// =============================================================================

/// Active stream settings for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    pub include_topography: bool,
    pub fps: u32,
}

/// Per-connection protocol state.
#[derive(Debug)]
pub struct Session {
    pub client_id: Uuid,
    pub stream: Option<StreamSettings>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self { client_id: Uuid::new_v4(), stream: None }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let mut session = Session::new();
    let client_id = session.client_id;
    let mut ticker: Option<Interval> = None;

    state.stats.client_connected();
    info!(%client_id, "ws: client connected");

    loop {
        tokio::select! {
            () = state.shutdown.cancelled() => {
                let close = CloseFrame { code: close_code::AWAY, reason: "server shutting down".into() };
                let _ = socket.send(WsMessage::Close(Some(close))).await;
                break;
            }
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                let replies = match msg {
                    WsMessage::Text(text) => {
                        let before = session.stream;
                        let replies = process_inbound_text(&state, &mut session, text.as_str()).await;
                        if session.stream != before {
                            ticker = session.stream.map(|s| stream_interval(s.fps));
                        }
                        replies
                    }
                    WsMessage::Binary(_) => vec![Message::error(BINARY_NOT_SUPPORTED)],
                    WsMessage::Close(_) => break,
                    _ => Vec::new(),
                };
                if send_all(&mut socket, &replies).await.is_err() {
                    break;
                }
            }
            () = next_tick(&mut ticker) => {
                let Some(settings) = session.stream else { continue };
                match services::capture::capture_frame(&state, settings.include_topography).await {
                    Ok(frame) => {
                        if send_message(&mut socket, &Message::FrameData(frame)).await.is_err() {
                            break;
                        }
                        state.stats.record_stream_frame();
                    }
                    // Already logged and counted by the capture service.
                    Err(e) => debug!(%client_id, error = %e, "ws: stream frame skipped"),
                }
            }
        }
    }

    state.stats.client_disconnected();
    info!(%client_id, "ws: client disconnected");
}

/// Resolves on the next stream tick, or never when not streaming.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn stream_interval(fps: u32) -> Interval {
    let period = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Decode and handle one inbound text message, returning replies for the sender.
///
/// Keeps transport concerns out of protocol handling so tests can drive the
/// dispatch directly.
pub async fn process_inbound_text(state: &AppState, session: &mut Session, text: &str) -> Vec<Message> {
    let client_id = session.client_id;
    let message = match frames::decode_message(text) {
        Ok(m) => m,
        Err(CodecError::UnknownType(kind)) => {
            warn!(%client_id, %kind, "ws: unknown message type");
            return vec![Message::error(format!("Unknown message type: {kind}"))];
        }
        Err(e) => {
            if e.is_malformed() {
                warn!(%client_id, error = %e, "ws: inbound text is not a JSON object");
            } else {
                warn!(%client_id, error = %e, "ws: inbound payload does not fit its type");
            }
            return vec![Message::error(INVALID_JSON)];
        }
    };

    debug!(%client_id, kind = message.kind(), "ws: recv message");

    let reply = match message {
        Message::Ping => Message::pong(),
        Message::GetFrame { include_topography } => {
            match services::capture::capture_frame(state, include_topography).await {
                Ok(frame) => Message::FrameData(frame),
                Err(e) => Message::error(format!("Failed to capture frame data: {e}")),
            }
        }
        Message::StartStream { include_topography, fps } => {
            let settings = StreamSettings { include_topography, fps: state.config.stream_rate(fps) };
            info!(%client_id, fps = settings.fps, include_topography, "ws: stream started");
            session.stream = Some(settings);
            Message::StreamStarted { message: STREAMING_ENABLED.to_owned() }
        }
        Message::StopStream => {
            if session.stream.take().is_some() {
                info!(%client_id, "ws: stream stopped");
            }
            Message::StreamStopped { message: STREAMING_DISABLED.to_owned() }
        }
        other => Message::error(format!("Unexpected message type: {}", other.kind())),
    };
    vec![reply]
}

async fn send_all(socket: &mut WebSocket, messages: &[Message]) -> Result<(), axum::Error> {
    for message in messages {
        send_message(socket, message).await?;
    }
    Ok(())
}

async fn send_message(socket: &mut WebSocket, message: &Message) -> Result<(), axum::Error> {
    if let Message::Error { message: text } = message {
        warn!(message = %text, "ws: send error");
    }
    socket.send(WsMessage::Text(frames::encode_message(message).into())).await
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
