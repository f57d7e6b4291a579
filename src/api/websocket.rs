//! WebSocket handler for streaming voice and text chat
//!
//! Frames are JSON envelopes `{"event": name, "data": payload}` modelled on
//! Socket.IO events, carried over a plain WebSocket.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::ApiState;
use super::chat::respond;
use crate::voice::AudioStreamBuffer;
use crate::{Error, Result};

/// Greeting sent on connect
pub const CONNECTED_MESSAGE: &str = "Connected to AI Voice Assistant";

/// Incoming WebSocket event from client
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WsIncoming {
    /// A complete utterance
    AudioStream { audio: String },
    /// Part of an utterance, buffered until `audio_end`
    AudioChunk { audio: String },
    /// Process the buffered utterance
    AudioEnd,
    /// Text chat, optionally answered with speech
    Chat {
        message: String,
        #[serde(default)]
        speak: bool,
    },
    /// Ping to keep connection alive
    Ping,
}

/// Outgoing WebSocket event to client
#[derive(Debug, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WsOutgoing {
    /// Connection established
    ConnectionResponse { data: String, session_id: String },
    /// Assistant reply
    Response {
        text: String,
        /// What the user said, for audio input
        #[serde(skip_serializing_if = "Option::is_none")]
        transcript: Option<String>,
        /// Base64 WAV of the spoken reply
        audio: Option<String>,
        timestamp: DateTime<Utc>,
    },
    /// Error processing a client event
    Error { message: String },
    /// Pong response
    Pong,
}

/// Build WebSocket router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/socket.io", get(ws_upgrade))
        .route("/socket.io/", get(ws_upgrade))
        .with_state(state)
}

/// Handle WebSocket upgrade request
async fn ws_upgrade(State(state): State<Arc<ApiState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<ApiState>) {
    let session_id = uuid::Uuid::new_v4().to_string();
    let (mut sender, mut receiver) = socket.split();

    let connected = WsOutgoing::ConnectionResponse {
        data: CONNECTED_MESSAGE.to_string(),
        session_id: session_id.clone(),
    };
    if let Ok(msg) = serde_json::to_string(&connected)
        && sender.send(Message::Text(msg.into())).await.is_err()
    {
        return;
    }

    tracing::info!(session_id = %session_id, "client connected");

    // Create channel for sending messages back to client
    let (tx, mut rx) = mpsc::channel::<WsOutgoing>(32);

    // Spawn task to forward messages from channel to WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg)
                && sender.send(Message::Text(text.into())).await.is_err()
            {
                break;
            }
        }
    });

    // Handle incoming messages
    let session_id_clone = session_id.clone();
    let mut recv_task = tokio::spawn(async move {
        let mut buffer = AudioStreamBuffer::new(state.audio.sample_rate);

        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if let Err(e) = handle_message(&text, &state, &mut buffer, &tx).await {
                        tracing::warn!(session_id = %session_id_clone, error = %e, "error processing event");
                        let error = WsOutgoing::Error {
                            message: e.to_string(),
                        };
                        if tx.send(error).await.is_err() {
                            break;
                        }
                    }
                }
                Message::Ping(data) => {
                    // axum handles pong automatically, but we can log it
                    tracing::trace!(len = data.len(), "received ping");
                }
                Message::Close(_) => {
                    tracing::info!(session_id = %session_id_clone, "WebSocket closed by client");
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::info!(session_id = %session_id, "client disconnected");
}

/// Handle a single incoming event
async fn handle_message(
    text: &str,
    state: &ApiState,
    buffer: &mut AudioStreamBuffer,
    tx: &mpsc::Sender<WsOutgoing>,
) -> Result<()> {
    let incoming: WsIncoming = serde_json::from_str(text)
        .map_err(|e| Error::InvalidInput(format!("invalid event: {e}")))?;

    let outgoing = match incoming {
        WsIncoming::AudioStream { audio } => {
            let audio = decode_audio(&audio)?;
            voice_turn(state, &audio).await?
        }
        WsIncoming::AudioChunk { audio } => {
            buffer.push(&decode_audio(&audio)?)?;
            tracing::trace!(buffered = buffer.len(), "audio chunk buffered");
            return Ok(());
        }
        WsIncoming::AudioEnd => {
            if buffer.is_empty() {
                return Err(Error::InvalidInput("No buffered audio".to_string()));
            }
            tracing::debug!(secs = buffer.duration_secs(), "processing buffered audio");
            let audio = buffer.take();
            voice_turn(state, &audio).await?
        }
        WsIncoming::Chat { message, speak } => {
            let (reply, exchange) = respond(state, &message).await?;
            let audio = if speak { speak_reply(state, &reply.text).await } else { None };
            WsOutgoing::Response {
                text: reply.text,
                transcript: None,
                audio,
                timestamp: exchange.timestamp,
            }
        }
        WsIncoming::Ping => WsOutgoing::Pong,
    };

    tx.send(outgoing)
        .await
        .map_err(|_| Error::Io(std::io::Error::other("connection closed")))
}

/// Transcribe, answer, record and speak one utterance
async fn voice_turn(state: &ApiState, audio: &[u8]) -> Result<WsOutgoing> {
    let transcription = state.voice.transcribe(audio).await?;
    tracing::info!(text = %transcription.text, level = transcription.level, "transcribed");

    let (reply, exchange) = respond(state, &transcription.text).await?;
    let audio = speak_reply(state, &reply.text).await;

    Ok(WsOutgoing::Response {
        text: reply.text,
        transcript: Some(transcription.text),
        audio,
        timestamp: exchange.timestamp,
    })
}

/// Synthesized reply as base64, or `None` when speech is unavailable
async fn speak_reply(state: &ApiState, text: &str) -> Option<String> {
    if !state.voice.capabilities().tts_available {
        return None;
    }

    match state.voice.synthesize(text).await {
        Ok(wav) => Some(BASE64.encode(wav)),
        Err(e) => {
            tracing::warn!(error = %e, "speech synthesis failed, replying with text only");
            None
        }
    }
}

fn decode_audio(encoded: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(encoded.trim())
        .map_err(|e| Error::InvalidInput(format!("invalid base64 audio: {e}")))
}
