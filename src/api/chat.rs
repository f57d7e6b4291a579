//! Text chat endpoint

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::{ApiError, ApiState};
use crate::ai::{AiProviderKind, AiReply};
use crate::history::Exchange;
use crate::{Error, Result};

/// Build chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .with_state(state)
}

/// Chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub timestamp: DateTime<Utc>,
    pub provider: AiProviderKind,
}

/// Ask the AI service and record the exchange
///
/// # Errors
///
/// Returns `InvalidInput` for a blank message or the AI service's error;
/// nothing is recorded on failure
pub async fn respond(state: &ApiState, message: &str) -> Result<(AiReply, Exchange)> {
    let message = message.trim();
    if message.is_empty() {
        return Err(Error::InvalidInput("Message is required".to_string()));
    }

    let started = Instant::now();
    let reply = state.ai.get_response(message, None).await?;
    let exchange = state
        .history
        .write()
        .await
        .add_exchange(message, reply.text.clone(), started.elapsed());

    tracing::info!(
        id = exchange.id,
        provider = %reply.provider,
        duration_ms = exchange.duration_ms,
        "chat exchange recorded"
    );
    Ok((reply, exchange))
}

/// Handle a text chat request
///
/// The body is taken as loose JSON so that a missing or non-string
/// `message` yields the same 400 as an empty one.
async fn chat(
    State(state): State<Arc<ApiState>>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> std::result::Result<Json<ChatResponse>, ApiError> {
    let Json(body) = payload?;

    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let (reply, exchange) = respond(&state, message).await?;

    Ok(Json(ChatResponse {
        response: reply.text,
        timestamp: exchange.timestamp,
        provider: reply.provider,
    }))
}
