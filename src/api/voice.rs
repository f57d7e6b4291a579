//! Voice API endpoints for speech-to-text and text-to-speech

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;

use super::{ApiError, ApiState};
use crate::voice::{Transcription, VoiceCapabilities, VoiceProperties};

/// Build voice router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/transcribe", post(transcribe))
        .route("/synthesize", post(synthesize))
        .route("/capabilities", get(capabilities))
        .route("/properties", get(properties).put(set_properties))
        .with_state(state)
}

/// Get voice capabilities
async fn capabilities(State(state): State<Arc<ApiState>>) -> Json<VoiceCapabilities> {
    Json(state.voice.capabilities())
}

/// Transcribe audio to text
///
/// Accepts raw PCM16 at the configured sample rate, or a WAV file
async fn transcribe(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<Transcription>, ApiError> {
    let transcription = state.voice.transcribe(&body).await?;
    tracing::info!(chars = transcription.text.len(), level = transcription.level, "transcribed audio");
    Ok(Json(transcription))
}

/// Synthesis request
#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
}

/// Synthesize text to speech
///
/// Returns audio in WAV format
async fn synthesize(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<SynthesizeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let audio = state.voice.synthesize(&request.text).await?;

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "audio/wav")], audio).into_response())
}

async fn properties(State(state): State<Arc<ApiState>>) -> Json<VoiceProperties> {
    Json(state.voice.properties().await)
}

/// Partial update; omitted fields keep their value
#[derive(Debug, Deserialize)]
pub struct PropertiesRequest {
    pub rate: Option<u32>,
    pub volume: Option<f32>,
}

async fn set_properties(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<PropertiesRequest>, JsonRejection>,
) -> Result<Json<VoiceProperties>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(
        state.voice.set_properties(request.rate, request.volume).await,
    ))
}
