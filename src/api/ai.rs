//! AI provider endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiState};
use crate::ai::{AiProviderKind, AiStatus};

/// Build AI router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/provider", put(set_provider))
        .route("/test", post(test_connection))
        .with_state(state)
}

async fn status(State(state): State<Arc<ApiState>>) -> Json<AiStatus> {
    Json(state.ai.status().await)
}

#[derive(Debug, Deserialize)]
pub struct ProviderRequest {
    pub provider: String,
}

/// Switch the preferred provider, returning the new status
async fn set_provider(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<ProviderRequest>, JsonRejection>,
) -> Result<Json<AiStatus>, ApiError> {
    let Json(request) = payload?;
    state.ai.set_provider(&request.provider).await?;
    Ok(Json(state.ai.status().await))
}

#[derive(Debug, Serialize)]
pub struct TestResponse {
    pub connected: bool,
    pub provider: AiProviderKind,
}

async fn test_connection(State(state): State<Arc<ApiState>>) -> Json<TestResponse> {
    let connected = state.ai.test_connection().await;
    let provider = state.ai.status().await.active;
    Json(TestResponse {
        connected,
        provider,
    })
}
