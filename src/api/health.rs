//! Health check endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use super::ApiState;
use crate::ai::AiProviderKind;

/// Service name reported by the liveness probe
pub const SERVICE_NAME: &str = "AI Voice Assistant";

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// Detailed readiness response
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub checks: ReadinessChecks,
}

/// Individual readiness checks
#[derive(Serialize)]
pub struct ReadinessChecks {
    pub database: CheckResult,
    pub ai: CheckResult,
    pub voice: CheckResult,
}

/// Result of a single health check
#[derive(Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    const fn ok() -> Self {
        Self {
            status: "ok",
            message: None,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            status: "fail",
            message: Some(message.into()),
        }
    }

    fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: "unavailable",
            message: Some(message.into()),
        }
    }

    fn is_ok_or_unavailable(&self) -> bool {
        self.status == "ok" || self.status == "unavailable"
    }
}

/// Liveness probe - is the service running?
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
    })
}

/// Readiness probe - is the service ready to accept traffic?
async fn ready(State(state): State<Arc<ApiState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let database = check_database(&state);
    let ai = check_ai(&state).await;
    let voice = check_voice(&state);

    let all_ok = database.is_ok_or_unavailable();
    let (status, http_status) = if all_ok {
        ("ok", StatusCode::OK)
    } else {
        ("degraded", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        http_status,
        Json(ReadinessResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            checks: ReadinessChecks {
                database,
                ai,
                voice,
            },
        }),
    )
}

/// Check history database connectivity
fn check_database(state: &ApiState) -> CheckResult {
    match &state.db {
        Some(pool) => match crate::db::ping(pool) {
            Ok(()) => CheckResult::ok(),
            Err(e) => CheckResult::fail(e.to_string()),
        },
        None => CheckResult::unavailable("history is in-memory"),
    }
}

/// An AI service answering only with canned replies is still usable
async fn check_ai(state: &ApiState) -> CheckResult {
    let status = state.ai.status().await;
    if status.active == AiProviderKind::Fallback {
        CheckResult::unavailable("no AI API key configured, using fallback replies")
    } else {
        CheckResult::ok()
    }
}

fn check_voice(state: &ApiState) -> CheckResult {
    let caps = state.voice.capabilities();
    if caps.stt_available && caps.tts_available {
        CheckResult::ok()
    } else {
        CheckResult::unavailable("speech providers not configured")
    }
}

/// Build health router (liveness only, no state needed)
pub fn router() -> Router {
    Router::new().route("/api/health", get(health))
}

/// Build readiness router (needs state for checks)
pub fn ready_router(state: Arc<ApiState>) -> Router {
    Router::new().route("/ready", get(ready)).with_state(state)
}
