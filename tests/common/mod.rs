//! Shared test utilities

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use voice_assistant::ai::{AiProviderKind, AiService, ChatProvider};
use voice_assistant::voice::{Synthesizer, Transcriber, VoiceProperties, VoiceService};
use voice_assistant::{ApiServerBuilder, ChatHistory, DbPool, Error, Result, db};

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Chat provider with a canned reply, or a canned failure
pub struct StubProvider {
    pub kind: AiProviderKind,
    pub reply: Option<String>,
}

impl StubProvider {
    pub fn replying(kind: AiProviderKind, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            kind,
            reply: Some(reply.to_string()),
        })
    }

    pub fn failing(kind: AiProviderKind) -> Arc<Self> {
        Arc::new(Self { kind, reply: None })
    }
}

#[async_trait]
impl ChatProvider for StubProvider {
    fn kind(&self) -> AiProviderKind {
        self.kind
    }

    async fn complete(&self, message: &str, _max_tokens: u32) -> Result<String> {
        self.reply
            .as_ref()
            .map(|r| format!("{r}: {message}"))
            .ok_or_else(|| Error::Ai("upstream returned 500".to_string()))
    }
}

/// Transcriber that always hears the same phrase
pub struct StubStt(pub &'static str);

#[async_trait]
impl Transcriber for StubStt {
    async fn transcribe(&self, _wav: &[u8]) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// Synthesizer returning the text bytes as "audio"
pub struct StubTts;

#[async_trait]
impl Synthesizer for StubTts {
    async fn synthesize(&self, text: &str, _properties: VoiceProperties) -> Result<Vec<u8>> {
        Ok(text.as_bytes().to_vec())
    }
}

/// AI service with no keys, answering from the offline fallback
#[must_use]
pub fn fallback_ai() -> AiService {
    AiService::new(AiProviderKind::Perplexity, 500)
}

/// Voice service with no providers
#[must_use]
pub fn no_voice() -> VoiceService {
    VoiceService::new(16_000, VoiceProperties::default())
}

/// Voice service with stub STT and TTS
#[must_use]
pub fn stub_voice() -> VoiceService {
    no_voice()
        .with_transcriber(Arc::new(StubStt("hello there")))
        .with_synthesizer(Arc::new(StubTts))
}

/// Build a router over the given services with in-memory history
#[must_use]
pub fn build_router(ai: AiService, voice: VoiceService) -> Router {
    ApiServerBuilder::new(ai, voice)
        .history(ChatHistory::new(100))
        .build()
        .router()
}

/// Send a request and decode the JSON body
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
    };

    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
