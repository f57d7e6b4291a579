//! API endpoint integration tests

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::json;
use tower::ServiceExt;

use voice_assistant::ai::AiProviderKind;

mod common;
use common::{
    StubProvider, build_router, empty_request, fallback_ai, get, json_request, no_voice, send,
    stub_voice,
};

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_router(fallback_ai(), no_voice());

    let (status, json) = send(&app, get("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"status": "healthy", "service": "AI Voice Assistant"}));
}

#[tokio::test]
async fn test_ready_endpoint_without_database() {
    let app = build_router(fallback_ai(), no_voice());

    let (status, json) = send(&app, get("/ready")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["checks"]["database"]["status"], "unavailable");
    assert_eq!(json["checks"]["ai"]["status"], "unavailable"); // No keys in tests
}

#[tokio::test]
async fn test_index_placeholder() {
    let app = build_router(fallback_ai(), no_voice());

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(String::from_utf8_lossy(&body).contains("AI Voice Assistant"));
}

#[tokio::test]
async fn test_chat_with_fallback_reply() {
    let app = build_router(fallback_ai(), no_voice());

    let (status, json) = send(
        &app,
        json_request("POST", "/api/chat", &json!({"message": "Hello there"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["response"], "Hello! How can I assist you today?");
    assert_eq!(json["provider"], "fallback");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_chat_missing_message() {
    let app = build_router(fallback_ai(), no_voice());

    for body in [json!({}), json!({"message": ""}), json!({"message": "   "}), json!({"message": 42})] {
        let (status, json) = send(&app, json_request("POST", "/api/chat", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(json["error"], "Message is required");
        assert_eq!(json["code"], "bad_request");
    }

    // Nothing recorded
    let (_, history) = send(&app, get("/api/chat-history")).await;
    assert_eq!(history, json!([]));
}

#[tokio::test]
async fn test_chat_malformed_json() {
    let app = build_router(fallback_ai(), no_voice());

    let request = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "invalid_json");
}

#[tokio::test]
async fn test_chat_provider_failure() {
    let ai = fallback_ai().with_perplexity(StubProvider::failing(AiProviderKind::Perplexity));
    let app = build_router(ai, no_voice());

    let (status, json) = send(&app, json_request("POST", "/api/chat", &json!({"message": "hi"}))).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "ai_unavailable");

    let (_, history) = send(&app, get("/api/chat-history")).await;
    assert_eq!(history, json!([]));
}

#[tokio::test]
async fn test_chat_history_lifecycle() {
    let ai = fallback_ai().with_perplexity(StubProvider::replying(AiProviderKind::Perplexity, "echo"));
    let app = build_router(ai, no_voice());

    for message in ["first question", "second question"] {
        let (status, _) = send(&app, json_request("POST", "/api/chat", &json!({"message": message}))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, history) = send(&app, get("/api/chat-history")).await;
    assert_eq!(status, StatusCode::OK);

    let messages = history.as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["text"], "first question");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["text"], "echo: first question");
    assert_eq!(messages[3]["id"], 2);

    let (status, cleared) = send(&app, empty_request("POST", "/api/clear-history")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared, json!({"message": "Chat history cleared", "deleted": 2}));

    let (_, history) = send(&app, get("/api/chat-history")).await;
    assert_eq!(history, json!([]));
}

#[tokio::test]
async fn test_chat_history_page_search_and_summary() {
    let ai = fallback_ai().with_perplexity(StubProvider::replying(AiProviderKind::Perplexity, "ok"));
    let app = build_router(ai, no_voice());

    for message in ["Tell me about Rust", "What about Python", "rust again"] {
        send(&app, json_request("POST", "/api/chat", &json!({"message": message}))).await;
    }

    let (_, page) = send(&app, get("/api/chat-history?limit=1&offset=1")).await;
    let page = page.as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["user"], "What about Python");

    let (_, results) = send(&app, get("/api/chat-history/search?q=RUST")).await;
    assert_eq!(results.as_array().unwrap().len(), 2);

    let (_, results) = send(&app, get("/api/chat-history/search")).await;
    assert_eq!(results, json!([]));

    let (status, summary) = send(&app, get("/api/chat-history/summary")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_exchanges"], 3);
    assert!(summary["first_exchange"].is_string());
}

#[tokio::test]
async fn test_delete_exchange() {
    let app = build_router(fallback_ai(), no_voice());

    send(&app, json_request("POST", "/api/chat", &json!({"message": "hello"}))).await;

    let (status, json) = send(&app, empty_request("DELETE", "/api/chat-history/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted"], 1);

    let (status, json) = send(&app, empty_request("DELETE", "/api/chat-history/1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "not_found");
}

#[tokio::test]
async fn test_ai_provider_switch() {
    let ai = fallback_ai()
        .with_perplexity(StubProvider::replying(AiProviderKind::Perplexity, "p"))
        .with_openai(StubProvider::replying(AiProviderKind::OpenAi, "o"));
    let app = build_router(ai, no_voice());

    let (_, status) = send(&app, get("/api/ai/status")).await;
    assert_eq!(status["preferred"], "perplexity");
    assert_eq!(status["active"], "perplexity");

    let (code, status) = send(&app, json_request("PUT", "/api/ai/provider", &json!({"provider": "OpenAI"}))).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(status["active"], "openai");

    let (_, reply) = send(&app, json_request("POST", "/api/chat", &json!({"message": "x"}))).await;
    assert_eq!(reply["response"], "o: x");

    let (code, json) = send(&app, json_request("PUT", "/api/ai/provider", &json!({"provider": "bard"}))).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("bard"));

    let (_, status) = send(&app, get("/api/ai/status")).await;
    assert_eq!(status["preferred"], "openai");
}

#[tokio::test]
async fn test_ai_connection_test() {
    let app = build_router(fallback_ai(), no_voice());

    let (status, json) = send(&app, empty_request("POST", "/api/ai/test")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["connected"], true);
    assert_eq!(json["provider"], "fallback");
}

#[tokio::test]
async fn test_voice_not_configured() {
    let app = build_router(fallback_ai(), no_voice());

    let (_, caps) = send(&app, get("/api/voice/capabilities")).await;
    assert_eq!(caps, json!({"stt_available": false, "tts_available": false}));

    let request = Request::builder()
        .method("POST")
        .uri("/api/voice/transcribe")
        .body(Body::from(vec![0_u8, 1, 2, 3]))
        .unwrap();
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "not_configured");

    let (status, _) = send(&app, json_request("POST", "/api/voice/synthesize", &json!({"text": "hi"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_voice_transcribe_and_synthesize() {
    let app = build_router(fallback_ai(), stub_voice());

    let request = Request::builder()
        .method("POST")
        .uri("/api/voice/transcribe")
        .body(Body::from(vec![0_u8, 64, 0, 192]))
        .unwrap();
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["text"], "hello there");
    assert!(json["level"].as_f64().unwrap() > 0.0);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/voice/synthesize", &json!({"text": "speak"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/wav");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"speak");
}

#[tokio::test]
async fn test_voice_properties_clamped() {
    let app = build_router(fallback_ai(), no_voice());

    let (_, props) = send(&app, get("/api/voice/properties")).await;
    assert_eq!(props["rate"], 150);

    let (status, props) = send(
        &app,
        json_request("PUT", "/api/voice/properties", &json!({"rate": 1000, "volume": 2.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(props["rate"], 300);
    assert_eq!(props["volume"], 1.0);
}

#[tokio::test]
async fn test_rate_limit() {
    let app = voice_assistant::ApiServerBuilder::new(fallback_ai(), no_voice())
        .rate_limit(Some(1))
        .build()
        .router();

    let (status, _) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["code"], "rate_limited");
}

#[tokio::test]
async fn test_persistent_history_survives_restart() {
    use voice_assistant::ChatHistory;
    use voice_assistant::db::HistoryRepo;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.db");

    {
        let pool = voice_assistant::db::init(&path).unwrap();
        let history = ChatHistory::open(HistoryRepo::new(pool.clone()), 100).unwrap();
        let app = voice_assistant::ApiServerBuilder::new(fallback_ai(), no_voice())
            .db(pool)
            .history(history)
            .build()
            .router();

        send(&app, json_request("POST", "/api/chat", &json!({"message": "remember me"}))).await;

        let (_, ready) = send(&app, get("/ready")).await;
        assert_eq!(ready["checks"]["database"]["status"], "ok");
    }

    let pool = voice_assistant::db::init(&path).unwrap();
    let history = ChatHistory::open(HistoryRepo::new(pool), 100).unwrap();
    let app = voice_assistant::ApiServerBuilder::new(fallback_ai(), no_voice())
        .history(history)
        .build()
        .router();

    let (_, messages) = send(&app, get("/api/chat-history")).await;
    assert_eq!(messages[0]["text"], "remember me");
    assert_eq!(messages.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_history_bad_query_and_path_return_json_errors() {
    let app = build_router(fallback_ai(), no_voice());

    let response = app.clone().oneshot(get("/api/chat-history?limit=abc")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("application/json"));

    let (status, json) = send(&app, get("/api/chat-history?limit=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "invalid_query");
    assert!(json["error"].as_str().unwrap().contains("limit"));

    let (status, json) = send(&app, empty_request("DELETE", "/api/chat-history/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "invalid_path");
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_cleared_history_ids_not_reused_after_restart() {
    use voice_assistant::ChatHistory;
    use voice_assistant::db::HistoryRepo;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.db");

    let open_app = || {
        let pool = voice_assistant::db::init(&path).unwrap();
        let history = ChatHistory::open(HistoryRepo::new(pool.clone()), 100).unwrap();
        voice_assistant::ApiServerBuilder::new(fallback_ai(), no_voice())
            .db(pool)
            .history(history)
            .build()
            .router()
    };

    {
        let app = open_app();
        for message in ["first", "second"] {
            send(&app, json_request("POST", "/api/chat", &json!({"message": message}))).await;
        }
        let (_, cleared) = send(&app, empty_request("POST", "/api/clear-history")).await;
        assert_eq!(cleared["deleted"], 2);
    }

    let app = open_app();
    send(&app, json_request("POST", "/api/chat", &json!({"message": "third"}))).await;

    let (_, messages) = send(&app, get("/api/chat-history")).await;
    assert_eq!(messages.as_array().unwrap().len(), 2);
    assert_eq!(messages[0]["id"], 3);
}

#[tokio::test]
async fn test_bundled_ui_streams_microphone_audio() {
    let static_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static");
    let app = voice_assistant::ApiServerBuilder::new(fallback_ai(), no_voice())
        .static_dir(Some(static_dir))
        .build()
        .router();

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let page = String::from_utf8_lossy(&body);
    assert!(page.contains("getUserMedia"));
    assert!(page.contains("\"audio_chunk\""));
    assert!(page.contains("\"audio_end\""));
}
