//! HTTP API server for the voice assistant

pub mod ai;
pub mod chat;
mod error;
pub mod health;
pub mod history;
pub mod rate_limit;
mod shutdown;
pub mod voice;
pub mod websocket;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{Router, response::Html, routing::get};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::ai::AiService;
use crate::config::{AudioConfig, Config};
use crate::db::{self, DbPool, HistoryRepo};
use crate::history::{ChatHistory, DEFAULT_MAX_EXCHANGES};
use crate::voice::VoiceService;
use crate::Result;

pub use error::ApiError;
pub use shutdown::shutdown_signal;

/// Page served at `/` when no static UI is installed
const PLACEHOLDER_INDEX: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>AI Voice Assistant</title></head>
<body>
<h1>AI Voice Assistant</h1>
<p>The server is running. Send chat requests to <code>POST /api/chat</code>
or connect a client to <code>/socket.io</code>.</p>
</body>
</html>
"#;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub ai: Arc<AiService>,
    pub voice: Arc<VoiceService>,
    pub history: Arc<RwLock<ChatHistory>>,
    /// Present only when history persistence is enabled
    pub db: Option<DbPool>,
    pub audio: AudioConfig,
    pub rate_limiter: Option<rate_limit::SharedLimiter>,
}

impl ApiState {
    /// State with in-memory history and no rate limit
    #[must_use]
    pub fn new(ai: AiService, voice: VoiceService) -> Self {
        Self {
            ai: Arc::new(ai),
            voice: Arc::new(voice),
            history: Arc::new(RwLock::new(ChatHistory::new(DEFAULT_MAX_EXCHANGES))),
            db: None,
            audio: AudioConfig::default(),
            rate_limiter: None,
        }
    }
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    ai: AiService,
    voice: VoiceService,
    history: Option<ChatHistory>,
    db: Option<DbPool>,
    audio: AudioConfig,
    host: String,
    port: u16,
    static_dir: Option<PathBuf>,
    rate_limit_per_minute: Option<u32>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(ai: AiService, voice: VoiceService) -> Self {
        Self {
            ai,
            voice,
            history: None,
            db: None,
            audio: AudioConfig::default(),
            host: "0.0.0.0".to_string(),
            port: 5000,
            static_dir: None,
            rate_limit_per_minute: None,
        }
    }

    /// Assemble services, history and server settings from configuration
    ///
    /// # Errors
    ///
    /// Returns error if a provider cannot be constructed or the history
    /// database cannot be opened
    pub fn from_config(config: &Config) -> Result<Self> {
        let ai = AiService::from_config(config)?;
        let voice = VoiceService::from_config(config)?;

        let mut builder = Self::new(ai, voice)
            .audio(config.audio)
            .host(config.server.host.clone())
            .port(config.server.port)
            .static_dir(Some(config.server.static_dir.clone()))
            .rate_limit(config.server.rate_limit_per_minute);

        let max = config.history.max_exchanges;
        builder = match &config.history.database_path {
            Some(path) => {
                let pool = db::init(path)?;
                let history = ChatHistory::open(HistoryRepo::new(pool.clone()), max)?;
                builder.db(pool).history(history)
            }
            None => builder.history(ChatHistory::new(max)),
        };

        Ok(builder)
    }

    /// Set the chat history
    #[must_use]
    pub fn history(mut self, history: ChatHistory) -> Self {
        self.history = Some(history);
        self
    }

    /// Set the database pool backing the history, for readiness checks
    #[must_use]
    pub fn db(mut self, pool: DbPool) -> Self {
        self.db = Some(pool);
        self
    }

    /// Set audio stream parameters
    #[must_use]
    pub const fn audio(mut self, audio: AudioConfig) -> Self {
        self.audio = audio;
        self
    }

    /// Set the bind host
    #[must_use]
    pub fn host(mut self, host: String) -> Self {
        self.host = host;
        self
    }

    /// Set the bind port
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the static files directory for serving the web UI
    #[must_use]
    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Enable a global requests-per-minute limit
    #[must_use]
    pub const fn rate_limit(mut self, per_minute: Option<u32>) -> Self {
        self.rate_limit_per_minute = per_minute;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let history = self
            .history
            .unwrap_or_else(|| ChatHistory::new(DEFAULT_MAX_EXCHANGES));

        let rate_limiter = self.rate_limit_per_minute.map(rate_limit::create_limiter);

        let state = Arc::new(ApiState {
            ai: Arc::new(self.ai),
            voice: Arc::new(self.voice),
            history: Arc::new(RwLock::new(history)),
            db: self.db,
            audio: self.audio,
            rate_limiter,
        });

        ApiServer {
            state,
            host: self.host,
            port: self.port,
            static_dir: self.static_dir,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    host: String,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Shared handler state
    #[must_use]
    pub fn state(&self) -> Arc<ApiState> {
        Arc::clone(&self.state)
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .nest("/api/ai", ai::router(self.state.clone()))
            .nest("/api/voice", voice::router(self.state.clone()))
            .merge(chat::router(self.state.clone()))
            .merge(history::router(self.state.clone()))
            .merge(websocket::router(self.state.clone()))
            .merge(health::router())
            .merge(health::ready_router(self.state.clone()));

        // Serve the web UI when one is installed, otherwise a placeholder
        let index_file = self
            .static_dir
            .as_ref()
            .map(|dir| dir.join("index.html"))
            .filter(|index| index.is_file());

        if let (Some(static_dir), Some(index_file)) = (&self.static_dir, index_file) {
            let serve_dir = ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));
            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        } else {
            router = router.route("/", get(|| async { Html(PLACEHOLDER_INDEX) }));
        }

        let router = router.layer(axum::middleware::from_fn_with_state(
            self.state.clone(),
            rate_limit::rate_limit_middleware,
        ));

        // CORS layer for cross-origin requests from frontend
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server until Ctrl-C or SIGTERM
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server to {addr}: {e}")))?;

        tracing::info!(addr = %addr, "API server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        tracing::info!("API server stopped");
        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
