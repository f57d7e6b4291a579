//! Voice Assistant - web backend for a speech-driven AI assistant
//!
//! This library provides the core functionality for the assistant server:
//! - AI replies via Perplexity or `OpenAI` chat completions, with an offline fallback
//! - Speech-to-text and text-to-speech via the `OpenAI` audio APIs
//! - A bounded chat history, optionally persisted to `SQLite`
//! - The HTTP and WebSocket API tying these together
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     Clients                          │
//! │      Browser UI  │  REST callers  │  WebSocket       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                   API server                         │
//! │   Chat  │  History  │  Voice  │  /socket.io          │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │               External providers                     │
//! │   Perplexity  │  OpenAI chat  │  Whisper  │  TTS     │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod ai;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod voice;

pub use ai::{AiProviderKind, AiService, ChatProvider};
pub use api::{ApiServer, ApiServerBuilder, ApiState};
pub use config::Config;
pub use db::{DbConn, DbPool};
pub use error::{Error, Result};
pub use history::{ChatHistory, ChatMessage, Exchange, HistorySummary, MessageRole};
pub use voice::{VoiceProperties, VoiceService};
