//! Configuration management for the voice assistant gateway
//!
//! Precedence is environment > TOML file > built-in default. A `.env` file in
//! the working directory is loaded into the environment first.

pub mod file;

use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};

use crate::ai::AiProviderKind;
use file::ConfigFile;

/// Placeholder used when `SECRET_KEY` is not set
pub const DEFAULT_SECRET_KEY: &str = "your-secret-key-here";

/// Gateway configuration
#[derive(Debug)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Audio input configuration
    pub audio: AudioConfig,

    /// AI provider configuration
    pub ai: AiConfig,

    /// Speech configuration
    pub voice: VoiceConfig,

    /// Chat history configuration
    pub history: HistoryConfig,

    /// API keys
    pub api_keys: ApiKeys,

    /// Application secret (session signing)
    pub secret_key: SecretString,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Path to static files directory (web UI)
    pub static_dir: PathBuf,

    /// Requests per minute across all clients; `None` disables limiting
    pub rate_limit_per_minute: Option<u32>,
}

/// Audio input configuration
#[derive(Debug, Clone, Copy)]
pub struct AudioConfig {
    /// Sample rate of incoming PCM16 audio
    pub sample_rate: u32,

    /// Streaming chunk size in bytes advertised to clients
    pub chunk_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            chunk_size: 1024,
        }
    }
}

/// AI provider configuration
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Preferred provider
    pub provider: AiProviderKind,

    /// Perplexity chat model
    pub perplexity_model: String,

    /// `OpenAI` chat model
    pub openai_model: String,

    /// Default completion budget
    pub max_tokens: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProviderKind::Perplexity,
            perplexity_model: "sonar".to_string(),
            openai_model: "gpt-3.5-turbo".to_string(),
            max_tokens: 500,
        }
    }
}

/// Speech configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// Speaking rate in words per minute
    pub rate: u32,

    /// Output volume (0.0 to 1.0)
    pub volume: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_model: "whisper-1".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            rate: 150,
            volume: 0.9,
        }
    }
}

/// Chat history configuration
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum exchanges kept in memory
    pub max_exchanges: usize,

    /// `SQLite` file for persistence; `None` keeps history in memory only
    pub database_path: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_exchanges: 100,
            database_path: None,
        }
    }
}

/// API keys for external services
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (chat, Whisper and TTS)
    pub openai: Option<SecretString>,

    /// Perplexity API key (chat)
    pub perplexity: Option<SecretString>,
}

impl ApiKeys {
    /// Copy of the `OpenAI` key for handing to a provider client
    #[must_use]
    pub fn openai(&self) -> Option<SecretString> {
        self.openai.as_ref().map(copy_secret)
    }

    /// Copy of the Perplexity key for handing to a provider client
    #[must_use]
    pub fn perplexity(&self) -> Option<SecretString> {
        self.perplexity.as_ref().map(copy_secret)
    }
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}

impl Config {
    /// Load configuration from `.env`, the process environment and the TOML file
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn load() -> crate::Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "failed to load .env file"),
        }

        let fc = file::load_config_file();
        Self::from_sources(|key| std::env::var(key).ok(), fc)
    }

    /// Build configuration from an environment lookup and a parsed config file
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn from_sources<F>(env: F, fc: ConfigFile) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let api_keys = ApiKeys {
            openai: env("OPENAI_API_KEY")
                .or(fc.api_keys.openai)
                .map(SecretString::from),
            perplexity: env("PERPLEXITY_API_KEY")
                .or(fc.api_keys.perplexity)
                .map(SecretString::from),
        };

        let secret_key = env("SECRET_KEY").or(fc.api_keys.secret_key).unwrap_or_else(|| {
            tracing::warn!("SECRET_KEY not set, using insecure placeholder");
            DEFAULT_SECRET_KEY.to_string()
        });

        let server = ServerConfig {
            host: env("HOST")
                .or(fc.server.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_env(&env, "PORT")?.or(fc.server.port).unwrap_or(5000),
            static_dir: env("STATIC_DIR")
                .or(fc.server.static_dir)
                .map_or_else(|| PathBuf::from("static"), PathBuf::from),
            rate_limit_per_minute: parse_env(&env, "RATE_LIMIT_PER_MINUTE")?
                .or(fc.server.rate_limit_per_minute)
                .filter(|rpm| *rpm > 0),
        };

        let audio_defaults = AudioConfig::default();
        let audio = AudioConfig {
            sample_rate: parse_env(&env, "AUDIO_SAMPLE_RATE")?
                .or(fc.audio.sample_rate)
                .unwrap_or(audio_defaults.sample_rate),
            chunk_size: parse_env(&env, "AUDIO_CHUNK_SIZE")?
                .or(fc.audio.chunk_size)
                .unwrap_or(audio_defaults.chunk_size),
        };
        if audio.sample_rate == 0 {
            return Err(crate::Error::Config("AUDIO_SAMPLE_RATE must be positive".to_string()));
        }
        if audio.chunk_size == 0 {
            return Err(crate::Error::Config("AUDIO_CHUNK_SIZE must be positive".to_string()));
        }

        let ai_defaults = AiConfig::default();
        let provider = match env("AI_PROVIDER").or(fc.ai.provider) {
            Some(name) => name
                .parse::<AiProviderKind>()
                .map_err(|e| crate::Error::Config(format!("AI_PROVIDER: {e}")))?,
            None => ai_defaults.provider,
        };
        let ai = AiConfig {
            provider,
            perplexity_model: env("PERPLEXITY_MODEL")
                .or(fc.ai.perplexity_model)
                .unwrap_or(ai_defaults.perplexity_model),
            openai_model: env("OPENAI_MODEL")
                .or(fc.ai.openai_model)
                .unwrap_or(ai_defaults.openai_model),
            max_tokens: parse_env(&env, "AI_MAX_TOKENS")?
                .or(fc.ai.max_tokens)
                .unwrap_or(ai_defaults.max_tokens),
        };

        let voice_defaults = VoiceConfig::default();
        let voice = VoiceConfig {
            stt_model: env("STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or(voice_defaults.stt_model),
            tts_model: env("TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or(voice_defaults.tts_model),
            tts_voice: env("TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or(voice_defaults.tts_voice),
            rate: parse_env(&env, "TTS_RATE")?
                .or(fc.voice.rate)
                .unwrap_or(voice_defaults.rate),
            volume: parse_env(&env, "TTS_VOLUME")?
                .or(fc.voice.volume)
                .unwrap_or(voice_defaults.volume),
        };

        let history = HistoryConfig {
            max_exchanges: parse_env(&env, "HISTORY_MAX_MESSAGES")?
                .or(fc.history.max_exchanges)
                .unwrap_or_else(|| HistoryConfig::default().max_exchanges),
            database_path: env("HISTORY_DB_PATH")
                .or(fc.history.database_path)
                .map(PathBuf::from),
        };

        Ok(Self {
            server,
            audio,
            ai,
            voice,
            history,
            api_keys,
            secret_key: SecretString::from(secret_key),
        })
    }

    /// Whether the secret key is still the insecure placeholder
    #[must_use]
    pub fn uses_default_secret(&self) -> bool {
        self.secret_key.expose_secret() == DEFAULT_SECRET_KEY
    }
}

/// Parse an optional environment value, rejecting malformed input
fn parse_env<T, F>(env: &F, key: &str) -> crate::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    env(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| crate::Error::Config(format!("invalid {key} '{raw}': {e}")))
        })
        .transpose()
}
