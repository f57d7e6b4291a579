//! Text-to-speech (TTS) processing

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::audio::scale_wav_volume;
use super::properties::VoiceProperties;
use crate::{Error, Result};

/// Upper bound on a single speech API call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Converts text to WAV audio
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` using the given rate and volume
    async fn synthesize(&self, text: &str, properties: VoiceProperties) -> Result<Vec<u8>>;
}

/// Synthesizes speech with the `OpenAI` speech API
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    voice: String,
    model: String,
    base_url: String,
}

impl TextToSpeech {
    /// Create a new TTS instance using `OpenAI`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_openai(api_key: SecretString, voice: String, model: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            voice,
            model,
            base_url: crate::ai::OPENAI_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint (proxies, tests)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replace the default 30 s request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }
}

#[async_trait]
impl Synthesizer for TextToSpeech {
    async fn synthesize(&self, text: &str, properties: VoiceProperties) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
            response_format: &'static str,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: properties.speed(),
            response_format: "wav",
        };

        let url = format!("{}/audio/speech", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Tts(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "OpenAI TTS error");
            return Err(Error::Tts(format!("OpenAI TTS error {status}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Tts(e.to_string()))?
            .to_vec();

        let preview: String = text.chars().take(50).collect();
        tracing::info!(bytes = audio.len(), text = %preview, "generated speech");

        if properties.volume < 1.0 {
            match scale_wav_volume(&audio, properties.volume) {
                Ok(scaled) => return Ok(scaled),
                Err(e) => tracing::warn!(error = %e, "could not apply volume, returning unscaled audio"),
            }
        }

        Ok(audio)
    }
}
