//! Voice service: STT and TTS behind one handle

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use super::audio::{ensure_wav, input_level};
use super::properties::VoiceProperties;
use super::stt::{SpeechToText, Transcriber};
use super::tts::{Synthesizer, TextToSpeech};
use crate::config::Config;
use crate::{Error, Result};

/// Which speech directions are available
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VoiceCapabilities {
    pub stt_available: bool,
    pub tts_available: bool,
}

/// Result of transcribing a clip
#[derive(Debug, Clone, Serialize)]
pub struct Transcription {
    pub text: String,
    /// RMS input level, 0.0 to 1.0
    pub level: f32,
}

/// Speech recognition and synthesis
pub struct VoiceService {
    stt: Option<Arc<dyn Transcriber>>,
    tts: Option<Arc<dyn Synthesizer>>,
    properties: RwLock<VoiceProperties>,
    sample_rate: u32,
}

impl VoiceService {
    /// Create a service with no providers
    #[must_use]
    pub fn new(sample_rate: u32, properties: VoiceProperties) -> Self {
        Self {
            stt: None,
            tts: None,
            properties: RwLock::new(properties),
            sample_rate,
        }
    }

    /// Build from configuration; STT and TTS need `OPENAI_API_KEY`
    ///
    /// # Errors
    ///
    /// Returns error if a provider cannot be constructed
    pub fn from_config(config: &Config) -> Result<Self> {
        let properties = VoiceProperties::new(config.voice.rate, config.voice.volume);
        let mut service = Self::new(config.audio.sample_rate, properties);

        if let Some(key) = config.api_keys.openai() {
            service.stt = Some(Arc::new(SpeechToText::new_whisper(
                key,
                config.voice.stt_model.clone(),
            )?));
        }
        if let Some(key) = config.api_keys.openai() {
            service.tts = Some(Arc::new(TextToSpeech::new_openai(
                key,
                config.voice.tts_voice.clone(),
                config.voice.tts_model.clone(),
            )?));
        }

        if service.stt.is_none() {
            tracing::warn!("OPENAI_API_KEY not set, speech recognition and synthesis disabled");
        }

        tracing::info!(
            sample_rate = service.sample_rate,
            rate = properties.rate,
            volume = properties.volume,
            "voice service initialized"
        );
        Ok(service)
    }

    /// Install a speech recognizer
    #[must_use]
    pub fn with_transcriber(mut self, stt: Arc<dyn Transcriber>) -> Self {
        self.stt = Some(stt);
        self
    }

    /// Install a speech synthesizer
    #[must_use]
    pub fn with_synthesizer(mut self, tts: Arc<dyn Synthesizer>) -> Self {
        self.tts = Some(tts);
        self
    }

    /// Sample rate assumed for raw PCM input
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[must_use]
    pub const fn capabilities(&self) -> VoiceCapabilities {
        VoiceCapabilities {
            stt_available: self.stt.is_some(),
            tts_available: self.tts.is_some(),
        }
    }

    /// Transcribe raw PCM16 or WAV audio
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for empty audio, `NotConfigured` without STT,
    /// or the provider's error
    pub async fn transcribe(&self, audio: &[u8]) -> Result<Transcription> {
        if audio.is_empty() {
            return Err(Error::InvalidInput("Empty audio data".to_string()));
        }

        let stt = self
            .stt
            .as_ref()
            .ok_or_else(|| Error::NotConfigured("speech recognition".to_string()))?;

        let wav = ensure_wav(audio, self.sample_rate)?;
        let level = input_level(audio);
        let text = stt.transcribe(&wav).await?;

        Ok(Transcription { text, level })
    }

    /// Synthesize speech as WAV bytes
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for blank text, `NotConfigured` without TTS,
    /// or the provider's error
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("Empty text".to_string()));
        }

        let tts = self
            .tts
            .as_ref()
            .ok_or_else(|| Error::NotConfigured("speech synthesis".to_string()))?;

        let properties = *self.properties.read().await;
        tts.synthesize(text, properties).await
    }

    /// Current synthesis properties
    pub async fn properties(&self) -> VoiceProperties {
        *self.properties.read().await
    }

    /// Update rate and/or volume; values are clamped into range
    pub async fn set_properties(&self, rate: Option<u32>, volume: Option<f32>) -> VoiceProperties {
        let mut props = self.properties.write().await;
        if let Some(rate) = rate {
            props.set_rate(rate);
        }
        if let Some(volume) = volume {
            props.set_volume(volume);
        }
        tracing::info!(rate = props.rate, volume = props.volume, "voice properties set");
        *props
    }
}
