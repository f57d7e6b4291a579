//! Voice processing module
//!
//! Speech recognition and synthesis are delegated to the `OpenAI` audio APIs;
//! this module handles the audio plumbing around them.

pub mod audio;
mod properties;
mod service;
mod stream;
mod stt;
mod tts;

pub use audio::{audio_level, ensure_wav, input_level, is_wav, pcm16_samples, pcm16_to_wav};
pub use properties::VoiceProperties;
pub use service::{Transcription, VoiceCapabilities, VoiceService};
pub use stream::{AudioStreamBuffer, MAX_STREAM_SECS};
pub use stt::{SpeechToText, Transcriber};
pub use tts::{Synthesizer, TextToSpeech};
