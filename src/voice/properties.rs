//! Speech synthesis properties

use serde::{Deserialize, Serialize};

/// Rate and volume applied to synthesized speech
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceProperties {
    /// Words per minute
    pub rate: u32,
    /// Output volume, 0.0 to 1.0
    pub volume: f32,
}

impl VoiceProperties {
    pub const MIN_RATE: u32 = 50;
    pub const MAX_RATE: u32 = 300;
    pub const DEFAULT_RATE: u32 = 150;
    pub const DEFAULT_VOLUME: f32 = 0.9;

    /// Create properties, clamping both values into range
    #[must_use]
    pub fn new(rate: u32, volume: f32) -> Self {
        let mut props = Self::default();
        props.set_rate(rate);
        props.set_volume(volume);
        props
    }

    pub fn set_rate(&mut self, rate: u32) {
        self.rate = rate.clamp(Self::MIN_RATE, Self::MAX_RATE);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_nan() {
            Self::DEFAULT_VOLUME
        } else {
            volume.clamp(0.0, 1.0)
        };
    }

    /// Provider speed multiplier, where the default rate is 1.0
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn speed(&self) -> f32 {
        (self.rate as f32 / Self::DEFAULT_RATE as f32).clamp(0.25, 4.0)
    }
}

impl Default for VoiceProperties {
    fn default() -> Self {
        Self {
            rate: Self::DEFAULT_RATE,
            volume: Self::DEFAULT_VOLUME,
        }
    }
}
