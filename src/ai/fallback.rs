//! Offline replies used when no AI provider is configured

use async_trait::async_trait;

use super::{AiProviderKind, ChatProvider};
use crate::Result;

/// Pattern-based responder that needs no network access
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackProvider;

impl FallbackProvider {
    /// Reply to a message using simple keyword patterns
    #[must_use]
    pub fn reply(message: &str) -> String {
        let lower = message.to_lowercase();
        let has_word = |word: &str| {
            lower
                .split(|c: char| !c.is_alphanumeric())
                .any(|token| token == word)
        };

        if lower.contains("hello") || has_word("hi") {
            "Hello! How can I assist you today?".to_string()
        } else if lower.contains("how are you") {
            "I am functioning well. Thank you for asking!".to_string()
        } else if lower.contains("weather") {
            "I would need API access to check current weather conditions.".to_string()
        } else if has_word("time") {
            format!(
                "The current time is {}.",
                chrono::Local::now().format("%H:%M:%S")
            )
        } else {
            format!(
                "I understand you said: \"{message}\". Please configure an AI API to get more detailed responses."
            )
        }
    }
}

#[async_trait]
impl ChatProvider for FallbackProvider {
    fn kind(&self) -> AiProviderKind {
        AiProviderKind::Fallback
    }

    async fn complete(&self, message: &str, _max_tokens: u32) -> Result<String> {
        Ok(Self::reply(message))
    }
}
