//! AI service: routes chat messages to a language-model provider
//!
//! Perplexity is preferred by default. When the preferred provider has no API
//! key the other one is used, and with no keys at all replies come from a small
//! offline [`FallbackProvider`].

mod completions;
mod fallback;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::{Error, Result};

pub use completions::{ChatCompletionsProvider, OPENAI_BASE_URL, PERPLEXITY_BASE_URL};
pub use fallback::FallbackProvider;

/// Known provider backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProviderKind {
    Perplexity,
    #[serde(rename = "openai")]
    OpenAi,
    Fallback,
}

impl AiProviderKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Perplexity => "perplexity",
            Self::OpenAi => "openai",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for AiProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only real providers can be selected; the fallback is never a preference
impl FromStr for AiProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "perplexity" => Ok(Self::Perplexity),
            "openai" => Ok(Self::OpenAi),
            other => Err(Error::InvalidInput(format!(
                "invalid AI provider '{other}' (expected 'perplexity' or 'openai')"
            ))),
        }
    }
}

/// A chat-completion backend
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Which backend this is
    fn kind(&self) -> AiProviderKind;

    /// Produce a reply to a single user message
    async fn complete(&self, message: &str, max_tokens: u32) -> Result<String>;
}

/// Reply produced by the AI service
#[derive(Debug, Clone)]
pub struct AiReply {
    pub text: String,
    pub provider: AiProviderKind,
}

/// Provider status snapshot
#[derive(Debug, Clone, Serialize)]
pub struct AiStatus {
    pub preferred: AiProviderKind,
    pub active: AiProviderKind,
    pub perplexity_configured: bool,
    pub openai_configured: bool,
    pub max_tokens: u32,
}

/// Routes messages to the configured provider
pub struct AiService {
    preferred: RwLock<AiProviderKind>,
    perplexity: Option<Arc<dyn ChatProvider>>,
    openai: Option<Arc<dyn ChatProvider>>,
    fallback: Arc<dyn ChatProvider>,
    max_tokens: u32,
}

impl AiService {
    /// Create a service with no remote providers
    #[must_use]
    pub fn new(preferred: AiProviderKind, max_tokens: u32) -> Self {
        Self {
            preferred: RwLock::new(preferred),
            perplexity: None,
            openai: None,
            fallback: Arc::new(FallbackProvider),
            max_tokens,
        }
    }

    /// Build the service from configuration
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client cannot be constructed
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut service = Self::new(config.ai.provider, config.ai.max_tokens);

        if let Some(key) = config.api_keys.perplexity() {
            service.perplexity = Some(Arc::new(ChatCompletionsProvider::perplexity(
                key,
                config.ai.perplexity_model.clone(),
            )?));
        }
        if let Some(key) = config.api_keys.openai() {
            service.openai = Some(Arc::new(ChatCompletionsProvider::openai(
                key,
                config.ai.openai_model.clone(),
            )?));
        }

        tracing::info!(
            preferred = %config.ai.provider,
            perplexity = service.perplexity.is_some(),
            openai = service.openai.is_some(),
            "AI service initialized"
        );
        Ok(service)
    }

    /// Install a Perplexity backend
    #[must_use]
    pub fn with_perplexity(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.perplexity = Some(provider);
        self
    }

    /// Install an `OpenAI` backend
    #[must_use]
    pub fn with_openai(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.openai = Some(provider);
        self
    }

    /// Default completion budget
    #[must_use]
    pub const fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// First configured remote backend in preference order
    async fn remote(&self) -> Option<Arc<dyn ChatProvider>> {
        let preferred = *self.preferred.read().await;

        let ordered = match preferred {
            AiProviderKind::OpenAi => [&self.openai, &self.perplexity],
            AiProviderKind::Perplexity | AiProviderKind::Fallback => {
                [&self.perplexity, &self.openai]
            }
        };

        ordered.into_iter().flatten().next().map(Arc::clone)
    }

    /// Pick the backend for the next request
    async fn resolve(&self) -> Arc<dyn ChatProvider> {
        if let Some(provider) = self.remote().await {
            return provider;
        }

        tracing::warn!("no AI API configured, using fallback response");
        Arc::clone(&self.fallback)
    }

    /// Get a reply for a user message
    ///
    /// `max_tokens` defaults to the configured budget.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank message and `Ai` if the provider fails
    pub async fn get_response(&self, message: &str, max_tokens: Option<u32>) -> Result<AiReply> {
        if message.trim().is_empty() {
            return Err(Error::InvalidInput("Message is required".to_string()));
        }

        let provider = self.resolve().await;
        let kind = provider.kind();
        let budget = max_tokens.unwrap_or(self.max_tokens);

        tracing::debug!(provider = %kind, max_tokens = budget, "requesting AI response");

        let text = provider.complete(message, budget).await.map_err(|e| {
            tracing::error!(provider = %kind, error = %e, "error getting AI response");
            match e {
                Error::Ai(_) => e,
                other => Error::Ai(other.to_string()),
            }
        })?;

        Ok(AiReply { text, provider: kind })
    }

    /// Change the preferred provider
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the name is not `perplexity` or `openai`
    pub async fn set_provider(&self, name: &str) -> Result<AiProviderKind> {
        let kind = name.parse::<AiProviderKind>().inspect_err(|_| {
            tracing::warn!(provider = %name, "invalid AI provider");
        })?;

        *self.preferred.write().await = kind;
        tracing::info!(provider = %kind, "AI provider set");
        Ok(kind)
    }

    /// Currently preferred provider
    pub async fn preferred(&self) -> AiProviderKind {
        *self.preferred.read().await
    }

    /// Check whether the active provider answers
    pub async fn test_connection(&self) -> bool {
        match self.get_response("Hello", Some(10)).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, "connection test failed");
                false
            }
        }
    }

    /// Snapshot of provider configuration
    pub async fn status(&self) -> AiStatus {
        AiStatus {
            preferred: self.preferred().await,
            active: self
                .remote()
                .await
                .map_or(AiProviderKind::Fallback, |p| p.kind()),
            perplexity_configured: self.perplexity.is_some(),
            openai_configured: self.openai.is_some(),
            max_tokens: self.max_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    struct StubProvider {
        kind: AiProviderKind,
        fail: bool,
        last_budget: AtomicU32,
    }

    impl StubProvider {
        fn new(kind: AiProviderKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                fail: false,
                last_budget: AtomicU32::new(0),
            })
        }

        fn failing(kind: AiProviderKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                fail: true,
                last_budget: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl ChatProvider for StubProvider {
        fn kind(&self) -> AiProviderKind {
            self.kind
        }

        async fn complete(&self, message: &str, max_tokens: u32) -> Result<String> {
            self.last_budget.store(max_tokens, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Ai("upstream returned 500".to_string()));
            }
            Ok(format!("{}: {message}", self.kind))
        }
    }

    #[test]
    fn test_parse_provider() {
        assert_eq!("perplexity".parse::<AiProviderKind>().unwrap(), AiProviderKind::Perplexity);
        assert_eq!("OpenAI".parse::<AiProviderKind>().unwrap(), AiProviderKind::OpenAi);
        assert!("fallback".parse::<AiProviderKind>().is_err());
        assert!("claude".parse::<AiProviderKind>().is_err());
    }

    #[tokio::test]
    async fn test_prefers_perplexity_when_both_configured() {
        let service = AiService::new(AiProviderKind::Perplexity, 500)
            .with_perplexity(StubProvider::new(AiProviderKind::Perplexity))
            .with_openai(StubProvider::new(AiProviderKind::OpenAi));

        let reply = service.get_response("hello", None).await.unwrap();
        assert_eq!(reply.provider, AiProviderKind::Perplexity);
        assert_eq!(reply.text, "perplexity: hello");
    }

    #[tokio::test]
    async fn test_falls_over_to_openai_without_perplexity_key() {
        let service = AiService::new(AiProviderKind::Perplexity, 500)
            .with_openai(StubProvider::new(AiProviderKind::OpenAi));

        let reply = service.get_response("hello", None).await.unwrap();
        assert_eq!(reply.provider, AiProviderKind::OpenAi);
    }

    #[tokio::test]
    async fn test_openai_preference_falls_back_to_perplexity() {
        let service = AiService::new(AiProviderKind::OpenAi, 500)
            .with_perplexity(StubProvider::new(AiProviderKind::Perplexity));

        let status = service.status().await;
        assert_eq!(status.preferred, AiProviderKind::OpenAi);
        assert_eq!(status.active, AiProviderKind::Perplexity);
    }

    #[tokio::test]
    async fn test_no_keys_uses_fallback() {
        let service = AiService::new(AiProviderKind::Perplexity, 500);

        let reply = service.get_response("hello there", None).await.unwrap();
        assert_eq!(reply.provider, AiProviderKind::Fallback);
        assert_eq!(reply.text, "Hello! How can I assist you today?");
    }

    #[tokio::test]
    async fn test_blank_message_rejected() {
        let service = AiService::new(AiProviderKind::Perplexity, 500);
        let err = service.get_response("   ", None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_provider_failure_is_an_error() {
        let service = AiService::new(AiProviderKind::Perplexity, 500)
            .with_perplexity(StubProvider::failing(AiProviderKind::Perplexity));

        let err = service.get_response("hello", None).await.unwrap_err();
        assert!(matches!(err, Error::Ai(_)));
        assert!(!service.test_connection().await);
    }

    #[tokio::test]
    async fn test_max_tokens_default_and_override() {
        let stub = StubProvider::new(AiProviderKind::Perplexity);
        let service =
            AiService::new(AiProviderKind::Perplexity, 500).with_perplexity(stub.clone());

        service.get_response("hello", None).await.unwrap();
        assert_eq!(stub.last_budget.load(Ordering::SeqCst), 500);

        assert!(service.test_connection().await);
        assert_eq!(stub.last_budget.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_set_provider() {
        let service = AiService::new(AiProviderKind::Perplexity, 500)
            .with_perplexity(StubProvider::new(AiProviderKind::Perplexity))
            .with_openai(StubProvider::new(AiProviderKind::OpenAi));

        assert_eq!(service.set_provider("openai").await.unwrap(), AiProviderKind::OpenAi);
        let reply = service.get_response("hello", None).await.unwrap();
        assert_eq!(reply.provider, AiProviderKind::OpenAi);

        assert!(service.set_provider("gemini").await.is_err());
        assert_eq!(service.preferred().await, AiProviderKind::OpenAi);
    }
}
