//! OpenAI-compatible chat completions (used by both Perplexity and `OpenAI`)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{AiProviderKind, ChatProvider};
use crate::{Error, Result};

/// Perplexity API base URL
pub const PERPLEXITY_BASE_URL: &str = "https://api.perplexity.ai";

/// `OpenAI` API base URL
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Chat completions client for an OpenAI-compatible endpoint
pub struct ChatCompletionsProvider {
    client: Client,
    kind: AiProviderKind,
    base_url: String,
    api_key: SecretString,
    model: String,
    temperature: Option<f32>,
}

impl ChatCompletionsProvider {
    /// Create a Perplexity provider
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn perplexity(api_key: SecretString, model: String) -> Result<Self> {
        Self::build(AiProviderKind::Perplexity, PERPLEXITY_BASE_URL, api_key, model, None)
    }

    /// Create an `OpenAI` provider
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn openai(api_key: SecretString, model: String) -> Result<Self> {
        Self::build(AiProviderKind::OpenAi, OPENAI_BASE_URL, api_key, model, Some(0.7))
    }

    fn build(
        kind: AiProviderKind,
        base_url: &str,
        api_key: SecretString,
        model: String,
        temperature: Option<f32>,
    ) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(format!("{kind} API key required")));
        }

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            kind,
            base_url: base_url.to_string(),
            api_key,
            model,
            temperature,
        })
    }

    /// Point the provider at a different endpoint (proxies, tests)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatProvider for ChatCompletionsProvider {
    fn kind(&self) -> AiProviderKind {
        self.kind
    }

    async fn complete(&self, message: &str, max_tokens: u32) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![RequestMessage {
                role: "user",
                content: message,
            }],
            max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Ai(format!("{} request failed: {e}", self.kind)))?;

        let status = response.status();
        tracing::debug!(provider = %self.kind, status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(provider = %self.kind, status = %status, body = %body, "API error");
            return Err(Error::Ai(format!("{} API error {status}", self.kind)));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Ai(format!("failed to parse {} response: {e}", self.kind)))?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Ai(format!("{} returned no content", self.kind)))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
