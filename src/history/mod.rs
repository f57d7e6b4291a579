//! Chat history
//!
//! A bounded, chronological log of user/assistant exchanges. When a
//! [`HistoryRepo`] is attached every mutation is written through to SQLite,
//! and the newest exchanges are reloaded on startup.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::db::HistoryRepo;

/// Default number of exchanges kept in memory
pub const DEFAULT_MAX_EXCHANGES: usize = 100;

/// One user message and the assistant's reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub assistant: String,
    pub duration_ms: u64,
}

/// Who sent a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single message, flattened out of an [`Exchange`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "id")]
    pub exchange_id: u64,
    pub role: MessageRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate statistics over the stored exchanges
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    pub total_exchanges: usize,
    /// Mean assistant reply length in characters
    pub avg_response_length: usize,
    pub first_exchange: Option<DateTime<Utc>>,
    pub last_exchange: Option<DateTime<Utc>>,
}

/// Bounded chat history with optional write-through persistence
pub struct ChatHistory {
    exchanges: VecDeque<Exchange>,
    max_exchanges: usize,
    next_id: u64,
    repo: Option<HistoryRepo>,
}

impl ChatHistory {
    /// Create an in-memory history holding at most `max_exchanges`
    #[must_use]
    pub fn new(max_exchanges: usize) -> Self {
        let max_exchanges = max_exchanges.max(1);
        Self {
            exchanges: VecDeque::with_capacity(max_exchanges.min(DEFAULT_MAX_EXCHANGES)),
            max_exchanges,
            next_id: 1,
            repo: None,
        }
    }

    /// Open a persistent history, loading the newest stored exchanges
    ///
    /// # Errors
    ///
    /// Returns error if the stored exchanges cannot be read
    pub fn open(repo: HistoryRepo, max_exchanges: usize) -> Result<Self> {
        let mut history = Self::new(max_exchanges);
        let loaded = repo.load_recent(history.max_exchanges)?;
        history.next_id = repo.max_id()? + 1;
        history.exchanges = loaded.into();
        history.repo = Some(repo);

        tracing::info!(
            loaded = history.exchanges.len(),
            next_id = history.next_id,
            "chat history loaded"
        );
        Ok(history)
    }

    /// Capacity in exchanges
    #[must_use]
    pub const fn max_exchanges(&self) -> usize {
        self.max_exchanges
    }

    /// Whether mutations are persisted
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        self.repo.is_some()
    }

    /// Append an exchange, evicting the oldest one past capacity
    ///
    /// Persistence failures are logged; the in-memory log stays authoritative.
    pub fn add_exchange(
        &mut self,
        user: impl Into<String>,
        assistant: impl Into<String>,
        duration: Duration,
    ) -> Exchange {
        let exchange = Exchange {
            id: self.next_id,
            timestamp: Utc::now(),
            user: user.into(),
            assistant: assistant.into(),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        };
        self.next_id += 1;

        if let Some(repo) = &self.repo
            && let Err(e) = repo.insert(&exchange)
        {
            tracing::warn!(id = exchange.id, error = %e, "failed to persist exchange");
        }

        self.exchanges.push_back(exchange.clone());
        while self.exchanges.len() > self.max_exchanges {
            if let Some(evicted) = self.exchanges.pop_front() {
                tracing::debug!(id = evicted.id, "evicted oldest exchange");
            }
        }

        exchange
    }

    /// Most recent exchange
    #[must_use]
    pub fn last(&self) -> Option<&Exchange> {
        self.exchanges.back()
    }

    /// Timestamp of the most recent exchange
    #[must_use]
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last().map(|e| e.timestamp)
    }

    /// All exchanges, oldest first
    #[must_use]
    pub fn exchanges(&self) -> Vec<Exchange> {
        self.exchanges.iter().cloned().collect()
    }

    /// Every exchange split into a user and an assistant message
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.exchanges
            .iter()
            .flat_map(|e| {
                [
                    ChatMessage {
                        exchange_id: e.id,
                        role: MessageRole::User,
                        text: e.user.clone(),
                        timestamp: e.timestamp,
                    },
                    ChatMessage {
                        exchange_id: e.id,
                        role: MessageRole::Assistant,
                        text: e.assistant.clone(),
                        timestamp: e.timestamp,
                    },
                ]
            })
            .collect()
    }

    /// A window of exchanges, oldest first
    #[must_use]
    pub fn page(&self, limit: usize, offset: usize) -> Vec<Exchange> {
        self.exchanges
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Exchanges whose user or assistant text contains `query`, ignoring case
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<Exchange> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.exchanges
            .iter()
            .filter(|e| {
                e.user.to_lowercase().contains(&needle)
                    || e.assistant.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Remove every exchange, returning how many were held in memory
    pub fn clear(&mut self) -> usize {
        let removed = self.exchanges.len();
        self.exchanges.clear();

        if let Some(repo) = &self.repo
            && let Err(e) = repo.clear()
        {
            tracing::warn!(error = %e, "failed to clear persisted history");
        }

        tracing::info!(removed, "chat history cleared");
        removed
    }

    /// Remove one exchange by id
    pub fn delete(&mut self, id: u64) -> bool {
        let before = self.exchanges.len();
        self.exchanges.retain(|e| e.id != id);
        let mut removed = self.exchanges.len() < before;

        if let Some(repo) = &self.repo {
            match repo.delete(id) {
                Ok(stored) => removed |= stored,
                Err(e) => tracing::warn!(id, error = %e, "failed to delete persisted exchange"),
            }
        }

        removed
    }

    #[must_use]
    pub fn summary(&self) -> HistorySummary {
        let total = self.exchanges.len();
        let chars: usize = self
            .exchanges
            .iter()
            .map(|e| e.assistant.chars().count())
            .sum();

        HistorySummary {
            total_exchanges: total,
            avg_response_length: chars.checked_div(total).unwrap_or(0),
            first_exchange: self.exchanges.front().map(|e| e.timestamp),
            last_exchange: self.last_timestamp(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXCHANGES)
    }
}
