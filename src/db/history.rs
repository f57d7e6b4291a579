//! Exchange repository for persistent chat history

use chrono::{DateTime, Utc};

use super::DbPool;
use crate::history::Exchange;
use crate::{Error, Result};

/// Exchange repository
#[derive(Clone)]
pub struct HistoryRepo {
    pool: DbPool,
}

impl HistoryRepo {
    /// Create a new history repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<super::DbConn> {
        self.pool.get().map_err(|e| Error::Database(e.to_string()))
    }

    /// Store an exchange
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn insert(&self, exchange: &Exchange) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO exchanges (id, user_text, assistant_text, duration_ms, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                to_sql_int(exchange.id)?,
                &exchange.user,
                &exchange.assistant,
                to_sql_int(exchange.duration_ms)?,
                exchange.timestamp.to_rfc3339(),
            ],
        )?;

        conn.execute(
            "INSERT INTO history_meta (key, value) VALUES ('last_id', ?1)
             ON CONFLICT(key) DO UPDATE SET value = MAX(value, excluded.value)",
            [to_sql_int(exchange.id)?],
        )?;

        Ok(())
    }

    /// Load the newest `limit` exchanges in chronological order
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn load_recent(&self, limit: usize) -> Result<Vec<Exchange>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, user_text, assistant_text, duration_ms, created_at
             FROM exchanges ORDER BY id DESC LIMIT ?1",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut exchanges = stmt
            .query_map([limit], |row| {
                Ok(Exchange {
                    id: u64::try_from(row.get::<_, i64>(0)?).unwrap_or_default(),
                    user: row.get(1)?,
                    assistant: row.get(2)?,
                    duration_ms: u64::try_from(row.get::<_, i64>(3)?).unwrap_or_default(),
                    timestamp: parse_datetime(&row.get::<_, String>(4)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // Reverse to get chronological order
        exchanges.reverse();
        Ok(exchanges)
    }

    /// Highest exchange id ever stored, or 0 when nothing was
    ///
    /// Survives deletes and clears so ids are never handed out twice.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn max_id(&self) -> Result<u64> {
        let conn = self.conn()?;
        let max: i64 = conn.query_row(
            "SELECT MAX(
                 COALESCE((SELECT MAX(id) FROM exchanges), 0),
                 COALESCE((SELECT value FROM history_meta WHERE key = 'last_id'), 0)
             )",
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(max).unwrap_or_default())
    }

    /// Delete one exchange, returning whether it existed
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn delete(&self, id: u64) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM exchanges WHERE id = ?1", [to_sql_int(id)?])?;
        Ok(removed > 0)
    }

    /// Delete every exchange, returning how many were removed
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn clear(&self) -> Result<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM exchanges", [])?)
    }

    /// Count stored exchanges
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM exchanges", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Underlying pool, for health checks
    #[must_use]
    pub const fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn to_sql_int(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::Database(format!("value {value} out of range")))
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
