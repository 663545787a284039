//! Expiring store of rendered reports.
//!
//! Entries live in the `analysis_cache` table. An entry past its expiry is a
//! miss and is deleted the first time it is looked up.

use crate::db::{CachedAnalysis, Database};
use crate::personality::PersonalityResult;
use crate::types::CacheKey;
use crate::Result;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Report cache over a [`Database`].
pub struct ReportCache {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ReportCache {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>, expire_days: u32) -> Self {
        Self {
            db,
            clock,
            ttl: Duration::days(i64::from(expire_days)),
        }
    }

    /// How long an entry stays valid.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a fresh entry.
    pub fn get(&self, key: &CacheKey) -> Result<Option<CachedAnalysis>> {
        let Some(entry) = self.db.get_cached_analysis(key)? else {
            return Ok(None);
        };

        let now = self.clock.now();
        if !entry.is_fresh(now) {
            tracing::info!(key = %key, expired_at = %entry.expires_at, "Cache entry expired");
            self.db.delete_cached_analysis(key)?;
            return Ok(None);
        }

        tracing::debug!(key = %key, "Cache hit");
        Ok(Some(entry))
    }

    /// Store a report, replacing any previous entry for the key.
    pub fn put(
        &self,
        key: CacheKey,
        report_markdown: String,
        result: PersonalityResult,
    ) -> Result<CachedAnalysis> {
        // Rows store whole seconds
        let now = self.clock.now();
        let created_at = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        let entry = CachedAnalysis {
            key,
            report_markdown,
            result,
            created_at,
            expires_at: created_at + self.ttl,
        };
        self.db.upsert_cached_analysis(&entry)?;
        tracing::info!(key = %entry.key, expires_at = %entry.expires_at, "Cached analysis");
        Ok(entry)
    }

    /// Delete every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let purged = self.db.delete_expired_cache(self.clock.now())?;
        if purged > 0 {
            tracing::info!(purged, "Purged expired cache entries");
        }
        Ok(purged)
    }

    /// Remove one entry. Returns whether it existed.
    pub fn clear(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.db.delete_cached_analysis(key)? > 0)
    }

    /// Remove every entry.
    pub fn clear_all(&self) -> Result<usize> {
        self.db.delete_all_cache()
    }

    /// Remove every window cached for one user in one chat.
    pub fn clear_user(&self, chat_key: &str, user_id: &str) -> Result<usize> {
        let removed = self.db.delete_user_cache(chat_key, user_id)?;
        tracing::info!(chat_key, user_id, removed, "Cleared user cache");
        Ok(removed)
    }

    /// Freshest unexpired entry for a user in a chat, any window.
    pub fn latest_for_user(&self, chat_key: &str, user_id: &str) -> Result<Option<CachedAnalysis>> {
        self.db.latest_user_cache(chat_key, user_id, self.clock.now())
    }
}
