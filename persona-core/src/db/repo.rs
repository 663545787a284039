//! Database repository layer
//!
//! Provides query and insert operations for chat history and cached analyses.

use crate::error::{Error, Result};
use crate::history::HistoryQuery;
use crate::personality::PersonalityResult;
use crate::types::*;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Mutex;

/// Characters stripped before the minimum-length check on message text.
///
/// The Unicode `White_Space` set, so the SQL filter agrees with `str::trim`.
const TRIM_CHARS: &str = "char(9, 10, 11, 12, 13, 32, 133, 160, 5760, \
    8192, 8193, 8194, 8195, 8196, 8197, 8198, 8199, 8200, 8201, 8202, \
    8232, 8233, 8239, 8287, 12288)";

/// A stored analysis, as read back from `analysis_cache`.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAnalysis {
    pub key: CacheKey,
    /// Rendered report, returned verbatim on a hit
    pub report_markdown: String,
    /// Structured model output behind the report
    pub result: PersonalityResult,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CachedAnalysis {
    /// Whether this entry is still valid at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Database handle (single connection behind a mutex)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    // ============================================
    // Chat message operations
    // ============================================

    /// Insert multiple chat messages in a transaction
    pub fn insert_chat_messages(&self, messages: &[ChatMessage]) -> Result<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        for message in messages {
            tx.execute(
                r#"
                INSERT INTO chat_messages (chat_key, sender_id, sender_nickname, sent_at, text,
                                           has_mention, has_emoji, is_system, is_recalled)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    message.chat_key,
                    message.sender_id,
                    message.sender_nickname,
                    message.sent_at.timestamp(),
                    message.text,
                    message.has_mention,
                    message.has_emoji,
                    message.is_system,
                    message.is_recalled,
                ],
            )?;
        }

        tx.commit()?;
        Ok(messages.len())
    }

    /// Fetch the newest eligible messages for one sender, newest first.
    ///
    /// System and recalled messages are excluded, as is any text shorter than
    /// two characters once surrounding whitespace is removed.
    pub fn query_chat_messages(&self, query: &HistoryQuery) -> Result<Vec<ChatMessage>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            r#"
            SELECT * FROM chat_messages
            WHERE chat_key = ?1
              AND sender_id = ?2
              AND sent_at >= ?3
              AND sent_at <= ?4
              AND is_system = 0
              AND is_recalled = 0
              AND length(trim(text, {TRIM_CHARS})) >= 2
            ORDER BY sent_at DESC, id DESC
            LIMIT ?5
            "#
        );
        let mut stmt = conn.prepare(&sql)?;

        let messages = stmt
            .query_map(
                params![
                    query.chat_key,
                    query.user_id,
                    query.since.timestamp(),
                    query.until.timestamp(),
                    query.limit as i64,
                ],
                Self::row_to_chat_message,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(messages)
    }

    /// Count all stored chat messages
    pub fn count_chat_messages(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chat_messages", [], |r| r.get(0))?;
        Ok(count)
    }

    fn row_to_chat_message(row: &Row) -> rusqlite::Result<ChatMessage> {
        let sent_at: i64 = row.get("sent_at")?;
        Ok(ChatMessage {
            chat_key: row.get("chat_key")?,
            sender_id: row.get("sender_id")?,
            sender_nickname: row.get("sender_nickname")?,
            sent_at: from_unix(sent_at),
            text: row.get("text")?,
            has_mention: row.get("has_mention")?,
            has_emoji: row.get("has_emoji")?,
            is_system: row.get("is_system")?,
            is_recalled: row.get("is_recalled")?,
        })
    }

    // ============================================
    // Analysis cache operations
    // ============================================

    /// Get the cache row for a key, fresh or not
    pub fn get_cached_analysis(&self, key: &CacheKey) -> Result<Option<CachedAnalysis>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            r#"
            SELECT * FROM analysis_cache
            WHERE chat_key = ?1 AND user_id = ?2 AND days = ?3 AND max_messages = ?4
            "#,
            params![key.chat_key, key.user_id, key.days, key.max_messages as i64],
            Self::row_to_cached_analysis,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Insert or replace the cache row for `entry.key`
    pub fn upsert_cached_analysis(&self, entry: &CachedAnalysis) -> Result<()> {
        let result = serde_json::to_string(&entry.result)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO analysis_cache (chat_key, user_id, days, max_messages,
                                        report_markdown, result, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(chat_key, user_id, days, max_messages) DO UPDATE SET
                report_markdown = excluded.report_markdown,
                result = excluded.result,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at
            "#,
            params![
                entry.key.chat_key,
                entry.key.user_id,
                entry.key.days,
                entry.key.max_messages as i64,
                entry.report_markdown,
                result,
                entry.created_at.timestamp(),
                entry.expires_at.timestamp(),
            ],
        )?;
        Ok(())
    }

    /// Delete the cache row for one key
    pub fn delete_cached_analysis(&self, key: &CacheKey) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            r#"
            DELETE FROM analysis_cache
            WHERE chat_key = ?1 AND user_id = ?2 AND days = ?3 AND max_messages = ?4
            "#,
            params![key.chat_key, key.user_id, key.days, key.max_messages as i64],
        )?;
        Ok(deleted)
    }

    /// Delete every cache row for a user in a chat, whatever the window
    pub fn delete_user_cache(&self, chat_key: &str, user_id: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM analysis_cache WHERE chat_key = ?1 AND user_id = ?2",
            params![chat_key, user_id],
        )?;
        Ok(deleted)
    }

    /// Delete every cache row
    pub fn delete_all_cache(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM analysis_cache", [])?;
        Ok(deleted)
    }

    /// Delete rows whose expiry is at or before `now`
    pub fn delete_expired_cache(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM analysis_cache WHERE expires_at <= ?1",
            params![now.timestamp()],
        )?;
        Ok(deleted)
    }

    /// Most recently written unexpired cache row for a user in a chat, any window
    pub fn latest_user_cache(
        &self,
        chat_key: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CachedAnalysis>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            r#"
            SELECT * FROM analysis_cache
            WHERE chat_key = ?1 AND user_id = ?2 AND expires_at > ?3
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            params![chat_key, user_id, now.timestamp()],
            Self::row_to_cached_analysis,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Count cache rows (fresh and stale)
    pub fn count_cached_analyses(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM analysis_cache", [], |r| r.get(0))?;
        Ok(count)
    }

    fn row_to_cached_analysis(row: &Row) -> rusqlite::Result<CachedAnalysis> {
        let max_messages: i64 = row.get("max_messages")?;
        let result_str: String = row.get("result")?;
        let created_at: i64 = row.get("created_at")?;
        let expires_at: i64 = row.get("expires_at")?;

        let result = serde_json::from_str(&result_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;

        Ok(CachedAnalysis {
            key: CacheKey {
                chat_key: row.get("chat_key")?,
                user_id: row.get("user_id")?,
                days: row.get("days")?,
                max_messages: max_messages.max(0) as usize,
            },
            report_markdown: row.get("report_markdown")?,
            result,
            created_at: from_unix(created_at),
            expires_at: from_unix(expires_at),
        })
    }
}

fn from_unix(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()
    }

    fn query(limit: usize) -> HistoryQuery {
        HistoryQuery {
            chat_key: "group_1".to_string(),
            user_id: "alice".to_string(),
            since: at(0, 0),
            until: at(23, 59),
            limit,
        }
    }

    fn sample_entry(key: CacheKey, created_at: DateTime<Utc>) -> CachedAnalysis {
        CachedAnalysis {
            key,
            report_markdown: "# report".to_string(),
            result: PersonalityResult::empty(),
            created_at,
            expires_at: created_at + Duration::days(7),
        }
    }

    fn key(user: &str, days: u32) -> CacheKey {
        CacheKey {
            chat_key: "group_1".to_string(),
            user_id: user.to_string(),
            days,
            max_messages: 500,
        }
    }

    #[test]
    fn test_query_filters_and_orders() {
        let db = test_db();
        let mut recalled = ChatMessage::new("group_1", "alice", "Alice", at(9, 0), "oops wrong chat");
        recalled.is_recalled = true;
        let mut system = ChatMessage::new("group_1", "alice", "Alice", at(9, 5), "alice joined");
        system.is_system = true;

        db.insert_chat_messages(&[
            ChatMessage::new("group_1", "alice", "Alice", at(8, 0), "good morning all"),
            ChatMessage::new("group_1", "alice", "Alice", at(8, 30), " k "),
            ChatMessage::new("group_1", "bob", "Bob", at(8, 45), "morning alice"),
            ChatMessage::new("group_2", "alice", "Alice", at(8, 50), "other chat"),
            recalled,
            system,
            ChatMessage::new("group_1", "alice", "Alice", at(10, 0), "lunch at noon?"),
        ])
        .unwrap();

        let messages = db.query_chat_messages(&query(100)).unwrap();
        let texts: Vec<_> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["lunch at noon?", "good morning all"]);
        assert_eq!(messages[0].sent_at, at(10, 0));
    }

    #[test]
    fn test_query_trims_unicode_whitespace() {
        let db = test_db();
        let messages = vec![
            ChatMessage::new("group_1", "alice", "Alice", at(8, 0), "\u{3000}嗯"),
            ChatMessage::new("group_1", "alice", "Alice", at(8, 1), "\u{a0}a\u{a0}"),
            ChatMessage::new("group_1", "alice", "Alice", at(8, 2), "\u{b}\u{c}x\u{2003}"),
            ChatMessage::new("group_1", "alice", "Alice", at(8, 3), "\u{3000}好的"),
        ];
        db.insert_chat_messages(&messages).unwrap();

        let found = db.query_chat_messages(&query(100)).unwrap();
        let texts: Vec<_> = found.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["\u{3000}好的"]);

        let eligible: Vec<_> = messages
            .iter()
            .filter(|m| crate::history::is_eligible(m))
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(eligible, texts);
    }

    #[test]
    fn test_query_limit_keeps_newest() {
        let db = test_db();
        let messages: Vec<_> = (0..10)
            .map(|i| ChatMessage::new("group_1", "alice", "Alice", at(8, i), format!("message {i}")))
            .collect();
        db.insert_chat_messages(&messages).unwrap();

        let newest = db.query_chat_messages(&query(3)).unwrap();
        let texts: Vec<_> = newest.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["message 9", "message 8", "message 7"]);
        assert_eq!(db.count_chat_messages().unwrap(), 10);
    }

    #[test]
    fn test_cache_upsert_and_get() {
        let db = test_db();
        let entry = sample_entry(key("alice", 30), at(12, 0));
        db.upsert_cached_analysis(&entry).unwrap();

        let loaded = db.get_cached_analysis(&entry.key).unwrap().unwrap();
        assert_eq!(loaded, entry);

        let mut updated = entry.clone();
        updated.report_markdown = "# newer".to_string();
        db.upsert_cached_analysis(&updated).unwrap();
        assert_eq!(db.count_cached_analyses().unwrap(), 1);
        assert_eq!(
            db.get_cached_analysis(&entry.key).unwrap().unwrap().report_markdown,
            "# newer"
        );
    }

    #[test]
    fn test_cache_deletes() {
        let db = test_db();
        db.upsert_cached_analysis(&sample_entry(key("alice", 30), at(9, 0)))
            .unwrap();
        db.upsert_cached_analysis(&sample_entry(key("alice", 7), at(10, 0)))
            .unwrap();
        db.upsert_cached_analysis(&sample_entry(key("bob", 30), at(11, 0)))
            .unwrap();

        let latest = db
            .latest_user_cache("group_1", "alice", at(12, 0))
            .unwrap()
            .unwrap();
        assert_eq!(latest.key.days, 7);
        let much_later = at(12, 0) + Duration::days(30);
        assert!(db
            .latest_user_cache("group_1", "alice", much_later)
            .unwrap()
            .is_none());

        assert_eq!(db.delete_cached_analysis(&key("alice", 7)).unwrap(), 1);
        assert_eq!(db.delete_user_cache("group_1", "alice").unwrap(), 1);
        assert!(db
            .latest_user_cache("group_1", "alice", at(12, 0))
            .unwrap()
            .is_none());
        assert_eq!(db.delete_all_cache().unwrap(), 1);
    }

    #[test]
    fn test_delete_expired() {
        let db = test_db();
        let entry = sample_entry(key("alice", 30), at(9, 0));
        db.upsert_cached_analysis(&entry).unwrap();

        assert_eq!(db.delete_expired_cache(at(9, 0) + Duration::days(6)).unwrap(), 0);
        assert_eq!(db.delete_expired_cache(entry.expires_at).unwrap(), 1);
    }
}
