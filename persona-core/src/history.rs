//! Message retrieval
//!
//! The analyzer reads history through the [`ChatHistory`] trait so tests and
//! embedders can supply their own store. [`Database`] is the built-in backend.

use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::ChatMessage;
use chrono::{DateTime, Duration, Utc};

/// Parameters for one history lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub chat_key: String,
    pub user_id: String,
    /// Inclusive lower bound
    pub since: DateTime<Utc>,
    /// Inclusive upper bound
    pub until: DateTime<Utc>,
    /// Maximum number of messages returned
    pub limit: usize,
}

impl HistoryQuery {
    /// Query covering the `days` days up to `now`.
    pub fn trailing(
        chat_key: &str,
        user_id: &str,
        days: u32,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            chat_key: chat_key.to_string(),
            user_id: user_id.to_string(),
            since: now - Duration::days(i64::from(days)),
            until: now,
            limit,
        }
    }
}

/// A source of chat history.
///
/// Implementations return at most `query.limit` eligible messages, newest
/// first. Eligible means: not system, not recalled, and at least two
/// characters of text after trimming.
pub trait ChatHistory {
    fn query_messages(&self, query: &HistoryQuery) -> Result<Vec<ChatMessage>>;
}

impl ChatHistory for Database {
    fn query_messages(&self, query: &HistoryQuery) -> Result<Vec<ChatMessage>> {
        self.query_chat_messages(query)
    }
}

/// Eligibility rule shared by non-SQL backends.
pub fn is_eligible(message: &ChatMessage) -> bool {
    !message.is_system && !message.is_recalled && message.text.trim().chars().count() >= 2
}

/// Retrieve the analysis sample for a user, oldest to newest.
///
/// Fails with `NotFound` when nothing is eligible and with
/// `InsufficientSample` when fewer than `min_messages` are.
pub fn retrieve_messages(
    history: &dyn ChatHistory,
    query: &HistoryQuery,
    min_messages: usize,
) -> Result<Vec<ChatMessage>> {
    let mut messages = history.query_messages(query)?;
    messages.retain(is_eligible);
    messages.sort_by_key(|m| m.sent_at);
    if messages.len() > query.limit {
        messages.drain(..messages.len() - query.limit);
    }

    tracing::debug!(
        chat_key = %query.chat_key,
        user_id = %query.user_id,
        found = messages.len(),
        limit = query.limit,
        "Retrieved chat history"
    );

    if messages.is_empty() {
        let days = (query.until - query.since).num_days().max(0) as u32;
        return Err(Error::NotFound {
            user_id: query.user_id.clone(),
            days,
        });
    }

    if messages.len() < min_messages {
        return Err(Error::InsufficientSample {
            found: messages.len(),
            required: min_messages,
        });
    }

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct VecHistory(Vec<ChatMessage>);

    impl ChatHistory for VecHistory {
        fn query_messages(&self, query: &HistoryQuery) -> Result<Vec<ChatMessage>> {
            let mut found: Vec<_> = self
                .0
                .iter()
                .filter(|m| m.chat_key == query.chat_key && m.sender_id == query.user_id)
                .filter(|m| m.sent_at >= query.since && m.sent_at <= query.until)
                .filter(|m| is_eligible(m))
                .cloned()
                .collect();
            found.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
            found.truncate(query.limit);
            Ok(found)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 31, 12, 0, 0).unwrap()
    }

    fn messages(count: usize) -> Vec<ChatMessage> {
        (0..count)
            .map(|i| {
                ChatMessage::new(
                    "group_1",
                    "alice",
                    "Alice",
                    now() - Duration::minutes(i as i64 * 10),
                    format!("message number {i}"),
                )
            })
            .collect()
    }

    #[test]
    fn test_trailing_window() {
        let query = HistoryQuery::trailing("group_1", "alice", 30, 500, now());
        assert_eq!(query.until - query.since, Duration::days(30));
    }

    #[test]
    fn test_empty_history_is_not_found() {
        let history = VecHistory(Vec::new());
        let query = HistoryQuery::trailing("group_1", "alice", 30, 500, now());
        let err = retrieve_messages(&history, &query, 10).unwrap_err();
        assert!(matches!(err, Error::NotFound { days: 30, .. }));
    }

    #[test]
    fn test_below_threshold_is_insufficient() {
        let history = VecHistory(messages(5));
        let query = HistoryQuery::trailing("group_1", "alice", 30, 500, now());
        let err = retrieve_messages(&history, &query, 10).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientSample {
                found: 5,
                required: 10
            }
        ));
    }

    #[test]
    fn test_result_is_chronological_and_capped() {
        let history = VecHistory(messages(20));
        let query = HistoryQuery::trailing("group_1", "alice", 30, 8, now());
        let found = retrieve_messages(&history, &query, 5).unwrap();
        assert_eq!(found.len(), 8);
        assert!(found.windows(2).all(|w| w[0].sent_at <= w[1].sent_at));
        assert_eq!(found.last().unwrap().text, "message number 0");
    }

    /// Ignores the limit and the eligibility rule.
    struct UnfilteredHistory(Vec<ChatMessage>);

    impl ChatHistory for UnfilteredHistory {
        fn query_messages(&self, _query: &HistoryQuery) -> Result<Vec<ChatMessage>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_cap_and_eligibility_enforced_for_any_backend() {
        let mut all = messages(20);
        all[0].is_system = true;
        all[1].text = "\u{3000}嗯".to_string();
        let history = UnfilteredHistory(all);
        let query = HistoryQuery::trailing("group_1", "alice", 30, 8, now());

        let found = retrieve_messages(&history, &query, 5).unwrap();
        assert_eq!(found.len(), 8);
        assert!(found.windows(2).all(|w| w[0].sent_at <= w[1].sent_at));
        assert_eq!(found.last().unwrap().text, "message number 2");
        assert_eq!(found.first().unwrap().text, "message number 9");
    }

    #[test]
    fn test_eligibility() {
        let mut msg = ChatMessage::new("c", "u", "", now(), " a ");
        assert!(!is_eligible(&msg));
        msg.text = "ok".to_string();
        assert!(is_eligible(&msg));
        msg.is_recalled = true;
        assert!(!is_eligible(&msg));
    }
}
