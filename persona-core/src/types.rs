//! Core domain types for persona
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Chat key** | Identifier for a conversation or channel scope |
//! | **Sender** | The platform user id that wrote a message |
//! | **Day window** | Number of trailing days of history considered |
//! | **Message cap** | Upper bound on messages fed into one analysis |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Chat messages
// ============================================

/// One chat message as seen by the analysis pipeline.
///
/// Flags are derived from the raw text when the message is built and are not
/// recomputed after redaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Conversation the message belongs to
    pub chat_key: String,
    /// Platform user id of the sender
    pub sender_id: String,
    /// Display name at the time of sending
    #[serde(default)]
    pub sender_nickname: String,
    /// When the message was sent
    pub sent_at: DateTime<Utc>,
    /// Raw message text, platform markup included
    pub text: String,
    /// Text mentions someone (`@name` or platform at-markup)
    #[serde(default)]
    pub has_mention: bool,
    /// Text contains at least one pictographic emoji
    #[serde(default)]
    pub has_emoji: bool,
    /// Generated by the platform, not the user
    #[serde(default)]
    pub is_system: bool,
    /// Withdrawn by the sender
    #[serde(default)]
    pub is_recalled: bool,
}

impl ChatMessage {
    /// Build a user message, deriving the mention and emoji flags from `text`.
    pub fn new(
        chat_key: impl Into<String>,
        sender_id: impl Into<String>,
        sender_nickname: impl Into<String>,
        sent_at: DateTime<Utc>,
        text: impl Into<String>,
    ) -> Self {
        let text = text.into();
        Self {
            chat_key: chat_key.into(),
            sender_id: sender_id.into(),
            sender_nickname: sender_nickname.into(),
            sent_at,
            has_mention: contains_mention(&text),
            has_emoji: count_emoji(&text) > 0,
            text,
            is_system: false,
            is_recalled: false,
        }
    }

    /// Recompute the derived flags from the current text.
    ///
    /// Used for records imported from outside, where the flags may be absent.
    pub fn with_derived_flags(mut self) -> Self {
        self.has_mention = self.has_mention || contains_mention(&self.text);
        self.has_emoji = self.has_emoji || count_emoji(&self.text) > 0;
        self
    }

    /// Number of characters (not bytes) in the raw text.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// True when the text addresses another user.
pub fn contains_mention(text: &str) -> bool {
    text.contains('@') || text.contains("[CQ:at,")
}

/// True for code points in the pictographic emoji blocks.
pub fn is_emoji(c: char) -> bool {
    matches!(c as u32, 0x1F300..=0x1FAFF | 0x2600..=0x27BF)
}

/// Count pictographic emoji code points in `text`.
pub fn count_emoji(text: &str) -> usize {
    text.chars().filter(|c| is_emoji(*c)).count()
}

/// True when the text asks something.
pub fn is_question(text: &str) -> bool {
    text.contains('?') || text.contains('？')
}

// ============================================
// Requests and cache keys
// ============================================

/// One invocation of the analysis entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub chat_key: String,
    pub user_id: String,
    /// Trailing days of history
    pub days: u32,
    /// Upper bound on messages retrieved
    pub max_messages: usize,
    /// Skip the cache lookup (the result is still written back)
    pub force_refresh: bool,
}

impl AnalysisRequest {
    /// The cache slot this request reads from and writes to.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            chat_key: self.chat_key.clone(),
            user_id: self.user_id.clone(),
            days: self.days,
            max_messages: self.max_messages,
        }
    }
}

/// Identity of a cached analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub chat_key: String,
    pub user_id: String,
    pub days: u32,
    pub max_messages: usize,
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}d/{}",
            self.chat_key, self.user_id, self.days, self.max_messages
        )
    }
}
