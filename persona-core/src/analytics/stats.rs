//! Frequency statistics over a message sample.

use crate::types::{count_emoji, is_question, ChatMessage};
use chrono::{TimeZone, Timelike};
use serde::{Deserialize, Serialize};

/// Consecutive messages further apart than this are not treated as a reply.
pub const REPLY_WINDOW_SECS: i64 = 30 * 60;

/// Coarse part of the day a message was sent in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl DayPart {
    pub const ALL: [DayPart; 4] = [
        DayPart::Morning,
        DayPart::Afternoon,
        DayPart::Evening,
        DayPart::Night,
    ];

    /// Bucket for an hour of the day (0-23).
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => DayPart::Morning,
            12..=17 => DayPart::Afternoon,
            18..=22 => DayPart::Evening,
            _ => DayPart::Night,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DayPart::Morning => "morning (06-12)",
            DayPart::Afternoon => "afternoon (12-18)",
            DayPart::Evening => "evening (18-23)",
            DayPart::Night => "night (23-06)",
        }
    }

    fn index(&self) -> usize {
        match self {
            DayPart::Morning => 0,
            DayPart::Afternoon => 1,
            DayPart::Evening => 2,
            DayPart::Night => 3,
        }
    }
}

/// Aggregated counters over one analysis sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalSummary {
    pub total_messages: usize,
    /// Message count by hour of day (0-23)
    pub hourly_distribution: [usize; 24],
    /// Message count by [`DayPart`], in `DayPart::ALL` order
    pub day_parts: [usize; 4],
    pub mention_count: usize,
    pub emoji_count: usize,
    /// Total emoji code points across all messages
    pub emoji_total: usize,
    pub question_count: usize,
    /// Mean length in characters
    pub avg_length: f64,
    /// Mean gap between consecutive messages inside [`REPLY_WINDOW_SECS`]
    pub mean_reply_gap_secs: Option<f64>,
}

impl Default for StatisticalSummary {
    fn default() -> Self {
        Self {
            total_messages: 0,
            hourly_distribution: [0; 24],
            day_parts: [0; 4],
            mention_count: 0,
            emoji_count: 0,
            emoji_total: 0,
            question_count: 0,
            avg_length: 0.0,
            mean_reply_gap_secs: None,
        }
    }
}

impl StatisticalSummary {
    /// Share of messages that mention someone.
    pub fn mention_rate(&self) -> f64 {
        ratio(self.mention_count, self.total_messages)
    }

    /// Share of messages carrying at least one emoji.
    pub fn emoji_rate(&self) -> f64 {
        ratio(self.emoji_count, self.total_messages)
    }

    /// Share of messages that ask something.
    pub fn question_rate(&self) -> f64 {
        ratio(self.question_count, self.total_messages)
    }

    /// Count for one part of the day.
    pub fn day_part_count(&self, part: DayPart) -> usize {
        self.day_parts[part.index()]
    }

    /// Busiest part of the day; `None` for an empty sample.
    ///
    /// Ties resolve in `DayPart::ALL` order.
    pub fn peak_day_part(&self) -> Option<DayPart> {
        if self.total_messages == 0 {
            return None;
        }
        let mut best = DayPart::Morning;
        for part in DayPart::ALL {
            if self.day_part_count(part) > self.day_part_count(best) {
                best = part;
            }
        }
        Some(best)
    }

    /// Busiest hour; `None` for an empty sample.
    pub fn peak_hour(&self) -> Option<u32> {
        if self.total_messages == 0 {
            return None;
        }
        let mut best = 0;
        for (hour, count) in self.hourly_distribution.iter().enumerate() {
            if *count > self.hourly_distribution[best] {
                best = hour;
            }
        }
        Some(best as u32)
    }
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Summarize a chronological message sample.
///
/// Hours are read in `tz`. Mention and emoji come from the message flags;
/// length and questions from the (already cleaned) text.
pub fn summarize<Tz: TimeZone>(messages: &[ChatMessage], tz: &Tz) -> StatisticalSummary {
    let mut summary = StatisticalSummary {
        total_messages: messages.len(),
        ..Default::default()
    };
    if messages.is_empty() {
        return summary;
    }

    let mut total_chars = 0usize;
    for message in messages {
        let hour = message.sent_at.with_timezone(tz).hour();
        summary.hourly_distribution[hour as usize] += 1;
        summary.day_parts[DayPart::from_hour(hour).index()] += 1;

        if message.has_mention {
            summary.mention_count += 1;
        }
        if message.has_emoji {
            summary.emoji_count += 1;
        }
        summary.emoji_total += count_emoji(&message.text);
        if is_question(&message.text) {
            summary.question_count += 1;
        }
        total_chars += message.char_len();
    }
    summary.avg_length = total_chars as f64 / messages.len() as f64;

    let gaps: Vec<i64> = messages
        .windows(2)
        .map(|w| (w[1].sent_at - w[0].sent_at).num_seconds())
        .filter(|gap| (0..=REPLY_WINDOW_SECS).contains(gap))
        .collect();
    if !gaps.is_empty() {
        summary.mean_reply_gap_secs = Some(gaps.iter().sum::<i64>() as f64 / gaps.len() as f64);
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
    }

    fn msg(at: DateTime<Utc>, text: &str) -> ChatMessage {
        ChatMessage::new("group_1", "12345", "Alice", at, text)
    }

    #[test]
    fn test_empty_sample_is_all_zero() {
        let summary = summarize(&[], &Utc);
        assert_eq!(summary.total_messages, 0);
        assert_eq!(summary.mention_rate(), 0.0);
        assert_eq!(summary.emoji_rate(), 0.0);
        assert_eq!(summary.avg_length, 0.0);
        assert!(summary.peak_day_part().is_none());
        assert!(summary.mean_reply_gap_secs.is_none());
    }

    #[test]
    fn test_mention_rate_ten_percent() {
        // 60 messages over 30 days, every tenth mentions someone
        let messages: Vec<_> = (0..60)
            .map(|i| {
                let at = base() + Duration::hours(i * 12);
                if i % 10 == 0 {
                    msg(at, "@bob have you seen this")
                } else {
                    msg(at, "just a regular message")
                }
            })
            .collect();

        let summary = summarize(&messages, &Utc);
        assert_eq!(summary.total_messages, 60);
        assert_eq!(summary.mention_count, 6);
        assert!((summary.mention_rate() - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_day_parts_and_hours() {
        let messages = vec![
            msg(base() + Duration::hours(7), "morning one"),
            msg(base() + Duration::hours(9), "morning two"),
            msg(base() + Duration::hours(13), "afternoon"),
            msg(base() + Duration::hours(23), "late night"),
        ];
        let summary = summarize(&messages, &Utc);
        assert_eq!(summary.day_part_count(DayPart::Morning), 2);
        assert_eq!(summary.day_part_count(DayPart::Afternoon), 1);
        assert_eq!(summary.day_part_count(DayPart::Night), 1);
        assert_eq!(summary.peak_day_part(), Some(DayPart::Morning));
        assert_eq!(summary.hourly_distribution[23], 1);
        assert_eq!(summary.peak_hour(), Some(7));
    }

    #[test]
    fn test_emoji_question_and_length() {
        let messages = vec![
            msg(base(), "nice 🎉🎉"),
            msg(base() + Duration::minutes(1), "why?"),
            msg(base() + Duration::minutes(2), "真的吗？"),
        ];
        let summary = summarize(&messages, &Utc);
        assert_eq!(summary.emoji_count, 1);
        assert_eq!(summary.emoji_total, 2);
        assert_eq!(summary.question_count, 2);
        assert!((summary.avg_length - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_reply_gap_ignores_long_pauses() {
        let messages = vec![
            msg(base(), "first message"),
            msg(base() + Duration::minutes(2), "quick follow-up"),
            msg(base() + Duration::minutes(6), "another one"),
            msg(base() + Duration::hours(5), "much later"),
        ];
        let summary = summarize(&messages, &Utc);
        assert_eq!(summary.mean_reply_gap_secs, Some(180.0));
    }

    #[test]
    fn test_hours_follow_time_zone() {
        let tz = chrono::FixedOffset::east_opt(8 * 3600).unwrap();
        let summary = summarize(&[msg(base() + Duration::hours(2), "hello there")], &tz);
        assert_eq!(summary.hourly_distribution[10], 1);
        assert_eq!(summary.peak_day_part(), Some(DayPart::Morning));
    }
}
