//! Rule-based behavior patterns
//!
//! Labels derived purely from a [`StatisticalSummary`], shown next to the
//! model's own behavior tags.

use super::stats::{DayPart, StatisticalSummary};

/// Behavior archetypes detectable from message statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorPattern {
    /// Most messages between 06:00 and 12:00
    EarlyBird,
    /// Most messages between 12:00 and 18:00
    AfternoonRegular,
    /// Most messages between 18:00 and 23:00
    EveningChatter,
    /// Most messages late at night
    NightOwl,
    /// Mentions others in more than 30% of messages
    HighInteraction,
    /// Mentions others in fewer than 10% of messages
    IndependentVoice,
    /// Emoji in more than half of messages
    EmojiEnthusiast,
    /// Emoji in fewer than 10% of messages
    PlainTexter,
    /// Mean length above 50 characters
    DetailedWriter,
    /// Mean length below 15 characters
    Concise,
    /// Questions in more than 30% of messages
    CuriousQuestioner,
}

impl BehaviorPattern {
    /// Get the display name for this pattern.
    pub fn name(&self) -> &'static str {
        match self {
            BehaviorPattern::EarlyBird => "Early bird",
            BehaviorPattern::AfternoonRegular => "Afternoon regular",
            BehaviorPattern::EveningChatter => "Evening chatter",
            BehaviorPattern::NightOwl => "Night owl",
            BehaviorPattern::HighInteraction => "High interaction",
            BehaviorPattern::IndependentVoice => "Independent voice",
            BehaviorPattern::EmojiEnthusiast => "Emoji enthusiast",
            BehaviorPattern::PlainTexter => "Plain texter",
            BehaviorPattern::DetailedWriter => "Detailed writer",
            BehaviorPattern::Concise => "Concise",
            BehaviorPattern::CuriousQuestioner => "Curious questioner",
        }
    }

    /// Get the tagline for this pattern.
    pub fn tagline(&self) -> &'static str {
        match self {
            BehaviorPattern::EarlyBird => "most active in the morning",
            BehaviorPattern::AfternoonRegular => "most active in the afternoon",
            BehaviorPattern::EveningChatter => "most active in the evening",
            BehaviorPattern::NightOwl => "most active late at night",
            BehaviorPattern::HighInteraction => "often @-mentions others",
            BehaviorPattern::IndependentVoice => "rarely @-mentions others",
            BehaviorPattern::EmojiEnthusiast => "uses emoji freely",
            BehaviorPattern::PlainTexter => "seldom uses emoji",
            BehaviorPattern::DetailedWriter => "messages tend to be long",
            BehaviorPattern::Concise => "messages are short and to the point",
            BehaviorPattern::CuriousQuestioner => "asks a lot of questions",
        }
    }

    /// Get an emoji for this pattern.
    pub fn emoji(&self) -> &'static str {
        match self {
            BehaviorPattern::EarlyBird => "🐦",
            BehaviorPattern::AfternoonRegular => "☀️",
            BehaviorPattern::EveningChatter => "🌆",
            BehaviorPattern::NightOwl => "🦉",
            BehaviorPattern::HighInteraction => "🤝",
            BehaviorPattern::IndependentVoice => "🧍",
            BehaviorPattern::EmojiEnthusiast => "😄",
            BehaviorPattern::PlainTexter => "📝",
            BehaviorPattern::DetailedWriter => "📜",
            BehaviorPattern::Concise => "⚡",
            BehaviorPattern::CuriousQuestioner => "❓",
        }
    }

    /// "Name (tagline)" as shown in the report.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name(), self.tagline())
    }

    fn for_day_part(part: DayPart) -> Self {
        match part {
            DayPart::Morning => BehaviorPattern::EarlyBird,
            DayPart::Afternoon => BehaviorPattern::AfternoonRegular,
            DayPart::Evening => BehaviorPattern::EveningChatter,
            DayPart::Night => BehaviorPattern::NightOwl,
        }
    }
}

/// Detect behavior patterns, time-of-day first.
///
/// An empty summary yields no patterns.
pub fn detect_patterns(summary: &StatisticalSummary) -> Vec<BehaviorPattern> {
    let mut patterns = Vec::new();
    let Some(peak) = summary.peak_day_part() else {
        return patterns;
    };
    patterns.push(BehaviorPattern::for_day_part(peak));

    let mention_rate = summary.mention_rate();
    if mention_rate > 0.3 {
        patterns.push(BehaviorPattern::HighInteraction);
    } else if mention_rate < 0.1 {
        patterns.push(BehaviorPattern::IndependentVoice);
    }

    let emoji_rate = summary.emoji_rate();
    if emoji_rate > 0.5 {
        patterns.push(BehaviorPattern::EmojiEnthusiast);
    } else if emoji_rate < 0.1 {
        patterns.push(BehaviorPattern::PlainTexter);
    }

    if summary.avg_length > 50.0 {
        patterns.push(BehaviorPattern::DetailedWriter);
    } else if summary.avg_length < 15.0 {
        patterns.push(BehaviorPattern::Concise);
    }

    if summary.question_rate() > 0.3 {
        patterns.push(BehaviorPattern::CuriousQuestioner);
    }

    patterns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_with(total: usize) -> StatisticalSummary {
        let mut summary = StatisticalSummary {
            total_messages: total,
            avg_length: 30.0,
            mention_count: total / 5,
            emoji_count: total / 5,
            ..Default::default()
        };
        summary.day_parts = [0, total, 0, 0];
        summary
    }

    #[test]
    fn test_empty_summary_has_no_patterns() {
        assert!(detect_patterns(&StatisticalSummary::default()).is_empty());
    }

    #[test]
    fn test_middle_of_the_road_only_gets_time_pattern() {
        let patterns = detect_patterns(&summary_with(100));
        assert_eq!(patterns, vec![BehaviorPattern::AfternoonRegular]);
    }

    #[test]
    fn test_high_interaction_emoji_enthusiast() {
        let mut summary = summary_with(100);
        summary.mention_count = 40;
        summary.emoji_count = 60;
        let patterns = detect_patterns(&summary);
        assert!(patterns.contains(&BehaviorPattern::HighInteraction));
        assert!(patterns.contains(&BehaviorPattern::EmojiEnthusiast));
    }

    #[test]
    fn test_quiet_concise_questioner() {
        let mut summary = summary_with(100);
        summary.day_parts = [0, 0, 10, 90];
        summary.mention_count = 2;
        summary.emoji_count = 0;
        summary.avg_length = 8.0;
        summary.question_count = 45;
        let patterns = detect_patterns(&summary);
        assert_eq!(
            patterns,
            vec![
                BehaviorPattern::NightOwl,
                BehaviorPattern::IndependentVoice,
                BehaviorPattern::PlainTexter,
                BehaviorPattern::Concise,
                BehaviorPattern::CuriousQuestioner,
            ]
        );
    }

    #[test]
    fn test_label_format() {
        assert_eq!(
            BehaviorPattern::NightOwl.label(),
            "Night owl (most active late at night)"
        );
    }
}
