//! Markdown rendering of a finished analysis.
//!
//! Rendering is pure: the same inputs always produce the same text.

use crate::analytics::{BehaviorPattern, DayPart, StatisticalSummary};
use crate::personality::{BigFiveScores, BigFiveTrait, MbtiAxis, MbtiResult, PersonalityResult};
use chrono::{DateTime, TimeZone, Utc};
use std::fmt::Display;
use std::fmt::Write as _;

/// Width of a score bar in glyphs.
pub const BAR_WIDTH: usize = 10;

pub const DISCLAIMER: &str = "> ⚠️ **Disclaimer**: this report is an AI-generated reading of chat history. It is for entertainment only and is not a professional psychological assessment.";

/// Render a 0-100 score as a fixed-width bar followed by `score/100`.
///
/// Every filled glyph stands for ten points; remainders are dropped.
pub fn progress_bar(score: u8) -> String {
    let score = score.min(100);
    let filled = (usize::from(score) * BAR_WIDTH / 100).min(BAR_WIDTH);
    format!(
        "{}{} {}/100",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled),
        score
    )
}

/// Everything the report shows.
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    /// Display name of the analyzed user
    pub subject: &'a str,
    pub generated_at: DateTime<Utc>,
    /// Timestamp of the oldest analyzed message
    pub range_start: DateTime<Utc>,
    /// Timestamp of the newest analyzed message
    pub range_end: DateTime<Utc>,
    pub summary: &'a StatisticalSummary,
    /// Rule-based patterns; empty when the section is disabled
    pub patterns: &'a [BehaviorPattern],
    pub result: &'a PersonalityResult,
}

/// Render the full Markdown report, with times shown in `tz`.
pub fn render_report<Tz: TimeZone>(ctx: &ReportContext<'_>, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    let mut out = String::new();

    let _ = writeln!(out, "# 📊 Personality Report");
    let _ = writeln!(out);
    let _ = writeln!(out, "**Subject**: {}", ctx.subject);
    let _ = writeln!(
        out,
        "**Analyzed at**: {}",
        ctx.generated_at.with_timezone(tz).format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(
        out,
        "**Data range**: {} to {}",
        ctx.range_start.with_timezone(tz).format("%Y-%m-%d"),
        ctx.range_end.with_timezone(tz).format("%Y-%m-%d")
    );
    let _ = writeln!(out, "**Sample size**: {} messages", ctx.summary.total_messages);
    section_break(&mut out);

    render_activity(&mut out, ctx.summary);

    if let Some(scores) = &ctx.result.big_five {
        render_big_five(&mut out, scores);
    }

    if let Some(mbti) = &ctx.result.mbti {
        render_mbti(&mut out, mbti);
    }

    if !ctx.patterns.is_empty() || !ctx.result.behavior_tags.is_empty() {
        let _ = writeln!(out, "## 🔍 Behavior Insights");
        let _ = writeln!(out);
        for pattern in ctx.patterns {
            let _ = writeln!(out, "- {} {}", pattern.emoji(), pattern.label());
        }
        for tag in &ctx.result.behavior_tags {
            let _ = writeln!(out, "- {}", tag);
        }
        section_break(&mut out);
    }

    let _ = writeln!(out, "## 💬 Communication Style");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", communication_style(ctx.summary));
    section_break(&mut out);

    let _ = writeln!(out, "## 😊 Emotional Tendency");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", emotional_tendency(ctx.result.big_five.as_ref()));
    section_break(&mut out);

    let _ = writeln!(out, "## 🎨 Overall Portrait");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{}",
        portrait(ctx.subject, ctx.result.big_five.as_ref())
    );
    if let Some(summary) = &ctx.result.summary {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", summary);
    }
    section_break(&mut out);

    out.push_str(DISCLAIMER);
    out.push('\n');
    out
}

fn section_break(out: &mut String) {
    out.push_str("\n---\n\n");
}

fn render_activity(out: &mut String, summary: &StatisticalSummary) {
    let _ = writeln!(out, "## 📈 Activity");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|--------|-------|");
    if let Some(part) = summary.peak_day_part() {
        let _ = writeln!(out, "| Most active | {} |", part.label());
    }
    if let Some(hour) = summary.peak_hour() {
        let _ = writeln!(out, "| Peak hour | {:02}:00 |", hour);
    }
    let _ = writeln!(out, "| Mentions | {:.1}% |", summary.mention_rate() * 100.0);
    let _ = writeln!(out, "| Emoji | {:.1}% |", summary.emoji_rate() * 100.0);
    let _ = writeln!(out, "| Questions | {:.1}% |", summary.question_rate() * 100.0);
    let _ = writeln!(out, "| Avg. length | {:.1} chars |", summary.avg_length);
    if let Some(gap) = summary.mean_reply_gap_secs {
        let _ = writeln!(out, "| Reply gap | {} |", crate::format::format_duration(gap as i64));
    }
    let night_share = if summary.total_messages == 0 {
        0.0
    } else {
        summary.day_part_count(DayPart::Night) as f64 / summary.total_messages as f64
    };
    let _ = writeln!(out, "| Late night | {:.1}% |", night_share * 100.0);
    section_break(out);
}

fn render_big_five(out: &mut String, scores: &BigFiveScores) {
    let _ = writeln!(out, "## 🎯 Big Five");
    let _ = writeln!(out);
    for t in BigFiveTrait::ALL {
        let _ = writeln!(out, "**{}**", t.name());
        let _ = writeln!(out, "{}", progress_bar(scores.get(t)));
        let _ = writeln!(out, "{}", t.description());
        let _ = writeln!(out);
    }
    out.push_str("---\n\n");
}

fn render_mbti(out: &mut String, mbti: &MbtiResult) {
    let t = mbti.mbti_type;
    let _ = writeln!(out, "## 🧩 MBTI Type");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "**Type**: **{}** - {}, {}",
        t.as_str(),
        t.name(),
        t.description()
    );
    let _ = writeln!(out, "**Confidence**: {:.1}%", mbti.confidence * 100.0);
    let _ = writeln!(out);
    let _ = writeln!(out, "**Leanings**:");
    for axis in MbtiAxis::ALL {
        let toward_first = mbti.axes.get(axis);
        let ((first, first_word), (second, second_word)) = axis.poles();
        let (letter, word, strength) = if toward_first > 50.0 {
            (first, first_word, toward_first)
        } else {
            (second, second_word, 100.0 - toward_first)
        };
        let _ = writeln!(
            out,
            "- {}: {} ({}) {:.0}%",
            axis.label(),
            word,
            letter,
            strength
        );
    }
    section_break(out);
}

/// One-paragraph description of how the user writes.
pub fn communication_style(summary: &StatisticalSummary) -> String {
    let mut clauses = Vec::new();
    if summary.avg_length > 50.0 {
        clauses.push("prefers detailed expression, with content-rich messages");
    } else {
        clauses.push("leans toward concise, to-the-point messages");
    }
    if summary.emoji_rate() > 0.3 {
        clauses.push("uses emoji often to color what they say");
    }
    if summary.mention_rate() > 0.2 {
        clauses.push("actively reaches out to others with @-mentions");
    }
    format!("This user {}.", clauses.join("; "))
}

/// One-sentence reading of emotional stability from neuroticism.
pub fn emotional_tendency(scores: Option<&BigFiveScores>) -> String {
    match scores.map(|s| s.neuroticism) {
        Some(n) if n < 40 => {
            "Emotionally, this user appears steady and shows good resilience.".to_string()
        }
        Some(n) if n > 60 => {
            "Emotionally, this user is expressive and at times shows mood swings.".to_string()
        }
        Some(_) => "Emotionally, this user's expression sits within a typical range.".to_string(),
        None => "Emotional tendency was not assessed (Big Five analysis is disabled).".to_string(),
    }
}

/// Short overall portrait from the Big Five scores.
pub fn portrait(subject: &str, scores: Option<&BigFiveScores>) -> String {
    let Some(scores) = scores else {
        return format!("Overall, {subject} has a distinctive personality of their own.");
    };

    let mut traits = Vec::new();
    if scores.extraversion > 60 {
        traits.push("outgoing");
    } else if scores.extraversion < 40 {
        traits.push("reflective");
    }
    if scores.openness > 60 {
        traits.push("creative");
    }
    if scores.conscientiousness > 60 {
        traits.push("conscientious");
    }
    if scores.agreeableness > 60 {
        traits.push("friendly and cooperative");
    } else {
        traits.push("independent");
    }

    let article = match traits.first().and_then(|t| t.chars().next()) {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        _ => "a",
    };
    format!(
        "Overall, {subject} comes across as {article} {} person.",
        traits.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::personality::{MbtiAxes, MbtiType};

    fn scores(value: u8) -> BigFiveScores {
        BigFiveScores {
            openness: value,
            conscientiousness: value,
            extraversion: value,
            agreeableness: value,
            neuroticism: value,
        }
    }

    fn summary() -> StatisticalSummary {
        StatisticalSummary {
            total_messages: 60,
            day_parts: [10, 30, 15, 5],
            mention_count: 6,
            emoji_count: 3,
            avg_length: 24.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(82), "████████░░ 82/100");
        assert_eq!(progress_bar(0), "░░░░░░░░░░ 0/100");
        assert_eq!(progress_bar(100), "██████████ 100/100");
        assert_eq!(progress_bar(9), "░░░░░░░░░░ 9/100");
    }

    #[test]
    fn test_same_bar_for_every_trait() {
        let mut result = PersonalityResult::empty();
        result.big_five = Some(scores(82));
        let stats = summary();
        let ctx = ReportContext {
            subject: "Alice",
            generated_at: Utc::now(),
            range_start: Utc::now(),
            range_end: Utc::now(),
            summary: &stats,
            patterns: &[],
            result: &result,
        };
        let report = render_report(&ctx, &Utc);
        assert_eq!(report.matches("████████░░ 82/100").count(), 5);
    }

    #[test]
    fn test_full_report_sections() {
        let mut result = PersonalityResult::empty();
        result.big_five = Some(BigFiveScores {
            openness: 75,
            conscientiousness: 50,
            extraversion: 30,
            agreeableness: 70,
            neuroticism: 35,
        });
        result.mbti = Some(MbtiResult {
            mbti_type: MbtiType::Infj,
            confidence: 0.8,
            axes: MbtiAxes {
                energy_source: 25.0,
                perception: 30.0,
                judgment: 40.0,
                lifestyle: 65.0,
            },
        });
        result.behavior_tags = vec!["helps newcomers".to_string()];
        result.summary = Some("Thoughtful and kind.".to_string());
        let stats = summary();
        let patterns = [BehaviorPattern::AfternoonRegular];

        let ctx = ReportContext {
            subject: "Alice",
            generated_at: Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap(),
            range_start: Utc.with_ymd_and_hms(2025, 3, 2, 8, 0, 0).unwrap(),
            range_end: Utc.with_ymd_and_hms(2025, 3, 31, 22, 0, 0).unwrap(),
            summary: &stats,
            patterns: &patterns,
            result: &result,
        };
        let report = render_report(&ctx, &Utc);

        for header in [
            "# 📊 Personality Report",
            "## 📈 Activity",
            "## 🎯 Big Five",
            "## 🧩 MBTI Type",
            "## 🔍 Behavior Insights",
            "## 💬 Communication Style",
            "## 😊 Emotional Tendency",
            "## 🎨 Overall Portrait",
        ] {
            assert!(report.contains(header), "missing {header}");
        }
        assert!(report.contains("**Data range**: 2025-03-02 to 2025-03-31"));
        assert!(report.contains("**INFJ** - The Advocate"));
        assert!(report.contains("**Confidence**: 80.0%"));
        assert!(report.contains("- Energy source: Introversion (I) 75%"));
        assert!(report.contains("- Lifestyle: Judging (J) 65%"));
        assert!(report.contains("Afternoon regular"));
        assert!(report.contains("- helps newcomers"));
        assert!(report.contains("Thoughtful and kind."));
        assert!(report.ends_with(&format!("{DISCLAIMER}\n")));
    }

    #[test]
    fn test_disabled_sections_are_omitted() {
        let result = PersonalityResult::empty();
        let stats = summary();
        let ctx = ReportContext {
            subject: "Bob",
            generated_at: Utc::now(),
            range_start: Utc::now(),
            range_end: Utc::now(),
            summary: &stats,
            patterns: &[],
            result: &result,
        };
        let report = render_report(&ctx, &Utc);
        assert!(!report.contains("## 🎯 Big Five"));
        assert!(!report.contains("## 🧩 MBTI Type"));
        assert!(!report.contains("## 🔍 Behavior Insights"));
        assert!(report.contains("has a distinctive personality"));
    }

    #[test]
    fn test_narratives() {
        let mut stats = summary();
        assert_eq!(
            communication_style(&stats),
            "This user leans toward concise, to-the-point messages."
        );
        stats.avg_length = 80.0;
        stats.mention_count = 20;
        stats.emoji_count = 30;
        let style = communication_style(&stats);
        assert!(style.contains("detailed"));
        assert!(style.contains("emoji"));
        assert!(style.contains("@-mentions"));

        assert!(emotional_tendency(Some(&scores(20))).contains("steady"));
        assert!(emotional_tendency(Some(&scores(80))).contains("mood swings"));
        assert!(emotional_tendency(Some(&scores(50))).contains("typical"));

        assert_eq!(
            portrait("Alice", Some(&scores(80))),
            "Overall, Alice comes across as an outgoing, creative, conscientious, friendly and cooperative person."
        );
        assert_eq!(
            portrait("Bob", Some(&scores(50))),
            "Overall, Bob comes across as an independent person."
        );
    }
}
