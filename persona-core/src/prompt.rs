//! Prompt construction for the personality model.
//!
//! The prompt is the statistics block, an optional list of detected behavior
//! patterns, a sample of recent messages and the JSON schema for the answer.
//! Only the sample is ever shortened to fit the token budget.

use crate::analytics::{BehaviorPattern, DayPart, StatisticalSummary};
use crate::config::AnalysisConfig;
use crate::personality::{BigFiveTrait, MbtiAxis};
use crate::types::ChatMessage;
use crate::{Error, Result};
use chrono::TimeZone;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Most recent messages considered for the sample.
pub const SAMPLE_SIZE: usize = 100;

const SYSTEM_PROMPT: &str = "You are a careful personality analyst. From the chat statistics and message sample below, assess the speaker's personality. Base every judgment on the evidence given; when evidence is thin, stay near the middle of each scale.";

/// A finished prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    /// SHA-256 of `text`, hex encoded
    pub hash: String,
    /// Message lines that made it into the sample
    pub sample_lines: usize,
    /// Estimated size of `text` in tokens
    pub estimated_tokens: usize,
}

/// Rough token estimate: one token per CJK character, four other characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    let mut cjk = 0usize;
    let mut other = 0usize;
    for c in text.chars() {
        if is_cjk(c) {
            cjk += 1;
        } else {
            other += 1;
        }
    }
    cjk + other.div_ceil(4)
}

fn is_cjk(c: char) -> bool {
    matches!(
        c as u32,
        0x3000..=0x303F     // CJK punctuation
            | 0x3040..=0x30FF   // kana
            | 0x3400..=0x4DBF   // extension A
            | 0x4E00..=0x9FFF   // unified ideographs
            | 0xAC00..=0xD7AF   // hangul
            | 0xFF00..=0xFFEF   // full-width forms
    )
}

fn sample_header(lines: usize) -> String {
    format!("\nRecent messages ({lines} shown, oldest first):\n")
}

/// Builds prompts for one analysis configuration.
pub struct PromptBuilder<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Assemble the prompt for `subject`.
    ///
    /// `messages` must be cleaned and in chronological order; only the newest
    /// [`SAMPLE_SIZE`] are considered, and older lines are dropped first when
    /// the budget is tight.
    pub fn build<Tz: TimeZone>(
        &self,
        subject: &str,
        summary: &StatisticalSummary,
        patterns: &[BehaviorPattern],
        messages: &[ChatMessage],
        tz: &Tz,
    ) -> Result<Prompt>
    where
        Tz::Offset: std::fmt::Display,
    {
        if !self.config.needs_model() {
            return Err(Error::Config(
                "prompt requested but no model-backed section (big five, mbti) is enabled"
                    .to_string(),
            ));
        }
        if self.config.analysis_model_group.trim().is_empty() {
            return Err(Error::Config(
                "analysis.analysis_model_group is not set".to_string(),
            ));
        }

        let head = format!(
            "{SYSTEM_PROMPT}\n\nSubject: {subject}\n\n{}",
            self.stats_block(summary, patterns)
        );
        let tail = format!("\n{}", self.schema_block());

        let widest_header = sample_header(SAMPLE_SIZE);
        let fixed_tokens =
            estimate_tokens(&head) + estimate_tokens(&widest_header) + estimate_tokens(&tail);
        let mut remaining = self.config.max_prompt_tokens.saturating_sub(fixed_tokens);

        let start = messages.len().saturating_sub(SAMPLE_SIZE);
        let mut lines: Vec<String> = Vec::new();
        for message in messages[start..].iter().rev() {
            let line = format!(
                "[{}] {}\n",
                message.sent_at.with_timezone(tz).format("%m-%d %H:%M"),
                message.text
            );
            let cost = estimate_tokens(&line);
            if cost > remaining {
                break;
            }
            remaining -= cost;
            lines.push(line);
        }
        lines.reverse();

        if lines.len() < messages.len() - start {
            tracing::debug!(
                kept = lines.len(),
                candidates = messages.len() - start,
                budget = self.config.max_prompt_tokens,
                "Trimmed message sample to fit prompt budget"
            );
        }

        let mut text = head;
        text.push_str(&sample_header(lines.len()));
        for line in &lines {
            text.push_str(line);
        }
        text.push_str(&tail);

        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let hash = hex::encode(hasher.finalize());

        Ok(Prompt {
            estimated_tokens: estimate_tokens(&text),
            sample_lines: lines.len(),
            text,
            hash,
        })
    }

    fn stats_block(&self, summary: &StatisticalSummary, patterns: &[BehaviorPattern]) -> String {
        let mut out = String::from("Statistics:\n");
        let _ = writeln!(out, "- messages analyzed: {}", summary.total_messages);
        let parts: Vec<String> = DayPart::ALL
            .iter()
            .map(|p| format!("{} {}", p.label(), summary.day_part_count(*p)))
            .collect();
        let _ = writeln!(out, "- activity by time of day: {}", parts.join(", "));
        if let Some(hour) = summary.peak_hour() {
            let _ = writeln!(out, "- peak hour: {:02}:00", hour);
        }
        let _ = writeln!(out, "- mention rate: {:.1}%", summary.mention_rate() * 100.0);
        let _ = writeln!(out, "- emoji rate: {:.1}%", summary.emoji_rate() * 100.0);
        let _ = writeln!(out, "- question rate: {:.1}%", summary.question_rate() * 100.0);
        let _ = writeln!(
            out,
            "- average message length: {:.1} characters",
            summary.avg_length
        );
        match summary.mean_reply_gap_secs {
            Some(gap) => {
                let _ = writeln!(out, "- mean gap between quick successive messages: {gap:.0}s");
            }
            None => out.push_str("- mean gap between quick successive messages: n/a\n"),
        }

        if self.config.enable_behavior_pattern && !patterns.is_empty() {
            out.push_str("\nObserved behavior patterns:\n");
            for pattern in patterns {
                let _ = writeln!(out, "- {}", pattern.label());
            }
        }
        out
    }

    fn schema_block(&self) -> String {
        let mut fields: Vec<String> = Vec::new();

        if self.config.enable_big_five {
            let traits: Vec<String> = BigFiveTrait::ALL
                .iter()
                .map(|t| format!("\"{}\": <integer 0-100>", t.key()))
                .collect();
            fields.push(format!("  \"big_five\": {{{}}}", traits.join(", ")));
        }

        if self.config.enable_mbti {
            let axes: Vec<String> = MbtiAxis::ALL
                .iter()
                .map(|axis| {
                    let ((first, _), _) = axis.poles();
                    format!("\"{}\": <0-100, percent toward {}>", axis.key(), first)
                })
                .collect();
            fields.push(format!(
                "  \"mbti\": {{\"type\": \"<four-letter code such as INTJ>\", \"confidence\": <number 0.0-1.0>, \"axes\": {{{}}}}}",
                axes.join(", ")
            ));
        }

        if self.config.enable_behavior_pattern {
            fields.push("  \"behavior_tags\": [\"<short behavior description>\", ...]".to_string());
        }

        fields.push("  \"summary\": \"<two or three sentence portrait>\"".to_string());

        format!(
            "Respond with a single JSON object and nothing else, using exactly this shape:\n{{\n{}\n}}\n",
            fields.join(",\n")
        )
    }
}
