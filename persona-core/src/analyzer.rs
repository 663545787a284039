//! The analysis service and its invocable entry points.
//!
//! [`PersonalityAnalyzer::analyze`] runs the pipeline and returns typed errors.
//! The string-returning entry points wrap it for hosts that only relay text;
//! they never fail.

use crate::analytics::{detect_patterns, summarize, BehaviorPattern};
use crate::assessment::{assess_with_client, HttpModelClient, ModelClient, Sections};
use crate::cache::{Clock, ReportCache, SystemClock};
use crate::config::{AnalysisConfig, Config};
use crate::db::{CachedAnalysis, Database};
use crate::history::{retrieve_messages, ChatHistory, HistoryQuery};
use crate::personality::PersonalityResult;
use crate::prompt::PromptBuilder;
use crate::redact::clean_text;
use crate::report::{render_report, ReportContext};
use crate::types::{AnalysisRequest, ChatMessage};
use crate::{Error, ErrorKind, Result};
use chrono::{DateTime, FixedOffset, Local, Utc};
use std::sync::Arc;

pub use crate::config::{MAX_ANALYSIS_DAYS, MAX_MESSAGES_LIMIT};

/// A finished analysis.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub report: String,
    pub result: PersonalityResult,
    /// Served from the cache rather than computed
    pub from_cache: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<CachedAnalysis> for AnalysisOutcome {
    fn from(entry: CachedAnalysis) -> Self {
        Self {
            report: entry.report_markdown,
            result: entry.result,
            from_cache: true,
            created_at: entry.created_at,
            expires_at: entry.expires_at,
        }
    }
}

/// Personality analysis over a history source, a model and a report cache.
pub struct PersonalityAnalyzer {
    config: AnalysisConfig,
    history: Arc<dyn ChatHistory + Send + Sync>,
    model: Arc<dyn ModelClient>,
    cache: ReportCache,
    clock: Arc<dyn Clock>,
    /// Fixed offset for hours and dates; `None` follows the local offset
    tz: Option<FixedOffset>,
}

impl PersonalityAnalyzer {
    /// Build an analyzer from explicit collaborators.
    ///
    /// Fails with a configuration error when the analysis settings are inconsistent.
    pub fn new(
        config: AnalysisConfig,
        history: Arc<dyn ChatHistory + Send + Sync>,
        model: Arc<dyn ModelClient>,
        db: Arc<Database>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let cache = ReportCache::new(db, clock.clone(), config.cache_expire_days);
        Ok(Self {
            config,
            history,
            model,
            cache,
            clock,
            tz: None,
        })
    }

    /// Standard wiring: history and cache in `db`, HTTP model client, system clock.
    pub fn from_config(config: &Config, db: Arc<Database>) -> Result<Self> {
        let model = HttpModelClient::new(config.model_groups.clone())?;
        Self::new(
            config.analysis.clone(),
            db.clone(),
            Arc::new(model),
            db,
            Arc::new(SystemClock),
        )
    }

    /// Read hours and dates in `tz` instead of the local offset.
    pub fn with_time_zone(mut self, tz: FixedOffset) -> Self {
        self.tz = Some(tz);
        self
    }

    /// Offset used for the next analysis, resolved at call time.
    pub fn time_zone(&self) -> FixedOffset {
        self.tz.unwrap_or_else(|| *Local::now().offset())
    }

    pub fn cache(&self) -> &ReportCache {
        &self.cache
    }

    /// Build a request, filling unset window and cap from configuration.
    pub fn request(
        &self,
        chat_key: &str,
        user_id: &str,
        days: Option<u32>,
        max_messages: Option<usize>,
        force_refresh: bool,
    ) -> AnalysisRequest {
        AnalysisRequest {
            chat_key: chat_key.to_string(),
            user_id: user_id.to_string(),
            days: days.unwrap_or(self.config.default_analysis_days),
            max_messages: max_messages.unwrap_or(self.config.default_max_messages),
            force_refresh,
        }
    }

    /// Reject requests outside the accepted ranges.
    pub fn validate_request(&self, request: &AnalysisRequest) -> Result<()> {
        if request.chat_key.trim().is_empty() {
            return Err(Error::InvalidInput("chat key cannot be empty".to_string()));
        }
        if request.user_id.trim().is_empty() {
            return Err(Error::InvalidInput(
                "target user id cannot be empty".to_string(),
            ));
        }
        if !(1..=MAX_ANALYSIS_DAYS).contains(&request.days) {
            return Err(Error::InvalidInput(format!(
                "days must be between 1 and {}, got {}",
                MAX_ANALYSIS_DAYS, request.days
            )));
        }
        let min = self.config.min_message_threshold;
        if !(min..=MAX_MESSAGES_LIMIT).contains(&request.max_messages) {
            return Err(Error::InvalidInput(format!(
                "max messages must be between {} and {}, got {}",
                min, MAX_MESSAGES_LIMIT, request.max_messages
            )));
        }
        Ok(())
    }

    /// Run the analysis, serving a fresh cache entry unless refresh is forced.
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome> {
        self.validate_request(request)?;
        let key = request.cache_key();

        if !request.force_refresh {
            match self.cache.get(&key) {
                Ok(Some(entry)) => {
                    tracing::info!(key = %key, "Serving cached analysis");
                    return Ok(entry.into());
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(key = %key, error = %e, "Cache lookup failed"),
            }
        }

        tracing::info!(
            chat_key = %request.chat_key,
            user_id = %request.user_id,
            days = request.days,
            max_messages = request.max_messages,
            force_refresh = request.force_refresh,
            "Starting personality analysis"
        );

        let now = self.clock.now();
        let query = HistoryQuery::trailing(
            &request.chat_key,
            &request.user_id,
            request.days,
            request.max_messages,
            now,
        );
        let messages = retrieve_messages(
            self.history.as_ref(),
            &query,
            self.config.min_message_threshold,
        )?;

        let subject = messages
            .iter()
            .rev()
            .map(|m| m.sender_nickname.trim())
            .find(|n| !n.is_empty())
            .unwrap_or(request.user_id.as_str())
            .to_string();
        let range_start = messages.first().map(|m| m.sent_at).unwrap_or(now);
        let range_end = messages.last().map(|m| m.sent_at).unwrap_or(now);

        let cleaned: Vec<ChatMessage> = messages
            .into_iter()
            .map(|m| ChatMessage {
                text: clean_text(&m.text),
                ..m
            })
            .collect();

        let tz = self.time_zone();
        let summary = summarize(&cleaned, &tz);
        let patterns: Vec<BehaviorPattern> = if self.config.enable_behavior_pattern {
            detect_patterns(&summary)
        } else {
            Vec::new()
        };

        let result = if self.config.needs_model() {
            let sample: Vec<ChatMessage> = cleaned
                .iter()
                .filter(|m| !m.text.is_empty())
                .cloned()
                .collect();
            let prompt = PromptBuilder::new(&self.config).build(
                &subject,
                &summary,
                &patterns,
                &sample,
                &tz,
            )?;
            assess_with_client(
                self.model.as_ref(),
                &self.config.analysis_model_group,
                self.config.max_analysis_tokens,
                &prompt,
                self.sections(),
            )?
        } else {
            tracing::debug!("No model-backed section enabled; skipping model call");
            PersonalityResult::empty()
        };

        let report = render_report(
            &ReportContext {
                subject: &subject,
                generated_at: now,
                range_start,
                range_end,
                summary: &summary,
                patterns: &patterns,
                result: &result,
            },
            &tz,
        );

        match self.cache.put(key, report.clone(), result.clone()) {
            Ok(entry) => Ok(AnalysisOutcome {
                report,
                result,
                from_cache: false,
                created_at: entry.created_at,
                expires_at: entry.expires_at,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to cache analysis");
                Ok(AnalysisOutcome {
                    report,
                    result,
                    from_cache: false,
                    created_at: now,
                    expires_at: now + self.cache.ttl(),
                })
            }
        }
    }

    fn sections(&self) -> Sections {
        Sections {
            big_five: self.config.enable_big_five,
            mbti: self.config.enable_mbti,
            behavior_tags: self.config.enable_behavior_pattern,
        }
    }

    // ============================================
    // Host entry points
    // ============================================

    /// Analyze a user and return the Markdown report, or a readable error message.
    pub fn analyze_user_personality(
        &self,
        chat_key: &str,
        target_userid: &str,
        days: Option<u32>,
        max_messages: Option<usize>,
        force_refresh: bool,
    ) -> String {
        let request = self.request(chat_key, target_userid, days, max_messages, force_refresh);
        match self.analyze(&request) {
            Ok(outcome) => outcome.report,
            Err(e) => {
                tracing::warn!(
                    user_id = %target_userid,
                    kind = ?e.kind(),
                    error = %e,
                    "Personality analysis did not complete"
                );
                describe_error(&e)
            }
        }
    }

    /// Return the latest unexpired cached report for a user.
    pub fn get_personality_report(&self, chat_key: &str, target_userid: &str) -> String {
        match self.cache.latest_for_user(chat_key, target_userid) {
            Ok(Some(entry)) => entry.report_markdown,
            Ok(None) => format!(
                "No cached personality report for user {target_userid}. Run an analysis first."
            ),
            Err(e) => describe_error(&e),
        }
    }

    /// Drop every cached report for a user in a chat.
    pub fn clear_personality_cache(&self, chat_key: &str, target_userid: &str) -> String {
        match self.cache.clear_user(chat_key, target_userid) {
            Ok(0) => format!("No cached personality report for user {target_userid}."),
            Ok(n) => format!("Cleared {n} cached personality report(s) for user {target_userid}."),
            Err(e) => describe_error(&e),
        }
    }

    /// Delete expired cache entries.
    pub fn purge_expired(&self) -> Result<usize> {
        self.cache.purge_expired()
    }
}

/// User-facing text for an analysis error.
pub fn describe_error(err: &Error) -> String {
    match err.kind() {
        ErrorKind::NotFound => format!("Error: {err}."),
        ErrorKind::InsufficientSample => match err {
            Error::InsufficientSample { found, required } => format!(
                "Not enough messages for a meaningful analysis: found {found}, need at least {required}."
            ),
            _ => format!("Error: {err}."),
        },
        ErrorKind::Misconfiguration => format!("Analysis is misconfigured: {err}."),
        ErrorKind::ModelFailure => format!("Analysis failed: {err}."),
        ErrorKind::InvalidInput => format!("Error: {err}."),
        ErrorKind::Storage => format!("Analysis failed: {err}."),
    }
}
