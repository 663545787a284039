//! # persona-core
//!
//! Core library for persona, a chat-history personality analyzer.
//!
//! This library provides:
//! - Domain types for chat messages, requests and cache keys
//! - Database storage layer with SQLite (chat history and report cache)
//! - Redaction, statistics and rule-based behavior patterns
//! - Prompt construction and a model client for configured model groups
//! - Markdown report rendering
//! - Configuration management and logging infrastructure
//!
//! ## Pipeline
//!
//! Retrieval → redaction → statistics → prompt → model → report, with the
//! report cache short-circuiting on a fresh hit. [`PersonalityAnalyzer`]
//! drives the whole thing.
//!
//! ## Example
//!
//! ```rust,no_run
//! use persona_core::{Config, Database, PersonalityAnalyzer};
//! use std::sync::Arc;
//!
//! let config = Config::load().expect("failed to load config");
//!
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let analyzer = PersonalityAnalyzer::from_config(&config, Arc::new(db))
//!     .expect("invalid analysis settings");
//! println!("{}", analyzer.analyze_user_personality("group_1", "12345", None, None, false));
//! ```

// Re-export commonly used items at the crate root
pub use analyzer::{describe_error, AnalysisOutcome, PersonalityAnalyzer};
pub use assessment::{CompletionRequest, HttpModelClient, ModelClient};
pub use cache::{Clock, ReportCache, SystemClock};
pub use config::Config;
pub use db::{CachedAnalysis, Database};
pub use error::{Error, ErrorKind, Result};
pub use history::{ChatHistory, HistoryQuery};
pub use personality::PersonalityResult;
pub use types::*;

// Public modules
pub mod analytics;
pub mod analyzer;
pub mod assessment;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod history;
pub mod logging;
pub mod personality;
pub mod prompt;
pub mod redact;
pub mod report;
pub mod types;
