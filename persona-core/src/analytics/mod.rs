//! Analytics module for persona
//!
//! Everything here is computed locally, before and independently of the model:
//! - [`stats`]: frequency counters over the message sample
//! - [`patterns`]: rule-based behavior labels over those counters

pub mod patterns;
pub mod stats;

pub use patterns::{detect_patterns, BehaviorPattern};
pub use stats::{summarize, DayPart, StatisticalSummary, REPLY_WINDOW_SECS};
