//! Formatting helpers shared by the report and the CLI.

use chrono::{DateTime, Utc};

/// Format a span of seconds compactly (e.g., "45s", "3m 20s", "2h 5m").
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        let (m, s) = (secs / 60, secs % 60);
        if s == 0 {
            format!("{}m", m)
        } else {
            format!("{}m {}s", m, s)
        }
    } else {
        let (h, m) = (secs / 3600, (secs % 3600) / 60);
        if m == 0 {
            format!("{}h", h)
        } else {
            format!("{}h {}m", h, m)
        }
    }
}

/// Format `ts` relative to `now` (e.g., "2m ago").
pub fn format_relative_time(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(ts);

    if duration.num_seconds() < 0 {
        "just now".to_string()
    } else if duration.num_seconds() < 60 {
        format!("{}s ago", duration.num_seconds())
    } else if duration.num_minutes() < 60 {
        format!("{}m ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{}h ago", duration.num_hours())
    } else if duration.num_days() < 7 {
        format!("{}d ago", duration.num_days())
    } else {
        ts.format("%b %d").to_string()
    }
}

/// Format time remaining until `ts` (e.g., "in 6d"), or "expired".
pub fn format_time_left(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let left = ts.signed_duration_since(now);
    if left.num_seconds() <= 0 {
        "expired".to_string()
    } else if left.num_hours() < 1 {
        format!("in {}m", left.num_minutes().max(1))
    } else if left.num_days() < 1 {
        format!("in {}h", left.num_hours())
    } else {
        format!("in {}d", left.num_days())
    }
}
