//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: chat history
    r#"
    CREATE TABLE IF NOT EXISTS chat_messages (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        chat_key         TEXT NOT NULL,
        sender_id        TEXT NOT NULL,
        sender_nickname  TEXT NOT NULL DEFAULT '',
        sent_at          INTEGER NOT NULL,   -- unix seconds
        text             TEXT NOT NULL,
        has_mention      INTEGER NOT NULL DEFAULT 0,
        has_emoji        INTEGER NOT NULL DEFAULT 0,
        is_system        INTEGER NOT NULL DEFAULT 0,
        is_recalled      INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_chat_messages_sender
        ON chat_messages(chat_key, sender_id, sent_at DESC);
    "#,
    // Version 2: analysis cache
    r#"
    CREATE TABLE IF NOT EXISTS analysis_cache (
        chat_key         TEXT NOT NULL,
        user_id          TEXT NOT NULL,
        days             INTEGER NOT NULL,
        max_messages     INTEGER NOT NULL,
        report_markdown  TEXT NOT NULL,
        result           JSON NOT NULL,
        created_at       INTEGER NOT NULL,   -- unix seconds
        expires_at       INTEGER NOT NULL,   -- unix seconds

        PRIMARY KEY (chat_key, user_id, days, max_messages)
    );

    CREATE INDEX IF NOT EXISTS idx_analysis_cache_expiry ON analysis_cache(expires_at);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
