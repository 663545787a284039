//! persona - personality analysis over stored chat history
//!
//! Imports chat messages into the local database, runs analyses against the
//! configured model group and manages the report cache.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use persona_core::format::{format_relative_time, format_time_left};
use persona_core::{describe_error, ChatMessage, Config, Database, PersonalityAnalyzer};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "persona")]
#[command(about = "Personality analysis over chat history")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import chat messages from a JSON Lines file (one message per line)
    Import {
        /// File to read
        file: PathBuf,

        /// Store every message under this chat key instead of the one in the record
        #[arg(long)]
        chat: Option<String>,
    },

    /// Analyze a user and print the Markdown report
    Analyze {
        /// Chat key the user is analyzed in
        #[arg(long)]
        chat: String,

        /// Target user id
        #[arg(long)]
        user: String,

        /// Trailing days of history (defaults to the configured window)
        #[arg(short, long)]
        days: Option<u32>,

        /// Upper bound on messages (defaults to the configured cap)
        #[arg(short = 'n', long)]
        max_messages: Option<usize>,

        /// Ignore a cached report and analyze again
        #[arg(long)]
        force: bool,

        /// Output format: markdown (default) or json
        #[arg(short, long, default_value = "markdown")]
        format: String,
    },

    /// Print the latest cached report for a user
    Report {
        #[arg(long)]
        chat: String,

        #[arg(long)]
        user: String,
    },

    /// Drop cached reports
    Clear {
        #[arg(long, required_unless_present = "all")]
        chat: Option<String>,

        #[arg(long, required_unless_present = "all")]
        user: Option<String>,

        /// Drop every cached report
        #[arg(long, conflicts_with_all = ["chat", "user"])]
        all: bool,
    },

    /// Delete expired cache entries
    Purge,

    /// Show database location and contents
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        persona_core::logging::init(&config.logging).context("failed to initialize logging")?;

    // Open database
    let db_path = Config::database_path();
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;
    let db = Arc::new(db);

    match cli.command {
        Command::Import { file, chat } => import(&db, &file, chat.as_deref()),
        Command::Analyze {
            chat,
            user,
            days,
            max_messages,
            force,
            format,
        } => {
            let analyzer = analyzer(&config, db)?;
            let request = analyzer.request(&chat, &user, days, max_messages, force);
            let outcome = match analyzer.analyze(&request) {
                Ok(outcome) => outcome,
                Err(e) => anyhow::bail!("{}", describe_error(&e)),
            };

            match format.as_str() {
                "json" => {
                    let output = serde_json::json!({
                        "chat_key": request.chat_key,
                        "user_id": request.user_id,
                        "days": request.days,
                        "max_messages": request.max_messages,
                        "from_cache": outcome.from_cache,
                        "created_at": outcome.created_at.to_rfc3339(),
                        "expires_at": outcome.expires_at.to_rfc3339(),
                        "result": outcome.result,
                        "report": outcome.report,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                "markdown" => {
                    if outcome.from_cache {
                        let now = Utc::now();
                        eprintln!(
                            "Cached report from {}, expires {}. Use --force to analyze again.",
                            format_relative_time(outcome.created_at, now),
                            format_time_left(outcome.expires_at, now)
                        );
                    }
                    println!("{}", outcome.report);
                }
                other => anyhow::bail!("unknown output format '{}'", other),
            }
            Ok(())
        }
        Command::Report { chat, user } => {
            let analyzer = analyzer(&config, db)?;
            println!("{}", analyzer.get_personality_report(&chat, &user));
            Ok(())
        }
        Command::Clear { chat, user, all } => {
            let analyzer = analyzer(&config, db)?;
            if all {
                let removed = analyzer.cache().clear_all()?;
                println!("Cleared {} cached personality report(s).", removed);
            } else {
                let (Some(chat), Some(user)) = (chat, user) else {
                    anyhow::bail!("--chat and --user are required unless --all is given");
                };
                println!("{}", analyzer.clear_personality_cache(&chat, &user));
            }
            Ok(())
        }
        Command::Purge => {
            let analyzer = analyzer(&config, db)?;
            let purged = analyzer.purge_expired()?;
            println!("Purged {} expired cache entr{}.", purged, plural_y(purged));
            Ok(())
        }
        Command::Status => {
            println!("Config:   {}", Config::config_path().display());
            println!("Database: {}", db_path.display());
            println!("Log:      {}", Config::log_path().display());
            println!("Messages: {}", db.count_chat_messages()?);
            println!("Reports:  {}", db.count_cached_analyses()?);
            Ok(())
        }
    }
}

fn analyzer(config: &Config, db: Arc<Database>) -> Result<PersonalityAnalyzer> {
    PersonalityAnalyzer::from_config(config, db).context("invalid analysis configuration")
}

fn import(db: &Database, file: &Path, chat: Option<&str>) -> Result<()> {
    let handle = std::fs::File::open(file)
        .with_context(|| format!("failed to open {}", file.display()))?;

    let mut messages = Vec::new();
    for (idx, line) in BufReader::new(handle).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", file.display()))?;
        if line.trim().is_empty() {
            continue;
        }

        let mut message: ChatMessage = serde_json::from_str(&line)
            .with_context(|| format!("invalid message on line {}", idx + 1))?;
        if let Some(chat) = chat {
            message.chat_key = chat.to_string();
        }
        messages.push(message.with_derived_flags());
    }

    let inserted = db
        .insert_chat_messages(&messages)
        .context("failed to store messages")?;
    tracing::info!(file = %file.display(), inserted, "Imported chat messages");
    println!("Imported {} messages from {}", inserted, file.display());
    Ok(())
}

fn plural_y(n: usize) -> &'static str {
    if n == 1 {
        "y"
    } else {
        "ies"
    }
}
