//! Database layer for persona
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Chat history queries
//! - The analysis cache table

pub mod repo;
pub mod schema;

pub use repo::{CachedAnalysis, Database};
