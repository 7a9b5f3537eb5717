//! Error types for the analyzer. Only [`ConfigError`] and [`RepositoryError`]
//! reach the caller; [`ProcessingError`] is recovered per entity inside a run.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Invalid or contradictory run parameters. The run never starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--since {since} is after --until {until}")]
    SinceAfterUntil {
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    },

    #[error("invalid timestamp {input:?}: expected RFC 3339 or YYYY-MM-DD")]
    InvalidTimestamp { input: String },

    #[error("cannot read config {path}: {source}")]
    Unreadable {
        path: String,
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Invalid {
        path: String,
        source: serde_json::Error,
    },

    #[error("cannot open alert log {path}: {source}")]
    AlertLog {
        path: String,
        source: std::io::Error,
    },
}

/// Store connectivity/query failure. Fatal to the current run; already
/// persisted windows are untouched, so the next run resumes from them.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("reason payload error: {0}")]
    Reason(#[from] serde_json::Error),

    #[error("timestamp out of range: {0} ms")]
    TimestampRange(i64),
}

/// Failure in extraction/evaluation/scoring for one entity/window.
/// Logged and skipped; the window and the run continue.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("feature extraction failed: {0}")]
    Extraction(String),

    #[error("scoring produced an invalid value: {0}")]
    InvalidScore(f64),
}

/// Caller-facing error for a run: everything that maps to a non-zero exit.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
