//! SQLite-backed store: events and entities in, risk history and checkpoints out.

mod repository;

pub use repository::AnalyzerStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::baseline::BaselineAssessment;

/// Stable identity an upstream ingestion system resolves events against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: i64,
    pub entity_type: String,
    pub entity_value: String,
}

/// One normalized, timestamped security event. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: i64,
    pub entity_id: i64,
    pub event_type: String,
    /// Bounded 0-10
    pub severity: i64,
    pub observed_at: DateTime<Utc>,
}

/// One persisted per-entity, per-window risk rollup. `observed_at` is the
/// exclusive window-end boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskHistoryRecord {
    pub entity_id: i64,
    pub observed_at: DateTime<Utc>,
    /// Normalized [0.0, 1.0]
    pub risk_score: f64,
    pub generator: String,
    pub reason: RiskReason,
}

/// Structured explanation persisted alongside every risk score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReason {
    pub generator: String,
    pub kind: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub event_count: u64,
    pub highest_severity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_observed_at: Option<DateTime<Utc>>,
    pub rules: ReasonRules,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<BaselineAssessment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasonRules {
    pub triggered: Vec<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Reason kind for the daily rollup records this service generates.
pub const REASON_KIND: &str = "daily_rollup";
