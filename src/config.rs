//! Analyzer configuration: JSON file on disk, defaults when absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::pipeline::{default_rules, ThresholdRule};

fn unix_epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// SQLite database holding events, entities, and risk history
    pub database_path: PathBuf,
    /// Generator tag stamped on every record and checkpoint this service writes
    pub generator: String,
    /// Lower bound when no checkpoint exists and no --since is given
    pub default_since: DateTime<Utc>,
    /// Threshold rule set
    pub rules: RulesConfig,
    /// Scoring weights
    pub scoring: ScoringConfig,
    /// Baseline / anomaly detection
    pub baseline: BaselineConfig,
    /// Anomaly alert log
    pub alerts: AlertsConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub rules: Vec<ThresholdRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Points per event
    pub event_count_weight: f64,
    /// Cap on the event-count term
    pub event_count_cap: f64,
    /// Points at severity 10
    pub severity_weight: f64,
    /// Points per triggered rule (uncapped before the final 100-point cap)
    pub rule_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    pub enabled: bool,
    /// Trailing history window (days) for per-entity avg/sigma
    pub window_days: i64,
    /// Anomaly threshold is avg + sigma_multiplier * sigma
    pub sigma_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub enabled: bool,
    /// Newline-delimited JSON alert file
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("ueba.db"),
            generator: "analyzer_service".to_string(),
            default_since: unix_epoch(),
            rules: RulesConfig::default(),
            scoring: ScoringConfig::default(),
            baseline: BaselineConfig::default(),
            alerts: AlertsConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            event_count_weight: 2.0,
            event_count_cap: 40.0,
            severity_weight: 30.0,
            rule_weight: 30.0,
        }
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_days: 30,
            sigma_multiplier: 3.0,
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("ueba_alerts.log"),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl AnalyzerConfig {
    /// Load from a JSON file. A missing file yields defaults; an unreadable
    /// or malformed file is a [`ConfigError`], not a silent fallback.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Invalid {
            path: path.display().to_string(),
            source,
        })
    }
}
