//! Anomaly alert log: newline-delimited JSON, append-only, one line per
//! entity/window whose score broke out of its baseline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyAlert {
    pub timestamp: DateTime<Utc>,
    pub entity_id: i64,
    pub window_end: DateTime<Utc>,
    pub risk_score: f64,
    pub baseline_avg: f64,
    pub baseline_sigma: f64,
    pub delta: f64,
    pub triggered_rules: Vec<String>,
}

pub struct AlertLogger {
    path: PathBuf,
}

impl AlertLogger {
    pub fn new(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one alert line. An I/O failure is reported to the caller; the
    /// analyzer logs it and keeps the run alive (alerting is best-effort).
    pub fn log_anomaly(&self, alert: &AnomalyAlert) -> std::io::Result<()> {
        let line = serde_json::to_string(alert)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}
