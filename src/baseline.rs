//! Per-entity score baselines: trailing mean/sigma over persisted history,
//! used to flag windows whose score breaks out of the entity's own norm.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::BaselineConfig;
use crate::error::RepositoryError;
use crate::storage::AnalyzerStore;

/// Trailing-window aggregates for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineStats {
    pub avg: f64,
    pub sigma: f64,
}

/// Baseline comparison recorded in the reason payload and the alert log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineAssessment {
    pub avg: f64,
    pub sigma: f64,
    /// score - avg
    pub delta: f64,
    pub is_anomalous: bool,
}

/// Computes baselines against the store, caching per entity for the duration
/// of one run. The cache must not outlive the run: scores persisted by the
/// run itself would otherwise be invisible to its own baselines.
pub struct BaselineCalculator<'a> {
    store: &'a AnalyzerStore,
    config: BaselineConfig,
    cache: HashMap<i64, BaselineStats>,
}

impl<'a> BaselineCalculator<'a> {
    pub fn new(store: &'a AnalyzerStore, config: BaselineConfig) -> Self {
        Self {
            store,
            config,
            cache: HashMap::new(),
        }
    }

    fn stats(
        &mut self,
        entity_id: i64,
        until: DateTime<Utc>,
    ) -> Result<BaselineStats, RepositoryError> {
        if let Some(stats) = self.cache.get(&entity_id) {
            return Ok(*stats);
        }
        let stats = self
            .store
            .baseline_stats(entity_id, until, self.config.window_days)?;
        self.cache.insert(entity_id, stats);
        Ok(stats)
    }

    /// Compare a freshly computed score with the entity's trailing baseline.
    /// Anomalous when score > avg + sigma_multiplier * sigma.
    pub fn assess(
        &mut self,
        entity_id: i64,
        until: DateTime<Utc>,
        risk_score: f64,
    ) -> Result<BaselineAssessment, RepositoryError> {
        let stats = self.stats(entity_id, until)?;
        let threshold = stats.avg + self.config.sigma_multiplier * stats.sigma;
        Ok(BaselineAssessment {
            avg: stats.avg,
            sigma: stats.sigma,
            delta: risk_score - stats.avg,
            is_anomalous: risk_score > threshold,
        })
    }
}
