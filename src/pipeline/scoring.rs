//! Weighted additive scoring on an internal 0-100 scale, normalized to
//! [0.0, 1.0] before persistence.

use super::{FeatureSummary, RuleEvaluation, ScoringStrategy};
use crate::config::ScoringConfig;
use crate::error::ProcessingError;

/// Reference scoring strategy:
///
/// ```text
/// points = min(event_count * 2, 40)
///        + (highest_severity / 10) * 30
///        + 30 * triggered_rule_count
/// score  = min(points, 100) / 100
/// ```
///
/// The per-rule term is uncapped before the final 100-point cap, so three
/// triggered rules alone saturate the score.
pub struct WeightedScoring {
    config: ScoringConfig,
}

impl WeightedScoring {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }
}

impl Default for WeightedScoring {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

impl ScoringStrategy for WeightedScoring {
    fn score(
        &self,
        features: &FeatureSummary,
        rules: &RuleEvaluation,
    ) -> Result<f64, ProcessingError> {
        let c = &self.config;

        let volume = (features.event_count as f64 * c.event_count_weight).min(c.event_count_cap);
        let severity = (features.highest_severity as f64 / 10.0) * c.severity_weight;
        let triggered = rules.triggered.len() as f64 * c.rule_weight;

        let points = (volume + severity + triggered).min(100.0);
        let score = points / 100.0;

        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(ProcessingError::InvalidScore(score));
        }
        Ok(score)
    }
}
