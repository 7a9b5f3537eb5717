//! Analyzer pipeline: feature extraction → rule evaluation → scoring.
//! Stages are trait objects chosen at service construction, so an alternate
//! extractor or scoring strategy slots in without touching orchestration.

mod features;
mod rules;
mod scoring;

pub use features::DailyFeatureExtractor;
pub use rules::{default_rules, Comparison, Metric, ThresholdRule, ThresholdRuleEvaluator};
pub use scoring::WeightedScoring;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::{RulesConfig, ScoringConfig};
use crate::error::ProcessingError;
use crate::window::DayWindow;

use crate::storage::EventRecord;

/// Aggregate statistics for one entity within one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub event_count: u64,
    /// Max severity observed (0-10), or 0 if no event carried one.
    pub highest_severity: i64,
    /// Distinct event types, sorted.
    pub event_types: BTreeSet<String>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub last_observed_at: Option<DateTime<Utc>>,
}

impl FeatureSummary {
    pub fn is_empty(&self) -> bool {
        self.event_count == 0
    }
}

/// Rules that fired for a feature summary, in rule-definition order, plus the
/// feature values that justified each firing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    pub triggered: Vec<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Final pipeline output for one entity/window.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub entity_id: i64,
    pub window: DayWindow,
    pub features: FeatureSummary,
    pub rules: RuleEvaluation,
    /// Normalized risk score in [0.0, 1.0].
    pub risk_score: f64,
}

/// Turns the events of one entity/window into a [`FeatureSummary`].
/// Must be pure: identical event sets yield identical summaries.
pub trait FeatureExtractor: Send + Sync {
    fn extract(
        &self,
        window: &DayWindow,
        events: &[EventRecord],
    ) -> Result<FeatureSummary, ProcessingError>;
}

/// Evaluates a rule set against a feature summary. Total: never fails for a
/// valid summary.
pub trait RuleEvaluator: Send + Sync {
    fn evaluate(&self, features: &FeatureSummary) -> RuleEvaluation;
}

/// Combines features and triggered rules into a normalized [0.0, 1.0] score.
pub trait ScoringStrategy: Send + Sync {
    fn score(
        &self,
        features: &FeatureSummary,
        rules: &RuleEvaluation,
    ) -> Result<f64, ProcessingError>;
}

/// The three stages wired together.
pub struct AnalyzerPipeline {
    extractor: Box<dyn FeatureExtractor>,
    evaluator: Box<dyn RuleEvaluator>,
    scorer: Box<dyn ScoringStrategy>,
}

impl AnalyzerPipeline {
    pub fn new(
        extractor: Box<dyn FeatureExtractor>,
        evaluator: Box<dyn RuleEvaluator>,
        scorer: Box<dyn ScoringStrategy>,
    ) -> Self {
        Self {
            extractor,
            evaluator,
            scorer,
        }
    }

    /// Default stages driven by config: daily aggregates, threshold rules,
    /// weighted scoring.
    pub fn from_config(rules: &RulesConfig, scoring: &ScoringConfig) -> Self {
        Self::new(
            Box::new(DailyFeatureExtractor),
            Box::new(ThresholdRuleEvaluator::new(rules.rules.clone())),
            Box::new(WeightedScoring::new(scoring.clone())),
        )
    }

    /// Run all three stages for one entity/window.
    pub fn analyze(
        &self,
        entity_id: i64,
        window: DayWindow,
        events: &[EventRecord],
    ) -> Result<AnalysisResult, ProcessingError> {
        let features = self.extractor.extract(&window, events)?;
        let rules = self.evaluator.evaluate(&features);
        let risk_score = self.scorer.score(&features, &rules)?;
        Ok(AnalysisResult {
            entity_id,
            window,
            features,
            rules,
            risk_score,
        })
    }
}
