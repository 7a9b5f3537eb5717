//! Threshold rules as data: a declarative (name, metric, comparison,
//! threshold) list evaluated generically, so new rules are config changes,
//! not code changes.

use serde::{Deserialize, Serialize};

use super::{FeatureSummary, RuleEvaluation, RuleEvaluator};

/// Feature the rule reads from the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    EventCount,
    HighestSeverity,
    DistinctEventTypes,
}

impl Metric {
    fn key(&self) -> &'static str {
        match self {
            Metric::EventCount => "event_count",
            Metric::HighestSeverity => "highest_severity",
            Metric::DistinctEventTypes => "distinct_event_types",
        }
    }

    fn value(&self, features: &FeatureSummary) -> i64 {
        match self {
            Metric::EventCount => features.event_count as i64,
            Metric::HighestSeverity => features.highest_severity,
            Metric::DistinctEventTypes => features.event_types.len() as i64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessOrEqual,
}

impl Comparison {
    fn holds(&self, value: i64, threshold: i64) -> bool {
        match self {
            Comparison::GreaterThan => value > threshold,
            Comparison::GreaterOrEqual => value >= threshold,
            Comparison::LessThan => value < threshold,
            Comparison::LessOrEqual => value <= threshold,
        }
    }
}

/// One named threshold predicate over a feature summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub name: String,
    pub metric: Metric,
    pub comparison: Comparison,
    pub threshold: i64,
}

impl ThresholdRule {
    pub fn new(
        name: impl Into<String>,
        metric: Metric,
        comparison: Comparison,
        threshold: i64,
    ) -> Self {
        Self {
            name: name.into(),
            metric,
            comparison,
            threshold,
        }
    }
}

/// The stock rule set: unusually many events, or any high-severity event.
pub fn default_rules() -> Vec<ThresholdRule> {
    vec![
        ThresholdRule::new(
            "high_event_volume",
            Metric::EventCount,
            Comparison::GreaterThan,
            10,
        ),
        ThresholdRule::new(
            "high_severity_detected",
            Metric::HighestSeverity,
            Comparison::GreaterOrEqual,
            8,
        ),
    ]
}

/// Evaluates an ordered rule list; fired rules keep definition order and
/// duplicate names fire once.
pub struct ThresholdRuleEvaluator {
    rules: Vec<ThresholdRule>,
}

impl ThresholdRuleEvaluator {
    pub fn new(rules: Vec<ThresholdRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ThresholdRule] {
        &self.rules
    }
}

impl Default for ThresholdRuleEvaluator {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl RuleEvaluator for ThresholdRuleEvaluator {
    fn evaluate(&self, features: &FeatureSummary) -> RuleEvaluation {
        let mut evaluation = RuleEvaluation::default();
        for rule in &self.rules {
            let value = rule.metric.value(features);
            if !rule.comparison.holds(value, rule.threshold) {
                continue;
            }
            if evaluation.triggered.iter().any(|name| name == &rule.name) {
                continue;
            }
            evaluation.triggered.push(rule.name.clone());
            evaluation
                .metadata
                .insert(rule.metric.key().to_string(), value.into());
        }
        evaluation
    }
}
