//! Pipeline tests: extraction, rule evaluation, scoring, determinism.

use chrono::{DateTime, Duration, TimeZone, Utc};
use ueba_analyzer::pipeline::{
    default_rules, AnalyzerPipeline, Comparison, DailyFeatureExtractor, FeatureExtractor, Metric,
    RuleEvaluator, ScoringStrategy, ThresholdRule, ThresholdRuleEvaluator, WeightedScoring,
};
use ueba_analyzer::storage::EventRecord;
use ueba_analyzer::window::DayWindow;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn window() -> DayWindow {
    DayWindow::containing(base_time())
}

fn events(count: usize, severity: i64) -> Vec<EventRecord> {
    (0..count)
        .map(|i| EventRecord {
            id: i as i64 + 1,
            entity_id: 1,
            event_type: format!("type_{}", i % 3),
            severity,
            observed_at: base_time() + Duration::seconds(i as i64),
        })
        .collect()
}

fn pipeline() -> AnalyzerPipeline {
    AnalyzerPipeline::new(
        Box::new(DailyFeatureExtractor),
        Box::new(ThresholdRuleEvaluator::default()),
        Box::new(WeightedScoring::default()),
    )
}

#[test]
fn extracts_daily_aggregates() {
    let evs = events(5, 4);
    let features = DailyFeatureExtractor.extract(&window(), &evs).unwrap();
    assert_eq!(features.event_count, 5);
    assert_eq!(features.highest_severity, 4);
    assert_eq!(features.event_types.len(), 3);
    assert_eq!(
        features.last_observed_at,
        Some(base_time() + Duration::seconds(4))
    );
    assert_eq!(features.window_start, window().start);
    assert_eq!(features.window_end, window().end);
}

#[test]
fn empty_event_set_yields_zeroed_summary() {
    let features = DailyFeatureExtractor.extract(&window(), &[]).unwrap();
    assert!(features.is_empty());
    assert_eq!(features.event_count, 0);
    assert_eq!(features.highest_severity, 0);
    assert!(features.event_types.is_empty());
    assert_eq!(features.last_observed_at, None);
}

#[test]
fn severity_is_clamped_into_bounds() {
    let mut evs = events(2, 0);
    evs[0].severity = 99;
    evs[1].severity = -3;
    let features = DailyFeatureExtractor.extract(&window(), &evs).unwrap();
    assert_eq!(features.highest_severity, 10);
}

#[test]
fn extraction_is_deterministic() {
    let evs = events(7, 6);
    let first = DailyFeatureExtractor.extract(&window(), &evs).unwrap();
    let second = DailyFeatureExtractor.extract(&window(), &evs).unwrap();
    assert_eq!(first, second);
}

#[test]
fn default_rules_fire_on_volume_and_severity() {
    let evaluator = ThresholdRuleEvaluator::default();
    let features = DailyFeatureExtractor
        .extract(&window(), &events(12, 9))
        .unwrap();
    let evaluation = evaluator.evaluate(&features);
    assert_eq!(
        evaluation.triggered,
        vec!["high_event_volume", "high_severity_detected"]
    );
    assert_eq!(evaluation.metadata["event_count"], 12);
    assert_eq!(evaluation.metadata["highest_severity"], 9);
}

#[test]
fn rules_below_threshold_stay_quiet() {
    let evaluator = ThresholdRuleEvaluator::default();
    let features = DailyFeatureExtractor
        .extract(&window(), &events(3, 2))
        .unwrap();
    let evaluation = evaluator.evaluate(&features);
    assert!(evaluation.triggered.is_empty());
    assert!(evaluation.metadata.is_empty());
}

#[test]
fn triggered_rules_keep_definition_order_and_dedupe() {
    let mut rules = vec![ThresholdRule::new(
        "types_spread",
        Metric::DistinctEventTypes,
        Comparison::GreaterOrEqual,
        2,
    )];
    rules.extend(default_rules());
    // Same name twice: must fire once.
    rules.push(ThresholdRule::new(
        "high_event_volume",
        Metric::EventCount,
        Comparison::GreaterThan,
        0,
    ));
    let evaluator = ThresholdRuleEvaluator::new(rules);
    let features = DailyFeatureExtractor
        .extract(&window(), &events(12, 9))
        .unwrap();
    let evaluation = evaluator.evaluate(&features);
    assert_eq!(
        evaluation.triggered,
        vec!["types_spread", "high_event_volume", "high_severity_detected"]
    );
}

#[test]
fn scenario_high_volume_high_severity_saturates() {
    // 12 events, severity 9, 2 rules: min(24,40) + 27 + 60 = 111 -> capped 100
    let result = pipeline().analyze(1, window(), &events(12, 9)).unwrap();
    assert_eq!(result.rules.triggered.len(), 2);
    assert_eq!(result.risk_score, 1.0);
}

#[test]
fn scenario_low_activity_scores_low() {
    // 3 events, severity 2, 0 rules: 6 + 6 + 0 = 12 -> 0.12
    let result = pipeline().analyze(1, window(), &events(3, 2)).unwrap();
    assert!(result.rules.triggered.is_empty());
    assert!((result.risk_score - 0.12).abs() < 1e-9);
}

#[test]
fn rule_triggers_alone_can_saturate() {
    // The per-rule term is uncapped before the final 100-point cap:
    // four fired rules are 120 points on their own.
    let rules: Vec<ThresholdRule> = (1..=4)
        .map(|i| {
            ThresholdRule::new(
                format!("r{}", i),
                Metric::EventCount,
                Comparison::GreaterOrEqual,
                1,
            )
        })
        .collect();
    let pipeline = AnalyzerPipeline::new(
        Box::new(DailyFeatureExtractor),
        Box::new(ThresholdRuleEvaluator::new(rules)),
        Box::new(WeightedScoring::default()),
    );
    let result = pipeline.analyze(1, window(), &events(1, 0)).unwrap();
    assert_eq!(result.risk_score, 1.0);
}

#[test]
fn score_stays_in_bounds_across_input_grid() {
    let scorer = WeightedScoring::default();
    let evaluator = ThresholdRuleEvaluator::default();
    for count in [0usize, 1, 5, 10, 11, 100, 10_000] {
        for severity in 0..=10 {
            let features = DailyFeatureExtractor
                .extract(&window(), &events(count, severity))
                .unwrap();
            let rules = evaluator.evaluate(&features);
            let score = scorer.score(&features, &rules).unwrap();
            assert!((0.0..=1.0).contains(&score), "score {} out of bounds", score);
        }
    }
}

#[test]
fn repeated_scoring_is_deterministic() {
    let pipeline = pipeline();
    let evs = events(8, 7);
    let first = pipeline.analyze(1, window(), &evs).unwrap();
    let second = pipeline.analyze(1, window(), &evs).unwrap();
    assert_eq!(first.risk_score, second.risk_score);
    assert_eq!(first.features, second.features);
    assert_eq!(first.rules, second.rules);
}
