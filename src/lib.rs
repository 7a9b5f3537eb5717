//! UEBA Analyzer — rolls normalized security events into per-entity daily
//! risk history.
//!
//! Modular structure:
//! - [`window`] — UTC calendar-day window math
//! - [`pipeline`] — Feature extraction, threshold rules, weighted scoring
//! - [`storage`] — SQLite repository: events in, risk history and checkpoints out
//! - [`baseline`] — Per-entity trailing score baselines and anomaly assessment
//! - [`service`] — Run orchestration: one-shot and daemon modes
//! - [`logging`] — Structured JSON logging and the anomaly alert file

pub mod baseline;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod service;
pub mod storage;
pub mod window;

pub use baseline::{BaselineAssessment, BaselineCalculator, BaselineStats};
pub use config::AnalyzerConfig;
pub use error::{AnalyzerError, ConfigError, ProcessingError, RepositoryError};
pub use logging::{AlertLogger, StructuredLogger};
pub use pipeline::{
    AnalyzerPipeline, DailyFeatureExtractor, FeatureExtractor, FeatureSummary, RuleEvaluation,
    RuleEvaluator, ScoringStrategy, ThresholdRule, ThresholdRuleEvaluator, WeightedScoring,
};
pub use service::{AnalyzerService, RunSummary};
pub use storage::{AnalyzerStore, EntityRecord, EventRecord, RiskHistoryRecord, RiskReason};
pub use window::DayWindow;
