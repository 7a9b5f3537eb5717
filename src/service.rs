//! Analyzer orchestration: resolve the processing range, walk day windows in
//! ascending order, run the pipeline per active entity, persist each window
//! plus its checkpoint transactionally.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::baseline::{BaselineAssessment, BaselineCalculator};
use crate::config::{AnalyzerConfig, BaselineConfig};
use crate::error::{AnalyzerError, ConfigError};
use crate::logging::{AlertLogger, AnomalyAlert};
use crate::pipeline::{AnalyzerPipeline, AnalysisResult};
use crate::storage::{AnalyzerStore, ReasonRules, RiskHistoryRecord, RiskReason, REASON_KIND};
use crate::window::{day_windows, start_of_current_day, DayWindow};

/// Outcome of one analyzer run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub windows: usize,
    pub records: usize,
    pub skipped_entities: usize,
    /// Checkpoint after the run, None when nothing has ever been processed.
    pub checkpoint: Option<DateTime<Utc>>,
}

impl RunSummary {
    pub fn is_noop(&self) -> bool {
        self.windows == 0
    }
}

/// Processes normalized events into per-entity daily risk history.
pub struct AnalyzerService {
    store: AnalyzerStore,
    pipeline: AnalyzerPipeline,
    generator: String,
    default_since: DateTime<Utc>,
    baseline: BaselineConfig,
    alerts: Option<AlertLogger>,
}

impl AnalyzerService {
    pub fn new(
        store: AnalyzerStore,
        pipeline: AnalyzerPipeline,
        config: &AnalyzerConfig,
        alerts: Option<AlertLogger>,
    ) -> Self {
        Self {
            store,
            pipeline,
            generator: config.generator.clone(),
            default_since: config.default_since,
            baseline: config.baseline.clone(),
            alerts,
        }
    }

    /// Open the store and wire the default pipeline stages from config.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let store = AnalyzerStore::open(&config.database_path)?;
        let pipeline = AnalyzerPipeline::from_config(&config.rules, &config.scoring);
        let alerts = if config.alerts.enabled {
            let logger = AlertLogger::new(&config.alerts.path).map_err(|source| {
                ConfigError::AlertLog {
                    path: config.alerts.path.display().to_string(),
                    source,
                }
            })?;
            Some(logger)
        } else {
            None
        };
        Ok(Self::new(store, pipeline, config, alerts))
    }

    pub fn store(&self) -> &AnalyzerStore {
        &self.store
    }

    /// One-shot run. See [`AnalyzerService::run`]; the stop flag is never set.
    pub fn run_once(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<RunSummary, AnalyzerError> {
        self.run(since, until, &AtomicBool::new(false))
    }

    /// One run: IDLE → DETERMINE_RANGE → PROCESS_WINDOWS.
    ///
    /// `since` falls back to the checkpoint, then the configured default;
    /// `until` falls back to the start of the current UTC day so the
    /// in-progress day is never processed. The stop flag is honored between
    /// windows: the in-flight window finishes and commits, then the run
    /// returns its partial summary cleanly.
    pub fn run(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        stop: &AtomicBool,
    ) -> Result<RunSummary, AnalyzerError> {
        let run_id = Uuid::new_v4();

        if let (Some(s), Some(u)) = (since, until) {
            if s > u {
                return Err(ConfigError::SinceAfterUntil { since: s, until: u }.into());
            }
        }

        let until = until.unwrap_or_else(start_of_current_day);
        let since = match since {
            Some(explicit) => explicit,
            None => self
                .store
                .latest_checkpoint(&self.generator)?
                .unwrap_or(self.default_since),
        };

        let mut summary = RunSummary {
            run_id,
            windows: 0,
            records: 0,
            skipped_entities: 0,
            checkpoint: self.store.latest_checkpoint(&self.generator)?,
        };

        if since >= until {
            info!(
                run_id = %run_id,
                %since,
                %until,
                "nothing to process: range is empty"
            );
            return Ok(summary);
        }

        let windows = day_windows(since, until);
        if windows.is_empty() {
            info!(run_id = %run_id, %since, %until, "no whole-day windows in range");
            return Ok(summary);
        }

        info!(
            run_id = %run_id,
            %since,
            %until,
            windows = windows.len(),
            "analyzer run starting"
        );

        let mut baselines = self
            .baseline
            .enabled
            .then(|| BaselineCalculator::new(&self.store, self.baseline.clone()));

        for window in windows {
            let (records, alerts, skipped) = self.process_window(run_id, window, &mut baselines)?;
            self.store
                .complete_window(&self.generator, window.end, &records)?;
            summary.windows += 1;
            summary.records += records.len();
            summary.skipped_entities += skipped;
            summary.checkpoint = Some(window.end);

            // Window is committed; alerting is best-effort.
            if let Some(logger) = &self.alerts {
                for alert in &alerts {
                    if let Err(e) = logger.log_anomaly(alert) {
                        warn!(run_id = %run_id, error = %e, "alert write failed");
                    }
                }
            }

            if stop.load(Ordering::Relaxed) {
                info!(run_id = %run_id, "stop requested; finishing after committed window");
                break;
            }
        }

        info!(
            run_id = %run_id,
            windows = summary.windows,
            records = summary.records,
            skipped = summary.skipped_entities,
            "analyzer run complete"
        );
        Ok(summary)
    }

    /// Process one window across its active entities. Entity-level pipeline
    /// failures are logged and skipped; repository failures abort the run.
    fn process_window(
        &self,
        run_id: Uuid,
        window: DayWindow,
        baselines: &mut Option<BaselineCalculator<'_>>,
    ) -> Result<(Vec<RiskHistoryRecord>, Vec<AnomalyAlert>, usize), AnalyzerError> {
        let entities = self.store.entities_with_activity(&window)?;
        let mut records = Vec::new();
        let mut alerts = Vec::new();
        let mut skipped = 0usize;

        for entity_id in entities {
            let events = self.store.fetch_windowed_events(entity_id, &window)?;
            if events.is_empty() {
                continue;
            }

            let result = match self.pipeline.analyze(entity_id, window, &events) {
                Ok(result) => result,
                Err(e) => {
                    warn!(
                        run_id = %run_id,
                        entity_id,
                        window_start = %window.start,
                        error = %e,
                        "entity processing failed; skipping"
                    );
                    skipped += 1;
                    continue;
                }
            };

            let assessment = match baselines.as_mut() {
                Some(calc) => Some(calc.assess(entity_id, window.end, result.risk_score)?),
                None => None,
            };

            if let Some(a) = assessment.filter(|a| a.is_anomalous) {
                alerts.push(AnomalyAlert {
                    timestamp: Utc::now(),
                    entity_id,
                    window_end: window.end,
                    risk_score: result.risk_score,
                    baseline_avg: a.avg,
                    baseline_sigma: a.sigma,
                    delta: a.delta,
                    triggered_rules: result.rules.triggered.clone(),
                });
            }
            records.push(self.build_record(result, assessment));
        }

        Ok((records, alerts, skipped))
    }

    fn build_record(
        &self,
        result: AnalysisResult,
        baseline: Option<BaselineAssessment>,
    ) -> RiskHistoryRecord {
        RiskHistoryRecord {
            entity_id: result.entity_id,
            observed_at: result.window.end,
            risk_score: result.risk_score,
            generator: self.generator.clone(),
            reason: RiskReason {
                generator: self.generator.clone(),
                kind: REASON_KIND.to_string(),
                window_start: result.window.start,
                window_end: result.window.end,
                event_count: result.features.event_count,
                highest_severity: result.features.highest_severity,
                last_observed_at: result.features.last_observed_at,
                rules: ReasonRules {
                    triggered: result.rules.triggered,
                    metadata: result.rules.metadata,
                },
                baseline,
            },
        }
    }

    /// Daemon loop: poll at a fixed interval until the stop flag is set.
    /// The `since` override applies to the first iteration only; later runs
    /// rely on the checkpoint. Repository failures are retried next poll;
    /// configuration errors are fatal.
    pub fn run_forever(
        &self,
        interval_secs: u64,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        stop: &AtomicBool,
    ) -> Result<(), AnalyzerError> {
        let mut since = since;
        info!(interval_secs, "analyzer daemon starting");
        while !stop.load(Ordering::Relaxed) {
            match self.run(since.take(), until, stop) {
                Ok(summary) if summary.is_noop() => {}
                Ok(summary) => info!(
                    run_id = %summary.run_id,
                    windows = summary.windows,
                    records = summary.records,
                    "poll complete"
                ),
                Err(AnalyzerError::Repository(e)) => {
                    warn!(error = %e, "run failed; retrying next poll");
                }
                Err(e) => return Err(e),
            }
            for _ in 0..interval_secs {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                std::thread::sleep(Duration::from_secs(1));
            }
        }
        info!("analyzer daemon stopping");
        Ok(())
    }
}
