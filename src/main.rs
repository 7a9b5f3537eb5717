//! Analyzer entrypoint: one-shot (cron-compatible) or daemon loop with a
//! configurable poll interval. Exit status 0 on a clean run including no-op;
//! non-zero on configuration or repository failure.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use ueba_analyzer::{
    config::AnalyzerConfig, error::ConfigError, logging::StructuredLogger, service::AnalyzerService,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Single run, then exit
    Once,
    /// Continuous loop at --interval
    Daemon,
}

/// Accepts RFC 3339 (`2024-01-01T00:00:00Z`) or a bare date (`2024-01-01`,
/// meaning UTC midnight).
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ConfigError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = value.parse::<NaiveDate>() {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(ConfigError::InvalidTimestamp {
        input: value.to_string(),
    })
}

#[derive(Parser, Debug)]
#[command(
    name = "ueba-analyzer",
    about = "Process normalized security events into per-entity daily risk scores"
)]
struct Cli {
    /// Run mode
    #[arg(long, value_enum, default_value = "once")]
    mode: Mode,

    /// Start time; defaults to the last checkpoint
    #[arg(long, value_parser = parse_timestamp)]
    since: Option<DateTime<Utc>>,

    /// End time (exclusive); defaults to the start of the current UTC day
    #[arg(long, value_parser = parse_timestamp)]
    until: Option<DateTime<Utc>>,

    /// Polling interval in seconds (daemon mode)
    #[arg(long, default_value_t = 300)]
    interval: u64,

    /// Database path override
    #[arg(long)]
    database: Option<PathBuf>,

    /// Config file (JSON); falls back to defaults when absent
    #[arg(long, env = "UEBA_ANALYZER_CONFIG", default_value = "analyzer.json")]
    config: PathBuf,

    /// Log level override
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let mut config = AnalyzerConfig::load(&cli.config)?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }

    StructuredLogger::init(config.log.json, &config.log.level);
    info!(database = ?config.database_path, generator = %config.generator, "analyzer starting");

    let service = AnalyzerService::from_config(&config)?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        let _ = ctrlc::set_handler(move || {
            stop.store(true, Ordering::Relaxed);
        });
    }

    match cli.mode {
        Mode::Once => {
            let summary = service.run(cli.since, cli.until, &stop)?;
            info!(
                windows = summary.windows,
                records = summary.records,
                skipped = summary.skipped_entities,
                "analyzer run finished"
            );
        }
        Mode::Daemon => {
            info!(interval = cli.interval, "daemon mode (Ctrl+C to stop)");
            service.run_forever(cli.interval, cli.since, cli.until, &stop)?;
        }
    }

    Ok(())
}
