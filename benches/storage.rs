//! Storage benchmark: windowed event reads and per-window persistence.

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::BTreeMap;
use tempfile::tempdir;
use ueba_analyzer::storage::{AnalyzerStore, ReasonRules, RiskHistoryRecord, RiskReason};
use ueba_analyzer::window::DayWindow;

fn seeded_store(events_per_day: usize) -> (tempfile::TempDir, AnalyzerStore, DayWindow, i64) {
    let dir = tempdir().unwrap();
    let store = AnalyzerStore::open(&dir.path().join("bench.db")).unwrap();
    let entity = store.insert_entity("host", "bench-1").unwrap();
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let window = DayWindow::containing(start);
    for i in 0..events_per_day {
        store
            .insert_event(
                entity,
                "bench_event",
                (i % 11) as i64,
                start + Duration::seconds(i as i64),
            )
            .unwrap();
    }
    (dir, store, window, entity)
}

fn bench_fetch_windowed_events(c: &mut Criterion) {
    let (_dir, store, window, entity) = seeded_store(1_000);

    c.bench_function("storage_fetch_windowed_1k_events", |b| {
        b.iter(|| black_box(store.fetch_windowed_events(entity, &window)).unwrap())
    });
}

fn bench_complete_window(c: &mut Criterion) {
    let (_dir, store, window, entity) = seeded_store(0);
    let record = RiskHistoryRecord {
        entity_id: entity,
        observed_at: window.end,
        risk_score: 0.42,
        generator: "analyzer_service".to_string(),
        reason: RiskReason {
            generator: "analyzer_service".to_string(),
            kind: "daily_rollup".to_string(),
            window_start: window.start,
            window_end: window.end,
            event_count: 12,
            highest_severity: 9,
            last_observed_at: Some(window.start),
            rules: ReasonRules {
                triggered: vec!["high_event_volume".to_string()],
                metadata: BTreeMap::new(),
            },
            baseline: None,
        },
    };

    c.bench_function("storage_complete_window_one_record", |b| {
        b.iter(|| {
            black_box(
                store.complete_window("analyzer_service", window.end, std::slice::from_ref(&record)),
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, bench_fetch_windowed_events, bench_complete_window);
criterion_main!(benches);
