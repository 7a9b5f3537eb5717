//! Analyzer repository over SQLite: windowed event reads, idempotent risk
//! history writes, and transactional per-window checkpoints.
//!
//! Timestamps are stored as i64 epoch milliseconds. Uniqueness on
//! (entity_id, observed_at, generator) makes window reprocessing an update,
//! never a duplicate row.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use super::{EntityRecord, EventRecord, RiskHistoryRecord, RiskReason};
use crate::baseline::BaselineStats;
use crate::error::RepositoryError;
use crate::window::DayWindow;

fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, RepositoryError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or(RepositoryError::TimestampRange(ms))
}

pub struct AnalyzerStore {
    conn: Mutex<Connection>,
}

impl AnalyzerStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self, RepositoryError> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, RepositoryError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), RepositoryError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS entities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entity_type TEXT NOT NULL,
                entity_value TEXT NOT NULL,
                deleted_at INTEGER,
                UNIQUE(entity_type, entity_value)
            );
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entity_id INTEGER NOT NULL REFERENCES entities(id),
                event_type TEXT NOT NULL,
                severity INTEGER NOT NULL DEFAULT 0,
                observed_at INTEGER NOT NULL,
                deleted_at INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_events_entity_observed
                ON events(entity_id, observed_at);
            CREATE TABLE IF NOT EXISTS risk_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entity_id INTEGER NOT NULL REFERENCES entities(id),
                generator TEXT NOT NULL,
                risk_score REAL NOT NULL,
                observed_at INTEGER NOT NULL,
                reason TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                deleted_at INTEGER,
                UNIQUE(entity_id, observed_at, generator)
            );
            CREATE INDEX IF NOT EXISTS idx_risk_history_entity_observed
                ON risk_history(entity_id, observed_at);
            CREATE TABLE IF NOT EXISTS checkpoints (
                generator TEXT PRIMARY KEY,
                window_end INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Ingestion-side helpers (owned by the upstream subsystem; used in tests)
    // ------------------------------------------------------------------

    pub fn insert_entity(
        &self,
        entity_type: &str,
        entity_value: &str,
    ) -> Result<i64, RepositoryError> {
        let conn = self.conn.lock().expect("lock");
        conn.execute(
            "INSERT INTO entities (entity_type, entity_value) VALUES (?1, ?2)",
            params![entity_type, entity_value],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_event(
        &self,
        entity_id: i64,
        event_type: &str,
        severity: i64,
        observed_at: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let conn = self.conn.lock().expect("lock");
        conn.execute(
            "INSERT INTO events (entity_id, event_type, severity, observed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![entity_id, event_type, severity, to_millis(observed_at)],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn fetch_entity(&self, entity_id: i64) -> Result<Option<EntityRecord>, RepositoryError> {
        let conn = self.conn.lock().expect("lock");
        let entity = conn
            .query_row(
                "SELECT id, entity_type, entity_value FROM entities
                 WHERE id = ?1 AND deleted_at IS NULL",
                params![entity_id],
                |row| {
                    Ok(EntityRecord {
                        id: row.get(0)?,
                        entity_type: row.get(1)?,
                        entity_value: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(entity)
    }

    pub fn soft_delete_event(&self, event_id: i64) -> Result<(), RepositoryError> {
        let conn = self.conn.lock().expect("lock");
        conn.execute(
            "UPDATE events SET deleted_at = ?1 WHERE id = ?2",
            params![to_millis(Utc::now()), event_id],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Windowed event queries
    // ------------------------------------------------------------------

    /// Entities with at least one live event in the window, ascending by id.
    pub fn entities_with_activity(&self, window: &DayWindow) -> Result<Vec<i64>, RepositoryError> {
        let conn = self.conn.lock().expect("lock");
        let mut stmt = conn.prepare(
            "SELECT DISTINCT entity_id FROM events
             WHERE observed_at >= ?1 AND observed_at < ?2 AND deleted_at IS NULL
             ORDER BY entity_id",
        )?;
        let ids = stmt
            .query_map(params![to_millis(window.start), to_millis(window.end)], |row| {
                row.get::<_, i64>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Live events for one entity in [start, end), ordered by observation time.
    pub fn fetch_windowed_events(
        &self,
        entity_id: i64,
        window: &DayWindow,
    ) -> Result<Vec<EventRecord>, RepositoryError> {
        let conn = self.conn.lock().expect("lock");
        let mut stmt = conn.prepare(
            "SELECT id, entity_id, event_type, severity, observed_at FROM events
             WHERE entity_id = ?1 AND observed_at >= ?2 AND observed_at < ?3
               AND deleted_at IS NULL
             ORDER BY observed_at, id",
        )?;
        let rows = stmt.query_map(
            params![entity_id, to_millis(window.start), to_millis(window.end)],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )?;
        let mut events = Vec::new();
        for row in rows {
            let (id, entity_id, event_type, severity, observed_ms) = row?;
            events.push(EventRecord {
                id,
                entity_id,
                event_type,
                severity,
                observed_at: from_millis(observed_ms)?,
            });
        }
        Ok(events)
    }

    // ------------------------------------------------------------------
    // Checkpoints
    // ------------------------------------------------------------------

    /// Latest fully-processed window end for this generator. Reads the
    /// explicit checkpoint row; databases written before the checkpoint table
    /// existed fall back to the max observed_at of this generator's live
    /// history rows.
    pub fn latest_checkpoint(
        &self,
        generator: &str,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        let conn = self.conn.lock().expect("lock");
        let explicit: Option<i64> = conn
            .query_row(
                "SELECT window_end FROM checkpoints WHERE generator = ?1",
                params![generator],
                |row| row.get(0),
            )
            .optional()?;
        let ms = match explicit {
            Some(ms) => Some(ms),
            None => conn.query_row(
                "SELECT MAX(observed_at) FROM risk_history
                 WHERE generator = ?1 AND deleted_at IS NULL",
                params![generator],
                |row| row.get::<_, Option<i64>>(0),
            )?,
        };
        ms.map(from_millis).transpose()
    }

    /// Persist a window's records and advance the checkpoint in one
    /// transaction. Records upsert on (entity_id, observed_at, generator);
    /// the checkpoint never moves backward. An empty record set still
    /// advances the checkpoint, so zero-activity windows are covered once.
    pub fn complete_window(
        &self,
        generator: &str,
        window_end: DateTime<Utc>,
        records: &[RiskHistoryRecord],
    ) -> Result<usize, RepositoryError> {
        let mut conn = self.conn.lock().expect("lock");
        let tx = conn.transaction()?;
        let now = to_millis(Utc::now());
        for record in records {
            let reason = serde_json::to_string(&record.reason)?;
            tx.execute(
                "INSERT INTO risk_history
                     (entity_id, generator, risk_score, observed_at, reason,
                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(entity_id, observed_at, generator) DO UPDATE SET
                     risk_score = excluded.risk_score,
                     reason = excluded.reason,
                     updated_at = excluded.updated_at",
                params![
                    record.entity_id,
                    record.generator,
                    record.risk_score,
                    to_millis(record.observed_at),
                    reason,
                    now,
                ],
            )?;
        }
        tx.execute(
            "INSERT INTO checkpoints (generator, window_end, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(generator) DO UPDATE SET
                 window_end = MAX(window_end, excluded.window_end),
                 updated_at = excluded.updated_at",
            params![generator, to_millis(window_end), now],
        )?;
        tx.commit()?;
        Ok(records.len())
    }

    // ------------------------------------------------------------------
    // Risk history reads
    // ------------------------------------------------------------------

    /// Live history for one entity, ascending by observed_at.
    pub fn history_for_entity(
        &self,
        entity_id: i64,
    ) -> Result<Vec<RiskHistoryRecord>, RepositoryError> {
        let conn = self.conn.lock().expect("lock");
        let mut stmt = conn.prepare(
            "SELECT entity_id, observed_at, risk_score, generator, reason
             FROM risk_history
             WHERE entity_id = ?1 AND deleted_at IS NULL
             ORDER BY observed_at, id",
        )?;
        let rows = stmt.query_map(params![entity_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut records = Vec::new();
        for row in rows {
            let (entity_id, observed_ms, risk_score, generator, reason) = row?;
            let reason: RiskReason = serde_json::from_str(&reason)?;
            records.push(RiskHistoryRecord {
                entity_id,
                observed_at: from_millis(observed_ms)?,
                risk_score,
                generator,
                reason,
            });
        }
        Ok(records)
    }

    pub fn latest_history_for_entity(
        &self,
        entity_id: i64,
    ) -> Result<Option<RiskHistoryRecord>, RepositoryError> {
        Ok(self.history_for_entity(entity_id)?.pop())
    }

    // ------------------------------------------------------------------
    // Baseline aggregates
    // ------------------------------------------------------------------

    /// Mean and population stddev of live risk scores for one entity over the
    /// trailing `window_days` before `until`. Pushed to SQL; sigma is derived
    /// from E[x^2] - E[x]^2 since SQLite has no stddev builtin.
    pub fn baseline_stats(
        &self,
        entity_id: i64,
        until: DateTime<Utc>,
        window_days: i64,
    ) -> Result<BaselineStats, RepositoryError> {
        let since = until - Duration::days(window_days);
        let conn = self.conn.lock().expect("lock");
        let (avg, mean_sq): (Option<f64>, Option<f64>) = conn.query_row(
            "SELECT AVG(risk_score), AVG(risk_score * risk_score)
             FROM risk_history
             WHERE entity_id = ?1 AND deleted_at IS NULL
               AND observed_at >= ?2 AND observed_at < ?3",
            params![entity_id, to_millis(since), to_millis(until)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let avg = avg.unwrap_or(0.0);
        let variance = (mean_sq.unwrap_or(0.0) - avg * avg).max(0.0);
        Ok(BaselineStats {
            avg,
            sigma: variance.sqrt(),
        })
    }
}
