//! Daily aggregate feature extraction from raw events.

use std::collections::BTreeSet;

use super::{FeatureExtractor, FeatureSummary};
use crate::error::ProcessingError;
use crate::storage::EventRecord;
use crate::window::DayWindow;

/// Severity is a bounded 0-10 integer; out-of-range inputs are clamped.
pub const MAX_SEVERITY: i64 = 10;

/// Aggregates one entity's events for one window into count, max severity,
/// distinct types, and latest observation time.
pub struct DailyFeatureExtractor;

impl FeatureExtractor for DailyFeatureExtractor {
    fn extract(
        &self,
        window: &DayWindow,
        events: &[EventRecord],
    ) -> Result<FeatureSummary, ProcessingError> {
        let mut highest_severity = 0i64;
        let mut event_types = BTreeSet::new();
        let mut last_observed_at = None;

        for event in events {
            let severity = event.severity.clamp(0, MAX_SEVERITY);
            highest_severity = highest_severity.max(severity);
            event_types.insert(event.event_type.clone());
            last_observed_at = match last_observed_at {
                Some(seen) if seen >= event.observed_at => Some(seen),
                _ => Some(event.observed_at),
            };
        }

        Ok(FeatureSummary {
            event_count: events.len() as u64,
            highest_severity,
            event_types,
            window_start: window.start,
            window_end: window.end,
            last_observed_at,
        })
    }
}
