// src/temporal.rs

//! Scrubber-relative view over enriched files.

use crate::health::{HealthScoreResult, DORMANT_DAYS};
use crate::lifecycle::{days_between, FileLifecycle};
use crate::model::Timestamp;
use serde::Serialize;

/// A file lifecycle together with its health score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedFile {
    #[serde(flatten)]
    pub lifecycle: FileLifecycle,
    pub health: HealthScoreResult,
    pub insight: &'static str,
}

/// Global first/last event time of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl DateRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start: start.min(end), end: start.max(end) }
    }

    /// Position of `timestamp` on a 0-100 scale, clamped to the range.
    pub fn position_of(&self, timestamp: Timestamp) -> f64 {
        let span = self.end.saturating_sub(self.start);
        if span <= 0 {
            return 0.0;
        }
        (timestamp.saturating_sub(self.start) as f64 / span as f64 * 100.0).clamp(0.0, 100.0)
    }
}

/// A point on the 0-100 timeline scale
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct ScrubberPosition(f64);

impl ScrubberPosition {
    pub const END: Self = Self(100.0);

    /// Clamps to [0, 100]; NaN maps to the start of the timeline.
    pub fn new(position: f64) -> Self {
        if position.is_nan() {
            Self(0.0)
        } else {
            Self(position.clamp(0.0, 100.0))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalFileView<'a> {
    pub file: &'a EnrichedFile,
    pub created_position: f64,
    /// Days since last modification, measured against the wall clock
    pub dormancy_days: i64,
    pub is_dormant: bool,
    pub is_visible: bool,
}

/// Derives scrubber-relative fields for every file.
///
/// Dormancy is measured against `now`, not against the scrubbed time, so it
/// always tells how stale a file is today.
pub fn enrich<'a>(
    files: &'a [EnrichedFile],
    range: DateRange,
    scrubber: ScrubberPosition,
    now: Timestamp,
) -> Vec<TemporalFileView<'a>> {
    files
        .iter()
        .map(|file| {
            let created_position = range.position_of(file.lifecycle.created_at);
            let dormancy_days = days_between(file.lifecycle.last_modified, now);
            TemporalFileView {
                file,
                created_position,
                dormancy_days,
                is_dormant: dormancy_days > DORMANT_DAYS,
                is_visible: created_position <= scrubber.value(),
            }
        })
        .collect()
}
