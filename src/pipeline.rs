// src/pipeline.rs

//! Runs every stage for one dataset snapshot.
//!
//! ```text
//! events ──> tree ──> activity grid
//!    │
//!    ├────> coupling edges ──> coupling index
//!    │
//!    └────> lifecycles ──> health scores ──> (temporal views on demand)
//! ```
//!
//! [`PipelineRunner`] runs each submission on its own worker thread and
//! cancels the previous one, so only the latest request produces output.

use crate::activity::{self, ActivityGrid, ActivityRecord, ActivitySource};
use crate::cancel::CancelToken;
use crate::config::PipelineConfig;
use crate::coupling::{self, CouplingIndex};
use crate::error::{Result, StrataError};
use crate::health;
use crate::lifecycle;
use crate::model::{CouplingEdge, FileChangeEvent, Timestamp};
use crate::temporal::{self, DateRange, EnrichedFile, ScrubberPosition, TemporalFileView};
use crate::time_bin;
use crate::tree::{self, DirectoryTree};
use chrono::Utc;
use rayon::prelude::*;
use serde::Serialize;
use std::borrow::Cow;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info, warn};

/// A consistent snapshot of the datasets one run consumes
#[derive(Debug, Clone, Default)]
pub struct PipelineInput {
    pub events: Vec<FileChangeEvent>,
    /// Pre-bucketed activity feed; replaces the events as aggregator input
    pub activity_matrix: Option<Vec<ActivityRecord>>,
    /// Pre-computed co-change edges; derived from the events when absent
    pub coupling_edges: Option<Vec<CouplingEdge>>,
}

impl PipelineInput {
    pub fn from_events(events: Vec<FileChangeEvent>) -> Self {
        Self { events, ..Self::default() }
    }

    /// First and last valid event time.
    pub fn date_range(&self) -> Option<DateRange> {
        let valid = || self.events.iter().map(|e| e.timestamp).filter(|&ts| time_bin::is_valid(ts));
        Some(DateRange::new(valid().min()?, valid().max()?))
    }
}

/// Events whose timestamps map onto a calendar date, and how many were dropped.
fn valid_events(events: &[FileChangeEvent]) -> (Cow<'_, [FileChangeEvent]>, usize) {
    let invalid = events.iter().filter(|e| !time_bin::is_valid(e.timestamp)).count();
    if invalid == 0 {
        return (Cow::Borrowed(events), 0);
    }
    for event in events.iter().filter(|e| !time_bin::is_valid(e.timestamp)) {
        debug!(path = %event.path, timestamp = event.timestamp, "skipping event with invalid timestamp");
    }
    warn!(invalid, "dropped events with invalid timestamps");
    let valid = events.iter().filter(|e| time_bin::is_valid(e.timestamp)).cloned().collect();
    (Cow::Owned(valid), invalid)
}

#[derive(Debug, Serialize)]
pub struct PipelineOutput {
    pub tree: DirectoryTree,
    pub activity: ActivityGrid,
    pub coupling: CouplingIndex,
    pub files: Vec<EnrichedFile>,
    pub date_range: DateRange,
    /// Input events dropped before any stage ran
    pub invalid_events: usize,
    /// Wall-clock time the run was computed at; used as "now" for dormancy
    pub generated_at: Timestamp,
}

impl PipelineOutput {
    pub fn temporal_view(&self, scrubber: ScrubberPosition) -> Vec<TemporalFileView<'_>> {
        temporal::enrich(&self.files, self.date_range, scrubber, self.generated_at)
    }

    /// Number of records dropped or flagged across all stages
    pub fn warning_count(&self) -> usize {
        self.invalid_events
            + self.activity.warnings.total()
            + self.coupling.dropped_edges
            + self.tree.ambiguities.len()
    }
}

/// Executes all stages over `input`.
pub fn run(
    input: &PipelineInput,
    config: &PipelineConfig,
    cancel: &CancelToken,
    now: Timestamp,
) -> Result<PipelineOutput> {
    let started = Instant::now();
    let (events, invalid_events) = valid_events(&input.events);

    let tree = tree::build_tree(&events);
    cancel.check()?;

    let source = match &input.activity_matrix {
        Some(records) => ActivitySource::Matrix(records),
        None => ActivitySource::Events(&events),
    };
    let activity = activity::aggregate(source, &tree, &config.aggregate_options(), cancel)?;

    let derived;
    let edges = match &input.coupling_edges {
        Some(edges) => edges.as_slice(),
        None => {
            derived = coupling::derive_edges(&events, &config.edge_options(), cancel)?;
            derived.as_slice()
        }
    };
    let coupling = coupling::build_index(edges, cancel)?;

    cancel.check()?;
    let files: Vec<EnrichedFile> = lifecycle::summarize(&events)
        .into_par_iter()
        .map(|lifecycle| {
            let health = health::score(&lifecycle.health_inputs(now));
            EnrichedFile { lifecycle, health, insight: health::insight(&health) }
        })
        .collect();
    cancel.check()?;

    let date_range = input.date_range().unwrap_or_else(|| DateRange::new(now, now));
    debug!(files = files.len(), edges = edges.len(), "pipeline stages complete");
    info!(elapsed = ?started.elapsed(), nodes = tree.len(), "pipeline finished");

    Ok(PipelineOutput { tree, activity, coupling, files, date_range, invalid_events, generated_at: now })
}

/// Handle to a submitted run
pub struct PipelineHandle {
    token: CancelToken,
    worker: JoinHandle<Result<PipelineOutput>>,
}

impl PipelineHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits for the worker. A run that was cancelled or superseded yields
    /// `Aborted` even if it managed to finish.
    pub fn join(self) -> Result<PipelineOutput> {
        let result = self.worker.join().map_err(|_| StrataError::WorkerPanicked)?;
        self.token.check()?;
        result
    }
}

/// Last-request-wins executor for pipeline runs
pub struct PipelineRunner {
    config: Arc<PipelineConfig>,
    current: Mutex<Option<CancelToken>>,
}

impl PipelineRunner {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config: Arc::new(config), current: Mutex::new(None) }
    }

    /// Starts a run on a worker thread, cancelling the one still in flight.
    pub fn submit(&self, input: Arc<PipelineInput>) -> PipelineHandle {
        let token = CancelToken::new();
        let previous = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(token.clone());
        if let Some(previous) = previous {
            debug!("cancelling superseded pipeline run");
            previous.cancel();
        }

        let config = Arc::clone(&self.config);
        let worker_token = token.clone();
        let worker = thread::spawn(move || run(&input, &config, &worker_token, Utc::now().timestamp()));
        PipelineHandle { token, worker }
    }

    /// Cancels the run in flight, if any.
    pub fn cancel(&self) {
        if let Some(token) = self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take() {
            token.cancel();
        }
    }
}
