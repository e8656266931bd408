// src/activity.rs

//! Directory x time-bin activity matrix.
//!
//! Accepts either raw file-change events or a pre-bucketed activity feed,
//! keeps the busiest directories, and produces a dense grid in which every
//! (directory, bin) pair has a cell.

use crate::cancel::CancelToken;
use crate::error::{Result, StrataError};
use crate::model::{ChangeStatus, FileChangeEvent, Timestamp};
use crate::time_bin::{self, Granularity};
use crate::tree::{DirectoryTree, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

pub const DEFAULT_TOP_DIRECTORIES: usize = 20;
pub const DEFAULT_TOP_N: usize = 5;

/// Cell value used for intensity scaling
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActivityMetric {
    #[default]
    Events,
    Commits,
    Authors,
}

/// One row of a pre-aggregated activity feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub date: String,
    pub directory_id: NodeId,
    #[serde(default)]
    pub added: usize,
    #[serde(default)]
    pub modified: usize,
    #[serde(default)]
    pub deleted: usize,
    #[serde(default)]
    pub unique_authors: usize,
    #[serde(default)]
    pub commits: usize,
    #[serde(default)]
    pub top_contributors: Vec<String>,
    #[serde(default)]
    pub top_files: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum ActivitySource<'a> {
    Events(&'a [FileChangeEvent]),
    Matrix(&'a [ActivityRecord]),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateOptions {
    pub granularity: Granularity,
    pub metric: ActivityMetric,
    /// Maximum number of directories (rows) in the grid
    pub top_directories: usize,
    /// Maximum number of contributors and files kept per cell
    pub top_n: usize,
    /// Use every bin between the first and last observation instead of only
    /// the observed ones
    pub fill_gaps: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            granularity: Granularity::default(),
            metric: ActivityMetric::default(),
            top_directories: DEFAULT_TOP_DIRECTORIES,
            top_n: DEFAULT_TOP_N,
            fill_gaps: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityCell {
    pub directory_id: NodeId,
    pub bin_start: Timestamp,
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    pub commits: usize,
    /// High-water mark of distinct authors seen in this bin
    pub unique_authors: usize,
    pub top_contributors: Vec<String>,
    pub top_files: Vec<String>,
}

impl ActivityCell {
    pub fn empty(directory_id: NodeId, bin_start: Timestamp) -> Self {
        Self {
            directory_id,
            bin_start,
            added: 0,
            modified: 0,
            deleted: 0,
            commits: 0,
            unique_authors: 0,
            top_contributors: Vec::new(),
            top_files: Vec::new(),
        }
    }

    pub fn events(&self) -> usize {
        self.added + self.modified + self.deleted
    }

    pub fn value(&self, metric: ActivityMetric) -> usize {
        match metric {
            ActivityMetric::Events => self.events(),
            ActivityMetric::Commits => self.commits,
            ActivityMetric::Authors => self.unique_authors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridDirectory {
    pub id: NodeId,
    pub path: String,
    /// Total events attributed to the directory across all bins
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeBin {
    pub start: Timestamp,
    pub label: String,
}

/// Records dropped during aggregation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregationWarnings {
    pub invalid_timestamps: usize,
    pub missing_directory_mappings: usize,
}

impl AggregationWarnings {
    pub fn total(&self) -> usize {
        self.invalid_timestamps + self.missing_directory_mappings
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityGrid {
    pub directories: Vec<GridDirectory>,
    pub bins: Vec<TimeBin>,
    /// `cells[i][j]` is the cell of `directories[i]` in `bins[j]`
    pub cells: Vec<Vec<ActivityCell>>,
    pub metric: ActivityMetric,
    pub max_value: usize,
    pub warnings: AggregationWarnings,
}

impl ActivityGrid {
    pub fn cell(&self, row: usize, column: usize) -> Option<&ActivityCell> {
        self.cells.get(row).and_then(|r| r.get(column))
    }

    pub fn row_of(&self, directory_id: NodeId) -> Option<usize> {
        self.directories.iter().position(|d| d.id == directory_id)
    }
}

#[derive(Debug, Clone, Copy)]
enum Contribution<'a> {
    Event(&'a FileChangeEvent),
    Record(&'a ActivityRecord),
}

impl Contribution<'_> {
    fn weight(&self) -> usize {
        match self {
            Contribution::Event(_) => 1,
            Contribution::Record(r) => r.added + r.modified + r.deleted,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Resolved<'a> {
    directory: NodeId,
    bin: Timestamp,
    contribution: Contribution<'a>,
}

#[derive(Default)]
struct CellAccumulator<'a> {
    added: usize,
    modified: usize,
    deleted: usize,
    commits: usize,
    max_authors: usize,
    commit_set: HashSet<&'a str>,
    author_set: HashSet<&'a str>,
    /// Keyed like `author_set`; the value carries the display name
    contributors: HashMap<&'a str, (&'a str, usize)>,
    files: HashMap<&'a str, usize>,
}

impl<'a> CellAccumulator<'a> {
    fn fold(&mut self, contribution: Contribution<'a>) {
        match contribution {
            Contribution::Event(event) => {
                match event.status {
                    ChangeStatus::Added | ChangeStatus::Copied => self.added += 1,
                    ChangeStatus::Modified | ChangeStatus::Renamed | ChangeStatus::TypeChanged => {
                        self.modified += 1
                    }
                    ChangeStatus::Deleted => self.deleted += 1,
                }
                self.commit_set.insert(&event.commit);
                self.author_set.insert(event.author_key());
                self.contributors.entry(event.author_key()).or_insert((event.author_name.as_str(), 0)).1 += 1;
                *self.files.entry(&event.path).or_default() += 1;
            }
            Contribution::Record(record) => {
                self.added += record.added;
                self.modified += record.modified;
                self.deleted += record.deleted;
                self.commits += record.commits;
                // Author counts are already distinct per record and cannot be
                // summed across records, so the cell keeps the largest one.
                self.max_authors = self.max_authors.max(record.unique_authors);
                for name in &record.top_contributors {
                    self.contributors.entry(name).or_insert((name.as_str(), 0)).1 += 1;
                }
                for file in &record.top_files {
                    *self.files.entry(file).or_default() += 1;
                }
            }
        }
    }

    fn finish(self, directory_id: NodeId, bin_start: Timestamp, top_n: usize) -> ActivityCell {
        ActivityCell {
            directory_id,
            bin_start,
            added: self.added,
            modified: self.modified,
            deleted: self.deleted,
            commits: self.commits + self.commit_set.len(),
            unique_authors: self.max_authors.max(self.author_set.len()),
            top_contributors: top_entries(self.contributors.into_values(), top_n),
            top_files: top_entries(self.files, top_n),
        }
    }
}

/// Highest counts first, names ascending on ties.
fn top_entries<'a>(counts: impl IntoIterator<Item = (&'a str, usize)>, n: usize) -> Vec<String> {
    let mut entries: Vec<(&str, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries.into_iter().take(n).map(|(name, _)| name.to_string()).collect()
}

/// Builds the dense activity grid.
pub fn aggregate(
    source: ActivitySource<'_>,
    tree: &DirectoryTree,
    options: &AggregateOptions,
    cancel: &CancelToken,
) -> Result<ActivityGrid> {
    let mut warnings = AggregationWarnings::default();
    let resolved = resolve(source, tree, options.granularity, cancel, &mut warnings)?;

    // Rank directories by total activity.
    let mut totals: HashMap<NodeId, usize> = HashMap::new();
    for item in &resolved {
        *totals.entry(item.directory).or_default() += item.contribution.weight();
    }
    let mut ranked: Vec<GridDirectory> = totals
        .into_iter()
        .filter_map(|(id, total)| {
            tree.node(id).map(|node| GridDirectory { id, path: node.path.clone(), total })
        })
        .collect();
    ranked.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.path.cmp(&b.path)));
    ranked.truncate(options.top_directories);
    let rows: HashMap<NodeId, usize> = ranked.iter().enumerate().map(|(row, d)| (d.id, row)).collect();

    let mut accumulators: HashMap<(NodeId, Timestamp), CellAccumulator<'_>> = HashMap::new();
    let mut observed: BTreeSet<Timestamp> = BTreeSet::new();
    for (i, item) in resolved.iter().enumerate() {
        cancel.check_every(i)?;
        if !rows.contains_key(&item.directory) {
            continue;
        }
        observed.insert(item.bin);
        accumulators.entry((item.directory, item.bin)).or_default().fold(item.contribution);
    }

    let bin_starts: Vec<Timestamp> = match (observed.first().copied(), observed.last().copied()) {
        (Some(first), Some(last)) if options.fill_gaps => {
            time_bin::enumerate_bins(first, last, options.granularity)?
        }
        _ => observed.into_iter().collect(),
    };
    let bins = bin_starts
        .iter()
        .map(|&start| time_bin::label(start, options.granularity).map(|label| TimeBin { start, label }))
        .collect::<Result<Vec<_>>>()?;

    cancel.check()?;
    let mut cells: Vec<Vec<ActivityCell>> = ranked
        .iter()
        .map(|d| bin_starts.iter().map(|&bin| ActivityCell::empty(d.id, bin)).collect())
        .collect();
    let columns: HashMap<Timestamp, usize> = bin_starts.iter().enumerate().map(|(j, &b)| (b, j)).collect();
    for ((directory, bin), accumulator) in accumulators {
        if let (Some(&row), Some(&column)) = (rows.get(&directory), columns.get(&bin)) {
            cells[row][column] = accumulator.finish(directory, bin, options.top_n);
        }
    }

    let max_value = cells
        .iter()
        .flatten()
        .map(|cell| cell.value(options.metric))
        .max()
        .unwrap_or(0);

    if warnings.total() > 0 {
        warn!(
            invalid_timestamps = warnings.invalid_timestamps,
            missing_directory_mappings = warnings.missing_directory_mappings,
            "dropped activity records"
        );
    }
    debug!(
        directories = ranked.len(),
        bins = bins.len(),
        max_value,
        "activity grid aggregated"
    );

    Ok(ActivityGrid {
        directories: ranked,
        bins,
        cells,
        metric: options.metric,
        max_value,
        warnings,
    })
}

/// Maps every input row to its directory and bin, dropping (and counting)
/// rows that cannot be placed.
fn resolve<'a>(
    source: ActivitySource<'a>,
    tree: &DirectoryTree,
    granularity: Granularity,
    cancel: &CancelToken,
    warnings: &mut AggregationWarnings,
) -> Result<Vec<Resolved<'a>>> {
    let mut resolved = Vec::new();
    let mut place = |i: usize,
                     directory: Option<NodeId>,
                     timestamp: Result<Timestamp>,
                     contribution: Contribution<'a>|
     -> Result<()> {
        cancel.check_every(i)?;
        let Some(directory) = directory else {
            warnings.missing_directory_mappings += 1;
            return Ok(());
        };
        match timestamp.and_then(|ts| time_bin::bin_start(ts, granularity)) {
            Ok(bin) => resolved.push(Resolved { directory, bin, contribution }),
            Err(StrataError::InvalidTimestamp(value)) => {
                debug!(value = %value, "skipping record with invalid timestamp");
                warnings.invalid_timestamps += 1;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    };

    match source {
        ActivitySource::Events(events) => {
            for (i, event) in events.iter().enumerate() {
                place(i, tree.directory_of(&event.path), Ok(event.timestamp), Contribution::Event(event))?;
            }
        }
        ActivitySource::Matrix(records) => {
            for (i, record) in records.iter().enumerate() {
                let directory = tree
                    .node(record.directory_id)
                    .filter(|node| node.is_dir())
                    .map(|node| node.id);
                if directory.is_none() {
                    debug!(error = %StrataError::MissingDirectoryMapping(record.directory_id), "skipping record");
                }
                place(i, directory, time_bin::parse_date(&record.date), Contribution::Record(record))?;
            }
        }
    }
    Ok(resolved)
}
