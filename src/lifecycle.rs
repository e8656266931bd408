// src/lifecycle.rs

use crate::health::{HealthInputs, OperationCounts};
use crate::model::{ChangeStatus, FileChangeEvent, Timestamp, SECONDS_PER_DAY};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Information about a file's lifecycle, folded from its change events
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileLifecycle {
    pub path: String,
    pub created_at: Timestamp,
    pub last_modified: Timestamp,
    /// Set when the most recent event deleted the file
    pub deleted_at: Option<Timestamp>,
    pub operations: OperationCounts,
    pub total_commits: usize,
    pub unique_authors: usize,
}

impl FileLifecycle {
    pub fn is_alive(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn health_inputs(&self, now: Timestamp) -> HealthInputs {
        HealthInputs {
            total_commits: self.total_commits,
            unique_authors: self.unique_authors,
            operations: self.operations,
            age_days: days_between(self.created_at, now),
            days_since_last_modified: days_between(self.last_modified, now),
        }
    }
}

/// Whole days from `from` to `to`, never negative.
pub fn days_between(from: Timestamp, to: Timestamp) -> i64 {
    to.saturating_sub(from).max(0) / SECONDS_PER_DAY
}

#[derive(Default)]
struct Accumulator<'a> {
    created_at: Option<Timestamp>,
    last_modified: Option<Timestamp>,
    /// The latest event deleted the path or moved it away
    removed: bool,
    operations: OperationCounts,
    commits: HashSet<&'a str>,
    authors: HashSet<&'a str>,
}

impl Accumulator<'_> {
    fn touch(&mut self, timestamp: Timestamp, removed: bool) {
        self.created_at = Some(self.created_at.map_or(timestamp, |t| t.min(timestamp)));
        if self.last_modified.map_or(true, |last| timestamp >= last) {
            self.last_modified = Some(timestamp);
            self.removed = removed;
        }
    }
}

/// One lifecycle record per path, ordered by path.
///
/// A rename closes the previous path at the rename time, and the new path
/// inherits its creation time.
pub fn summarize(events: &[FileChangeEvent]) -> Vec<FileLifecycle> {
    let mut files: BTreeMap<&str, Accumulator<'_>> = BTreeMap::new();
    let mut renames: Vec<(Timestamp, &str, &str)> = Vec::new();

    for event in events {
        let acc = files.entry(&event.path).or_default();
        acc.touch(event.timestamp, event.status == ChangeStatus::Deleted);
        match event.status {
            ChangeStatus::Modified | ChangeStatus::TypeChanged => acc.operations.modified += 1,
            ChangeStatus::Added | ChangeStatus::Copied => acc.operations.added += 1,
            ChangeStatus::Deleted => acc.operations.deleted += 1,
            ChangeStatus::Renamed => acc.operations.renamed += 1,
        }
        acc.commits.insert(&event.commit);
        acc.authors.insert(event.author_key());

        let moved_from = event.old_path.as_deref().filter(|&old| old != event.path);
        if let (ChangeStatus::Renamed, Some(old_path)) = (event.status, moved_from) {
            files.entry(old_path).or_default().touch(event.timestamp, true);
            renames.push((event.timestamp, old_path, &event.path));
        }
    }

    // Oldest first, so a chain of renames passes the creation time along.
    renames.sort_by_key(|&(timestamp, _, _)| timestamp);
    for (_, old_path, new_path) in renames {
        let inherited = files.get(old_path).and_then(|acc| acc.created_at);
        if let (Some(inherited), Some(acc)) = (inherited, files.get_mut(new_path)) {
            acc.created_at = Some(acc.created_at.map_or(inherited, |t| t.min(inherited)));
        }
    }

    files
        .into_iter()
        .map(|(path, acc)| {
            let last_modified = acc.last_modified.unwrap_or_default();
            FileLifecycle {
                path: path.to_string(),
                created_at: acc.created_at.unwrap_or(last_modified),
                last_modified,
                deleted_at: acc.removed.then_some(last_modified),
                operations: acc.operations,
                total_commits: acc.commits.len(),
                unique_authors: acc.authors.len(),
            }
        })
        .collect()
}
