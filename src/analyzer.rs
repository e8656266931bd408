// src/analyzer.rs

use crate::error::Result;
use crate::model::*;
use git2::{Commit, DiffOptions, Repository};
use indicatif::ProgressBar;
use std::path::Path;
use tracing::{debug, info};

/// Walks the history reachable from HEAD and flattens it into one event per
/// (file, commit) pair, oldest commit first.
pub fn analyze(repo_path: &Path, progress: bool) -> Result<RepositoryHistory> {
    let repo = Repository::open(repo_path)?;
    info!(repo = %repo_path.display(), "analyzing repository");

    // 1. Collect all commits and sort them chronologically
    let mut commits = Vec::new();
    let mut revwalk = repo.revwalk()?;
    revwalk.push_head()?;
    revwalk.set_sorting(git2::Sort::TIME | git2::Sort::REVERSE)?;
    for oid in revwalk {
        commits.push(oid?);
    }

    let bar = if progress { ProgressBar::new(commits.len() as u64) } else { ProgressBar::hidden() };
    bar.set_message("Analyzing commits");

    let mut history = RepositoryHistory::default();
    let mut diff_opts = DiffOptions::new();
    diff_opts.include_untracked(false);
    diff_opts.ignore_filemode(true);

    // 2. Diff every commit against its first parent
    for oid in &commits {
        let commit = repo.find_commit(*oid)?;
        let before = history.events.len();
        collect_events(&repo, &commit, &mut diff_opts, &mut history.events)?;

        let timestamp = commit.time().seconds();
        if history.commits_analyzed == 0 {
            history.start_time = timestamp;
        }
        history.start_time = history.start_time.min(timestamp);
        history.end_time = history.end_time.max(timestamp);
        history.commits_analyzed += 1;
        debug!(commit = %oid, events = history.events.len() - before, "processed commit");

        bar.inc(1);
    }
    bar.finish_with_message("Analysis complete");

    Ok(history)
}

fn collect_events(
    repo: &Repository,
    commit: &Commit,
    diff_opts: &mut DiffOptions,
    events: &mut Vec<FileChangeEvent>,
) -> Result<()> {
    let parent_tree = match commit.parents().next() {
        Some(parent) => Some(parent.tree()?),
        None => None,
    };
    let current_tree = commit.tree()?;

    let mut diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&current_tree), Some(diff_opts))?;
    diff.find_similar(None)?;

    let author = commit.author();
    let author_name = author.name().unwrap_or("Unknown").to_string();
    let author_email = author.email().unwrap_or_default().to_string();
    let subject = commit.summary().unwrap_or_default().to_string();
    let hash = commit.id().to_string();
    let timestamp = commit.time().seconds();

    for delta in diff.deltas() {
        let Some(status) = ChangeStatus::from_delta(delta.status()) else {
            continue;
        };
        // Deleted files only carry their old path.
        let file = if status == ChangeStatus::Deleted { delta.old_file() } else { delta.new_file() };
        let Some(path) = file.path().and_then(|p| p.to_str()) else {
            continue;
        };
        // Renames keep the previous path so the file's identity carries over.
        let old_path = match status {
            ChangeStatus::Renamed => {
                delta.old_file().path().and_then(|p| p.to_str()).map(|p| p.replace('\\', "/"))
            }
            _ => None,
        };
        events.push(FileChangeEvent {
            path: path.replace('\\', "/"),
            old_path,
            status,
            commit: hash.clone(),
            timestamp,
            author_name: author_name.clone(),
            author_email: author_email.clone(),
            subject: subject.clone(),
        });
    }
    Ok(())
}
