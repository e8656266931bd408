// src/coupling.rs

//! Co-change coupling index.
//!
//! Every undirected edge is stored as two directed adjacency entries. Each
//! file's partner list is sorted once at build time, strongest first, so a
//! top-k query is a slice of the first k entries.

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::model::{CouplingEdge, FileChangeEvent};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// Partners above this strength count as strong.
pub const STRONG_COUPLING: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CouplingPartner {
    pub path: String,
    pub strength: f64,
    pub co_changes: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CouplingMetrics {
    pub max_strength: f64,
    pub avg_strength: f64,
    pub total_partners: usize,
    pub strong_partner_count: usize,
}

impl CouplingMetrics {
    fn from_partners(partners: &[CouplingPartner]) -> Self {
        if partners.is_empty() {
            return Self::default();
        }
        let sum: f64 = partners.iter().map(|p| p.strength).sum();
        Self {
            // Lists are sorted strongest first.
            max_strength: partners[0].strength,
            avg_strength: sum / partners.len() as f64,
            total_partners: partners.len(),
            strong_partner_count: partners.iter().filter(|p| p.strength > STRONG_COUPLING).count(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CouplingIndex {
    partners: HashMap<String, Vec<CouplingPartner>>,
    metrics: HashMap<String, CouplingMetrics>,
    /// Edges rejected at build time (self-edges, non-finite strength)
    pub dropped_edges: usize,
}

impl CouplingIndex {
    /// The `k` strongest partners of `path`; empty for files without edges.
    pub fn top_partners(&self, path: &str, k: usize) -> &[CouplingPartner] {
        match self.partners.get(path) {
            Some(list) => &list[..k.min(list.len())],
            None => &[],
        }
    }

    /// Partners whose strength is strictly above `threshold`, strongest first.
    pub fn partners_above<'a>(&'a self, path: &str, threshold: f64) -> impl Iterator<Item = &'a CouplingPartner> + 'a {
        self.top_partners(path, usize::MAX)
            .iter()
            .take_while(move |p| p.strength > threshold)
    }

    /// Cached metrics of `path`; all zeros for files without edges.
    pub fn metrics(&self, path: &str) -> CouplingMetrics {
        self.metrics.get(path).copied().unwrap_or_default()
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.partners.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.partners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }
}

fn insert_directed(
    adjacency: &mut HashMap<String, Vec<CouplingPartner>>,
    from: &str,
    to: &str,
    strength: f64,
    co_changes: usize,
) {
    adjacency.entry(from.to_string()).or_default().push(CouplingPartner {
        path: to.to_string(),
        strength,
        co_changes,
    });
}

/// Builds the index from a list of weighted edges.
///
/// Duplicate edges for the same pair keep the stronger one.
pub fn build_index(edges: &[CouplingEdge], cancel: &CancelToken) -> Result<CouplingIndex> {
    let mut dropped_edges = 0;
    let mut unique: HashMap<(&str, &str), (f64, usize)> = HashMap::with_capacity(edges.len());

    for (i, edge) in edges.iter().enumerate() {
        cancel.check_every(i)?;
        if edge.source == edge.target || !edge.strength.is_finite() {
            dropped_edges += 1;
            continue;
        }
        let strength = edge.strength.clamp(0.0, 1.0);
        let key = if edge.source < edge.target {
            (edge.source.as_str(), edge.target.as_str())
        } else {
            (edge.target.as_str(), edge.source.as_str())
        };
        let slot = unique.entry(key).or_insert((strength, edge.co_changes));
        if strength > slot.0 {
            *slot = (strength, edge.co_changes);
        }
    }

    let mut partners: HashMap<String, Vec<CouplingPartner>> = HashMap::new();
    for (i, ((a, b), (strength, co_changes))) in unique.into_iter().enumerate() {
        cancel.check_every(i)?;
        insert_directed(&mut partners, a, b, strength, co_changes);
        insert_directed(&mut partners, b, a, strength, co_changes);
    }

    cancel.check()?;
    partners.par_iter_mut().for_each(|(_, list)| {
        list.sort_by(|x, y| y.strength.total_cmp(&x.strength).then_with(|| x.path.cmp(&y.path)));
    });
    let metrics = partners
        .par_iter()
        .map(|(path, list)| (path.clone(), CouplingMetrics::from_partners(list)))
        .collect();

    if dropped_edges > 0 {
        warn!(dropped_edges, "dropped invalid coupling edges");
    }
    debug!(files = partners.len(), edges = edges.len(), "coupling index built");

    Ok(CouplingIndex { partners, metrics, dropped_edges })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeOptions {
    /// Minimum number of shared commits for a pair to become an edge
    pub min_co_changes: usize,
    /// Commits touching more files than this are ignored (mass reformatting,
    /// vendoring, ...)
    pub max_files_per_commit: usize,
}

impl Default for EdgeOptions {
    fn default() -> Self {
        Self { min_co_changes: 2, max_files_per_commit: 50 }
    }
}

/// Derives co-change edges from a flat event stream.
///
/// `strength = co_changes / max(changes_a, changes_b)`, where a file's change
/// count is the number of distinct commits touching it.
pub fn derive_edges(
    events: &[FileChangeEvent],
    options: &EdgeOptions,
    cancel: &CancelToken,
) -> Result<Vec<CouplingEdge>> {
    let mut commits: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for (i, event) in events.iter().enumerate() {
        cancel.check_every(i)?;
        commits.entry(&event.commit).or_default().insert(&event.path);
    }

    let mut changes: HashMap<&str, usize> = HashMap::new();
    let mut pairs: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    let mut skipped = 0;
    for (i, files) in commits.values().enumerate() {
        cancel.check_every(i)?;
        for &file in files {
            *changes.entry(file).or_default() += 1;
        }
        if files.len() > options.max_files_per_commit {
            skipped += 1;
            continue;
        }
        let files: Vec<&str> = files.iter().copied().collect();
        for (j, &a) in files.iter().enumerate() {
            for &b in &files[j + 1..] {
                *pairs.entry((a, b)).or_default() += 1;
            }
        }
    }
    if skipped > 0 {
        debug!(skipped, "ignored oversized commits for coupling");
    }

    let edges = pairs
        .into_iter()
        .filter(|&(_, count)| count >= options.min_co_changes.max(1))
        .map(|((a, b), count)| {
            let count_of = |file: &str| changes.get(file).copied().unwrap_or(0);
            let denominator = count_of(a).max(count_of(b)).max(1);
            CouplingEdge {
                source: a.to_string(),
                target: b.to_string(),
                strength: count as f64 / denominator as f64,
                co_changes: count,
            }
        })
        .collect();
    Ok(edges)
}
