use git_strata::cancel::CancelToken;
use git_strata::coupling::build_index;
use git_strata::health::{self, churn_score, HealthInputs, OperationCounts};
use git_strata::lifecycle::FileLifecycle;
use git_strata::temporal::{enrich, DateRange, EnrichedFile, ScrubberPosition};
use git_strata::time_bin::{bin_start, enumerate_bins, Granularity};
use git_strata::tree::{NodeKind, TreeBuilder};
use git_strata::CouplingEdge;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

fn granularity() -> impl Strategy<Value = Granularity> {
    prop_oneof![
        Just(Granularity::Day),
        Just(Granularity::Week),
        Just(Granularity::Month),
        Just(Granularity::Quarter),
        Just(Granularity::Year),
    ]
}

/// Paths whose directory segments never collide with file names.
fn file_path() -> impl Strategy<Value = String> {
    (prop::collection::vec("[a-d]", 0..4), "[a-e]").prop_map(|(dirs, file)| {
        let mut parts = dirs;
        parts.push(format!("{}.rs", file));
        parts.join("/")
    })
}

const THREE_YEARS: i64 = 3 * 366 * 86_400;

proptest! {
    /// Property: file counts add up bottom-up and match the distinct paths.
    #[test]
    fn tree_file_counts_are_consistent(paths in prop::collection::vec(file_path(), 0..60)) {
        let mut builder = TreeBuilder::new();
        for path in &paths {
            builder.add_path(path);
        }
        let tree = builder.finish();

        let distinct: HashSet<&String> = paths.iter().collect();
        prop_assert_eq!(tree.root().file_count, distinct.len());
        prop_assert_eq!(tree.root().event_count, paths.len());
        prop_assert!(tree.ambiguities.is_empty());

        for node in tree.nodes() {
            match node.kind {
                NodeKind::File => {
                    prop_assert!(node.children.is_empty());
                    prop_assert_eq!(node.file_count, 1);
                }
                NodeKind::Directory => {
                    let sum: usize = node.children.iter().map(|&c| tree.node(c).unwrap().file_count).sum();
                    prop_assert_eq!(node.file_count, sum);
                }
            }
        }
    }

    /// Property: bins are ascending, unique, and cover every timestamp in range.
    #[test]
    fn enumerated_bins_cover_range(
        start in 0i64..4_000_000_000,
        span in 0i64..THREE_YEARS,
        offsets in prop::collection::vec(0.0f64..=1.0, 1..20),
        granularity in granularity(),
    ) {
        let end = start + span;
        let bins = enumerate_bins(start, end, granularity).unwrap();

        prop_assert!(!bins.is_empty());
        prop_assert!(bins.windows(2).all(|w| w[0] < w[1]));

        let members: HashSet<i64> = bins.iter().copied().collect();
        for offset in offsets {
            let ts = start + (span as f64 * offset) as i64;
            prop_assert!(members.contains(&bin_start(ts, granularity).unwrap()));
        }
    }

    /// Property: bin_start is idempotent and never after the timestamp.
    #[test]
    fn bin_start_is_idempotent(ts in -2_000_000_000i64..4_000_000_000, granularity in granularity()) {
        let start = bin_start(ts, granularity).unwrap();
        prop_assert!(start <= ts);
        prop_assert_eq!(bin_start(start, granularity).unwrap(), start);
    }

    /// Property: every edge is visible from both endpoints with its strength.
    #[test]
    fn coupling_is_symmetric(
        raw in prop::collection::vec((0usize..8, 0usize..8, 0.0f64..=1.0, 1usize..50), 0..40)
    ) {
        // Keep one edge per unordered pair so strengths are unambiguous.
        let mut pairs: HashMap<(usize, usize), (f64, usize)> = HashMap::new();
        for (a, b, strength, count) in raw {
            if a != b {
                pairs.entry((a.min(b), a.max(b))).or_insert((strength, count));
            }
        }
        let edges: Vec<CouplingEdge> = pairs
            .iter()
            .map(|(&(a, b), &(strength, co_changes))| CouplingEdge {
                source: format!("f{}", a),
                target: format!("f{}", b),
                strength,
                co_changes,
            })
            .collect();
        let index = build_index(&edges, &CancelToken::new()).unwrap();

        for edge in &edges {
            let forward = index.top_partners(&edge.source, usize::MAX);
            prop_assert!(forward.iter().any(|p| p.path == edge.target && p.strength == edge.strength));
            let backward = index.top_partners(&edge.target, usize::MAX);
            prop_assert!(backward.iter().any(|p| p.path == edge.source && p.strength == edge.strength));
        }
        for file in index.files() {
            let list = index.top_partners(file, usize::MAX);
            prop_assert!(list.windows(2).all(|w| w[0].strength >= w[1].strength));
            prop_assert_eq!(index.metrics(file).total_partners, list.len());
        }
    }

    /// Property: past 70% churn the churn sub-score never increases.
    #[test]
    fn churn_score_non_increasing_past_seventy(a in 0.7f64..=1.0, b in 0.7f64..=1.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(churn_score(high) <= churn_score(low));
    }

    /// Property: composite score stays within [0, 100].
    #[test]
    fn health_score_in_bounds(
        m in 0usize..500,
        a in 0usize..500,
        d in 0usize..500,
        r in 0usize..500,
        authors in 0usize..200,
        dormant in -100i64..10_000,
    ) {
        let result = health::score(&HealthInputs {
            total_commits: m + a + d + r,
            unique_authors: authors,
            operations: OperationCounts { modified: m, added: a, deleted: d, renamed: r },
            age_days: dormant.max(0),
            days_since_last_modified: dormant,
        });
        prop_assert!(result.score <= 100);
        prop_assert!((0.0..=1.0).contains(&result.churn_rate));
        prop_assert!(!health::insight(&result).is_empty());
    }

    /// Property: enrichment with identical inputs is byte-identical.
    #[test]
    fn temporal_enrich_is_idempotent(
        times in prop::collection::vec((0i64..1_000_000, 0i64..1_000_000), 0..20),
        scrubber in -10.0f64..110.0,
        now in 0i64..2_000_000,
    ) {
        let files: Vec<EnrichedFile> = times
            .iter()
            .enumerate()
            .map(|(i, &(created_at, modified))| {
                let lifecycle = FileLifecycle {
                    path: format!("f{}.rs", i),
                    created_at,
                    last_modified: created_at.max(modified),
                    deleted_at: None,
                    operations: OperationCounts { added: 1, ..OperationCounts::default() },
                    total_commits: 1,
                    unique_authors: 1,
                };
                let health = health::score(&lifecycle.health_inputs(now));
                EnrichedFile { lifecycle, health, insight: health::insight(&health) }
            })
            .collect();
        let range = DateRange::new(0, 500_000);
        let scrubber = ScrubberPosition::new(scrubber);

        let first = serde_json::to_vec(&enrich(&files, range, scrubber, now)).unwrap();
        let second = serde_json::to_vec(&enrich(&files, range, scrubber, now)).unwrap();
        prop_assert_eq!(first, second);
        for view in enrich(&files, range, scrubber, now) {
            prop_assert!((0.0..=100.0).contains(&view.created_position));
        }
    }
}
