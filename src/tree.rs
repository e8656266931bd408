// src/tree.rs

//! Single-pass directory tree construction.
//!
//! Each unique path is split and resolved to its chain of node ids once; the
//! chain is memoized in a `PathCache` owned by the builder, so folding a
//! repeated path only walks the cached ids to bump counters. File counts are
//! summed bottom-up in one final pass.

use crate::error::StrataError;
use crate::model::FileChangeEvent;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Uniquely identifies a node within one tree
pub type NodeId = usize;

pub const ROOT_ID: NodeId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Directory,
    File,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryNode {
    pub id: NodeId,
    /// Last path segment; empty for the root
    pub name: String,
    /// Full path from the repository root; empty for the root
    pub path: String,
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
    /// Events that touched this node or anything below it
    pub event_count: usize,
    /// Distinct files at or below this node
    pub file_count: usize,
}

impl DirectoryNode {
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}

#[derive(Debug, Serialize)]
pub struct DirectoryTree {
    nodes: Vec<DirectoryNode>,
    #[serde(skip)]
    index: HashMap<String, NodeId>,
    /// Paths that were seen both as a file and as a directory
    #[serde(skip)]
    pub ambiguities: Vec<StrataError>,
}

impl DirectoryTree {
    pub fn root(&self) -> &DirectoryNode {
        &self.nodes[ROOT_ID]
    }

    pub fn node(&self, id: NodeId) -> Option<&DirectoryNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[DirectoryNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn id_of(&self, path: &str) -> Option<NodeId> {
        self.index.get(path).copied()
    }

    /// The directory a file path is attributed to: its immediate parent, or
    /// the root for top-level files. Paths are trimmed of `/` the same way
    /// the builder trims them.
    pub fn directory_of(&self, file_path: &str) -> Option<NodeId> {
        match file_path.trim_matches('/').rsplit_once('/') {
            Some((parent, _)) => self.id_of(parent).filter(|&id| self.nodes[id].is_dir()),
            None => Some(ROOT_ID),
        }
    }
}

/// Scoped memo of path -> node chain (root excluded, leaf last).
#[derive(Debug, Default)]
struct PathCache {
    chains: HashMap<String, Vec<NodeId>>,
}

pub struct TreeBuilder {
    nodes: Vec<DirectoryNode>,
    parents: Vec<NodeId>,
    index: HashMap<String, NodeId>,
    cache: PathCache,
    ambiguities: Vec<StrataError>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        let root = DirectoryNode {
            id: ROOT_ID,
            name: String::new(),
            path: String::new(),
            kind: NodeKind::Directory,
            children: Vec::new(),
            event_count: 0,
            file_count: 0,
        };
        let mut index = HashMap::new();
        index.insert(String::new(), ROOT_ID);
        Self {
            nodes: vec![root],
            parents: vec![ROOT_ID],
            index,
            cache: PathCache::default(),
            ambiguities: Vec::new(),
        }
    }

    /// Folds one occurrence of a file path into the tree.
    pub fn add_path(&mut self, path: &str) {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return;
        }
        if !self.cache.chains.contains_key(path) {
            let chain = self.resolve(path);
            self.cache.chains.insert(path.to_string(), chain);
        }

        self.nodes[ROOT_ID].event_count += 1;
        if let Some(chain) = self.cache.chains.get(path) {
            for &id in chain {
                self.nodes[id].event_count += 1;
            }
        }
    }

    /// Splits `path` once and creates whatever ancestors are missing.
    fn resolve(&mut self, path: &str) -> Vec<NodeId> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut chain = Vec::with_capacity(segments.len());
        let mut parent = ROOT_ID;
        let mut prefix_end = 0;

        for (depth, segment) in segments.iter().enumerate() {
            let is_leaf = depth + 1 == segments.len();
            let start = path[prefix_end..].find(segment).map_or(prefix_end, |i| prefix_end + i);
            prefix_end = start + segment.len();
            let prefix = &path[..prefix_end];

            let id = match self.index.get(prefix) {
                Some(&id) => {
                    let node = &mut self.nodes[id];
                    if !is_leaf && node.kind == NodeKind::File {
                        // A previously seen file now has descendants.
                        node.kind = NodeKind::Directory;
                        self.flag_ambiguity(prefix);
                    } else if is_leaf && node.kind == NodeKind::Directory {
                        self.flag_ambiguity(prefix);
                    }
                    id
                }
                None => {
                    let kind = if is_leaf { NodeKind::File } else { NodeKind::Directory };
                    self.create(parent, segment, prefix, kind)
                }
            };
            chain.push(id);
            parent = id;
        }
        chain
    }

    fn create(&mut self, parent: NodeId, name: &str, path: &str, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(DirectoryNode {
            id,
            name: name.to_string(),
            path: path.to_string(),
            kind,
            children: Vec::new(),
            event_count: 0,
            file_count: 0,
        });
        self.parents.push(parent);
        self.nodes[parent].children.push(id);
        self.index.insert(path.to_string(), id);
        id
    }

    fn flag_ambiguity(&mut self, path: &str) {
        warn!(path, "path used as both file and directory, treating it as a directory");
        self.ambiguities.push(StrataError::DataAmbiguity { path: path.to_string() });
    }

    /// Sums file counts bottom-up and orders children by name.
    pub fn finish(mut self) -> DirectoryTree {
        for node in &mut self.nodes {
            node.file_count = usize::from(node.kind == NodeKind::File);
        }
        // Children are always created after their parent, so reverse id order
        // visits every child before its parent.
        for id in (1..self.nodes.len()).rev() {
            let count = self.nodes[id].file_count;
            let parent = self.parents[id];
            self.nodes[parent].file_count += count;
        }

        let names: Vec<String> = self.nodes.iter().map(|n| n.name.clone()).collect();
        for node in &mut self.nodes {
            node.children.sort_by(|&a, &b| names[a].cmp(&names[b]));
        }

        debug!(
            nodes = self.nodes.len(),
            unique_paths = self.cache.chains.len(),
            files = self.nodes[ROOT_ID].file_count,
            "directory tree built"
        );

        DirectoryTree {
            nodes: self.nodes,
            index: self.index,
            ambiguities: self.ambiguities,
        }
    }
}

/// Builds the tree for a batch of events in one traversal.
pub fn build_tree(events: &[FileChangeEvent]) -> DirectoryTree {
    let mut builder = TreeBuilder::new();
    for event in events {
        builder.add_path(&event.path);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::event;
    use crate::model::ChangeStatus;

    fn tree_of(paths: &[&str]) -> DirectoryTree {
        let mut builder = TreeBuilder::new();
        for path in paths {
            builder.add_path(path);
        }
        builder.finish()
    }

    #[test]
    fn single_added_file() {
        let tree = build_tree(&[event("src/a.ts", ChangeStatus::Added, "c1", 0)]);

        let root = tree.root();
        assert_eq!(root.children.len(), 1);
        let src = tree.node(root.children[0]).unwrap();
        assert_eq!(src.path, "src");
        assert!(src.is_dir());
        assert_eq!(src.file_count, 1);

        let file = tree.node(src.children[0]).unwrap();
        assert_eq!(file.path, "src/a.ts");
        assert_eq!(file.kind, NodeKind::File);
        assert!(file.children.is_empty());
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn counts_events_along_the_chain() {
        let tree = tree_of(&["src/lib/a.rs", "src/lib/a.rs", "src/b.rs", "README.md"]);

        assert_eq!(tree.root().event_count, 4);
        assert_eq!(tree.root().file_count, 3);
        let src = tree.node(tree.id_of("src").unwrap()).unwrap();
        assert_eq!(src.event_count, 3);
        assert_eq!(src.file_count, 2);
        let lib = tree.node(tree.id_of("src/lib").unwrap()).unwrap();
        assert_eq!(lib.event_count, 2);
        assert_eq!(lib.file_count, 1);
    }

    #[test]
    fn children_sorted_by_name() {
        let tree = tree_of(&["z.rs", "b/x.rs", "a.rs"]);
        let names: Vec<&str> = tree
            .root()
            .children
            .iter()
            .map(|&id| tree.node(id).unwrap().name.as_str())
            .collect();
        assert_eq!(names, vec!["a.rs", "b", "z.rs"]);
    }

    #[test]
    fn file_that_gains_children_becomes_directory() {
        let tree = tree_of(&["docs", "docs/guide.md"]);

        let docs = tree.node(tree.id_of("docs").unwrap()).unwrap();
        assert!(docs.is_dir());
        assert_eq!(docs.file_count, 1);
        assert_eq!(docs.event_count, 2);
        assert_eq!(tree.ambiguities.len(), 1);
        assert!(matches!(&tree.ambiguities[0], StrataError::DataAmbiguity { path } if path == "docs"));
    }

    #[test]
    fn directory_seen_as_file_stays_directory() {
        let tree = tree_of(&["docs/guide.md", "docs"]);
        let docs = tree.node(tree.id_of("docs").unwrap()).unwrap();
        assert!(docs.is_dir());
        assert_eq!(docs.event_count, 2);
        assert_eq!(tree.ambiguities.len(), 1);
    }

    #[test]
    fn directory_of_resolves_parent() {
        let tree = tree_of(&["src/a.rs", "top.rs"]);
        assert_eq!(tree.directory_of("src/a.rs"), tree.id_of("src"));
        assert_eq!(tree.directory_of("top.rs"), Some(ROOT_ID));
        assert_eq!(tree.directory_of("missing/a.rs"), None);
    }

    #[test]
    fn slash_wrapped_paths_resolve_like_the_builder() {
        let tree = tree_of(&["/src/a.rs", "top.rs/"]);
        assert!(tree.id_of("src/a.rs").is_some());
        assert_eq!(tree.directory_of("/src/a.rs"), tree.id_of("src"));
        assert_eq!(tree.directory_of("/top.rs"), Some(ROOT_ID));
    }

    #[test]
    fn repeated_segment_names_resolve_to_distinct_nodes() {
        let tree = tree_of(&["a/a/a.rs"]);
        assert!(tree.id_of("a").is_some());
        assert!(tree.id_of("a/a").is_some());
        assert_eq!(tree.node(tree.id_of("a/a/a.rs").unwrap()).unwrap().name, "a.rs");
        assert_eq!(tree.len(), 4);
    }
}
