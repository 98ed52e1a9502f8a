//! Intent hierarchy: a directory-keyed tree of intent nodes.
//!
//! Nodes live in an arena (`Vec<IntentNode>`) and refer to each other by
//! [`NodeId`]. Lookups go through two indexes: by file path and by
//! directory. Directories are unique keys, so a second intent file of the
//! other kind in an already-registered directory is recorded as that node's
//! `companion` rather than as a separate node.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::domain::{parent_dir, path_depth, IntentFile, IntentFileKind};

/// Index of a node inside its [`IntentHierarchy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

/// One intent file placed in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentNode {
    /// Repository-relative file path (unique key)
    pub path: String,
    /// Directory the node documents; `""` for the repository root
    pub directory: String,
    /// Number of segments in `path`
    pub depth: usize,
    pub kind: IntentFileKind,
    /// The other-kind intent file in the same directory, if any
    pub companion: Option<String>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Immutable tree of intent nodes, rebuilt for every analysis run.
#[derive(Debug, Clone, Default)]
pub struct IntentHierarchy {
    nodes: Vec<IntentNode>,
    roots: Vec<NodeId>,
    by_path: HashMap<String, NodeId>,
    by_directory: HashMap<String, NodeId>,
    companions: HashMap<String, NodeId>,
}

impl IntentHierarchy {
    /// Build a hierarchy, preferring `AGENTS.md` as the node of a directory
    /// that holds both kinds.
    pub fn build<I>(files: I) -> Self
    where
        I: IntoIterator<Item = IntentFile>,
    {
        Self::build_with_primary(files, IntentFileKind::Agents)
    }

    /// Build a hierarchy, preferring `primary` as the node of a directory
    /// that holds both kinds.
    pub fn build_with_primary<I>(files: I, primary: IntentFileKind) -> Self
    where
        I: IntoIterator<Item = IntentFile>,
    {
        let mut files: Vec<IntentFile> = files.into_iter().collect();
        files.sort_by(|a, b| {
            path_depth(&a.path)
                .cmp(&path_depth(&b.path))
                .then_with(|| a.directory().cmp(b.directory()))
                .then_with(|| (a.kind != primary).cmp(&(b.kind != primary)))
                .then_with(|| a.path.cmp(&b.path))
        });

        let mut hierarchy = Self::default();
        for file in files {
            hierarchy.insert(file);
        }
        debug!(
            nodes = hierarchy.nodes.len(),
            roots = hierarchy.roots.len(),
            "built intent hierarchy"
        );
        hierarchy
    }

    fn insert(&mut self, file: IntentFile) {
        if self.by_path.contains_key(&file.path) || self.companions.contains_key(&file.path) {
            debug!(path = %file.path, "skipping duplicate intent file");
            return;
        }

        let directory = file.directory().to_string();
        if let Some(&existing) = self.by_directory.get(&directory) {
            let node = &mut self.nodes[existing.0];
            if node.kind != file.kind && node.companion.is_none() {
                node.companion = Some(file.path.clone());
                self.companions.insert(file.path, existing);
            }
            return;
        }

        let parent = self.nearest_above(&directory);
        let id = NodeId(self.nodes.len());
        self.nodes.push(IntentNode {
            depth: path_depth(&file.path),
            path: file.path.clone(),
            directory: directory.clone(),
            kind: file.kind,
            companion: None,
            parent,
            children: Vec::new(),
        });
        self.by_path.insert(file.path, id);
        self.by_directory.insert(directory, id);
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => self.roots.push(id),
        }
    }

    /// Deepest registered node strictly above `directory`.
    fn nearest_above(&self, directory: &str) -> Option<NodeId> {
        let mut dir = directory;
        while !dir.is_empty() {
            dir = parent_dir(dir);
            if let Some(&id) = self.by_directory.get(dir) {
                return Some(id);
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> &IntentNode {
        &self.nodes[id.0]
    }

    pub fn roots(&self) -> impl Iterator<Item = &IntentNode> {
        self.roots.iter().map(|id| self.get(*id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &IntentNode> {
        self.nodes.iter()
    }

    /// Id of the node stored at `path`.
    pub fn id_of(&self, path: &str) -> Option<NodeId> {
        self.by_path.get(path).copied()
    }

    pub fn by_path(&self, path: &str) -> Option<&IntentNode> {
        self.id_of(path).map(|id| self.get(id))
    }

    pub fn by_directory(&self, directory: &str) -> Option<&IntentNode> {
        self.by_directory.get(directory).map(|id| self.get(*id))
    }

    /// Node owning `path`, either as its own file or as its companion.
    pub fn owner_of(&self, path: &str) -> Option<&IntentNode> {
        self.by_path(path)
            .or_else(|| self.companions.get(path).map(|id| self.get(*id)))
    }

    pub fn parent(&self, node: &IntentNode) -> Option<&IntentNode> {
        node.parent.map(|id| self.get(id))
    }

    pub fn children<'a>(&'a self, node: &'a IntentNode) -> impl Iterator<Item = &'a IntentNode> {
        node.children.iter().map(|id| self.get(*id))
    }

    /// Ancestors of `node`, nearest first.
    pub fn ancestors<'a>(&'a self, node: &'a IntentNode) -> impl Iterator<Item = &'a IntentNode> {
        std::iter::successors(self.parent(node), move |n| self.parent(n))
    }

    /// Whether `ancestor` lies on the parent chain of `node`.
    pub fn is_ancestor(&self, ancestor: &IntentNode, node: &IntentNode) -> bool {
        self.ancestors(node).any(|a| a.path == ancestor.path)
    }
}
