//! Change aggregation: map every changed file to its covering node.
//!
//! This is a pure transform. The ignore predicate is evaluated for every
//! file independently of coverage; it never changes which node a file is
//! recorded under, it only marks the file for downstream filtering.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::DiffEntry;
use crate::hierarchy::IntentHierarchy;
use crate::ignore_filter::IgnoreMatcher;

/// Grouping key: a covering node path, or the uncovered bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CoverageKey {
    Node(String),
    Uncovered,
}

/// One diff entry paired with its coverage resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedFileCoverage {
    pub entry: DiffEntry,
    /// Path of the nearest covering node, `None` when uncovered
    pub covering_node: Option<String>,
    pub is_ignored: bool,
}

impl ChangedFileCoverage {
    pub fn path(&self) -> &str {
        &self.entry.path
    }

    pub fn key(&self) -> CoverageKey {
        match &self.covering_node {
            Some(path) => CoverageKey::Node(path.clone()),
            None => CoverageKey::Uncovered,
        }
    }
}

/// Counts over one aggregation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoverageSummary {
    pub total_changed_files: usize,
    pub covered_files: usize,
    pub uncovered_files: usize,
    pub ignored_files: usize,
    /// Distinct covering nodes with at least one file (uncovered excluded)
    pub affected_nodes: usize,
}

/// Result of [`aggregate_changes`].
#[derive(Debug, Clone, Default)]
pub struct CoverageMap {
    /// Every changed file, in diff order
    pub files: Vec<ChangedFileCoverage>,
    /// Files grouped by covering node
    pub groups: BTreeMap<CoverageKey, Vec<ChangedFileCoverage>>,
    pub summary: CoverageSummary,
}

impl CoverageMap {
    /// Files recorded under a node, ignored ones included.
    pub fn for_node(&self, node_path: &str) -> &[ChangedFileCoverage] {
        self.groups
            .get(&CoverageKey::Node(node_path.to_string()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Files no node covers, ignored ones included.
    pub fn uncovered(&self) -> &[ChangedFileCoverage] {
        self.groups
            .get(&CoverageKey::Uncovered)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Resolve coverage for every diff entry and group the results.
pub fn aggregate_changes(
    entries: &[DiffEntry],
    hierarchy: &IntentHierarchy,
    ignore: Option<&dyn IgnoreMatcher>,
) -> CoverageMap {
    let mut map = CoverageMap::default();

    for entry in entries {
        let coverage = ChangedFileCoverage {
            covering_node: hierarchy
                .resolve_coverage(&entry.path)
                .map(|node| node.path.clone()),
            is_ignored: ignore.is_some_and(|m| m.ignores(&entry.path)),
            entry: entry.clone(),
        };

        map.summary.total_changed_files += 1;
        if coverage.covering_node.is_some() {
            map.summary.covered_files += 1;
        } else {
            map.summary.uncovered_files += 1;
        }
        if coverage.is_ignored {
            map.summary.ignored_files += 1;
        }

        map.groups
            .entry(coverage.key())
            .or_default()
            .push(coverage.clone());
        map.files.push(coverage);
    }

    map.summary.affected_nodes = map
        .groups
        .keys()
        .filter(|k| matches!(k, CoverageKey::Node(_)))
        .count();
    map
}
