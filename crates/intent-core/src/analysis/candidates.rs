//! Update-candidate decisions.
//!
//! Direct candidates are the nearest covering nodes of non-ignored changed
//! files, never their ancestors. Ancestors are handled by a separate,
//! conservative parent-review pass that only recommends an update once an
//! explicit threshold is crossed.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use super::aggregate::{ChangedFileCoverage, CoverageKey, CoverageMap};
use crate::config::ParentReviewThresholds;
use crate::domain::{ChangeStatus, DiffEntry};
use crate::hierarchy::IntentHierarchy;

/// Standard reason for a parent that does not need review.
pub const LOCALIZED_CHANGES_REASON: &str =
    "Changes are localized to child nodes; parent documentation is likely still accurate";

/// Per-status file counts and line totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
    pub renamed: usize,
    pub total_additions: u64,
    pub total_deletions: u64,
}

impl ChangeSummary {
    pub fn record(&mut self, entry: &DiffEntry) {
        match entry.status {
            ChangeStatus::Added => self.added += 1,
            ChangeStatus::Removed => self.removed += 1,
            ChangeStatus::Renamed => self.renamed += 1,
            ChangeStatus::Modified
            | ChangeStatus::Copied
            | ChangeStatus::Changed
            | ChangeStatus::Unchanged => self.modified += 1,
        }
        self.total_additions += entry.additions;
        self.total_deletions += entry.deletions;
    }

    pub fn total_files(&self) -> usize {
        self.added + self.modified + self.removed + self.renamed
    }

    /// Files added plus files removed.
    pub fn structural_changes(&self) -> usize {
        self.added + self.removed
    }
}

/// A node whose own directory tree saw non-ignored changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeUpdateCandidate {
    pub node_path: String,
    pub directory: String,
    pub depth: usize,
    /// Other-kind file managed alongside this node
    pub companion: Option<String>,
    /// Non-ignored files this node is the nearest cover of
    pub changed_files: Vec<ChangedFileCoverage>,
    pub summary: ChangeSummary,
}

/// An ancestor of one or more direct candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentReviewCandidate {
    pub node_path: String,
    pub depth: usize,
    /// Direct candidates anywhere beneath this node
    pub updated_children: Vec<String>,
    pub total_changed_files: usize,
    pub structural_changes: usize,
    pub total_additions: u64,
    pub total_deletions: u64,
    pub recommend_update: bool,
    pub recommendation_reason: String,
}

/// Build direct candidates, sorted by node path.
///
/// A node with only ignored files mapped to it produces no candidate.
pub fn direct_candidates(map: &CoverageMap, hierarchy: &IntentHierarchy) -> Vec<NodeUpdateCandidate> {
    let mut candidates = Vec::new();

    for (key, files) in &map.groups {
        let CoverageKey::Node(path) = key else {
            continue;
        };
        let changed: Vec<ChangedFileCoverage> =
            files.iter().filter(|f| !f.is_ignored).cloned().collect();
        if changed.is_empty() {
            debug!(node = %path, "only ignored files changed; no candidate");
            continue;
        }
        let Some(node) = hierarchy.by_path(path) else {
            warn!(node = %path, "coverage refers to a node missing from the hierarchy");
            continue;
        };

        let mut summary = ChangeSummary::default();
        for file in &changed {
            summary.record(&file.entry);
        }
        candidates.push(NodeUpdateCandidate {
            node_path: node.path.clone(),
            directory: node.directory.clone(),
            depth: node.depth,
            companion: node.companion.clone(),
            changed_files: changed,
            summary,
        });
    }

    candidates.sort_by(|a, b| a.node_path.cmp(&b.node_path));
    candidates
}

/// Build parent-review candidates, deepest first, then by path.
pub fn parent_review_candidates(
    direct: &[NodeUpdateCandidate],
    hierarchy: &IntentHierarchy,
    thresholds: &ParentReviewThresholds,
) -> Vec<ParentReviewCandidate> {
    let mut beneath: BTreeMap<&str, Vec<&NodeUpdateCandidate>> = BTreeMap::new();
    for candidate in direct {
        let Some(node) = hierarchy.by_path(&candidate.node_path) else {
            continue;
        };
        for ancestor in hierarchy.ancestors(node) {
            beneath.entry(&ancestor.path).or_default().push(candidate);
        }
    }

    let mut reviews: Vec<ParentReviewCandidate> = beneath
        .into_iter()
        .filter_map(|(path, children)| {
            let node = hierarchy.by_path(path)?;
            Some(review(node.path.clone(), node.depth, &children, thresholds))
        })
        .collect();

    reviews.sort_by(|a, b| b.depth.cmp(&a.depth).then_with(|| a.node_path.cmp(&b.node_path)));
    reviews
}

fn review(
    node_path: String,
    depth: usize,
    children: &[&NodeUpdateCandidate],
    thresholds: &ParentReviewThresholds,
) -> ParentReviewCandidate {
    let mut updated_children: Vec<String> = children.iter().map(|c| c.node_path.clone()).collect();
    updated_children.sort();

    let total_changed_files: usize = children.iter().map(|c| c.summary.total_files()).sum();
    let structural_changes: usize = children.iter().map(|c| c.summary.structural_changes()).sum();
    let total_additions = children.iter().map(|c| c.summary.total_additions).sum();
    let total_deletions = children.iter().map(|c| c.summary.total_deletions).sum();

    let reason = if updated_children.len() >= thresholds.min_children {
        Some(format!(
            "{} child nodes were updated, indicating a cross-cutting change",
            updated_children.len()
        ))
    } else if structural_changes >= thresholds.min_structural_changes {
        Some(format!(
            "{structural_changes} files were added or removed across child nodes, indicating a structural change"
        ))
    } else if total_changed_files >= thresholds.min_changed_files {
        Some(format!(
            "{total_changed_files} files changed across child nodes"
        ))
    } else {
        None
    };

    ParentReviewCandidate {
        node_path,
        depth,
        updated_children,
        total_changed_files,
        structural_changes,
        total_additions,
        total_deletions,
        recommend_update: reason.is_some(),
        recommendation_reason: reason.unwrap_or_else(|| LOCALIZED_CHANGES_REASON.to_string()),
    }
}
