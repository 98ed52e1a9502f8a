//! New-node candidates for directories no intent node covers.

use std::collections::BTreeMap;

use serde::Serialize;

use super::aggregate::{ChangedFileCoverage, CoverageMap};
use crate::domain::{join_path, parent_dir, ChangeStatus, IntentFileKind};
use crate::hierarchy::IntentHierarchy;

/// Confidence given to the single root candidate of an empty hierarchy.
pub const INITIAL_ROOT_CONFIDENCE: f64 = 0.9;

const MAX_CONFIDENCE: f64 = 0.95;

/// A proposed intent file in a currently uncovered directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewNodeCandidate {
    pub node_path: String,
    pub directory: String,
    pub uncovered_files: Vec<String>,
    /// Heuristic in `[0, 1]`
    pub confidence: f64,
    pub reason: String,
}

/// Group uncovered, non-ignored files by directory.
///
/// With no intent layer at all, every such file is folded into one root
/// candidate instead.
pub fn new_node_candidates(
    map: &CoverageMap,
    hierarchy: &IntentHierarchy,
    kind: IntentFileKind,
) -> Vec<NewNodeCandidate> {
    let uncovered: Vec<&ChangedFileCoverage> =
        map.uncovered().iter().filter(|f| !f.is_ignored).collect();
    if uncovered.is_empty() {
        return Vec::new();
    }

    if hierarchy.is_empty() {
        return vec![NewNodeCandidate {
            node_path: kind.file_name().to_string(),
            directory: String::new(),
            uncovered_files: uncovered.iter().map(|f| f.path().to_string()).collect(),
            confidence: INITIAL_ROOT_CONFIDENCE,
            reason: format!(
                "No intent layer exists yet; initialize it with a root {} covering {} changed file(s)",
                kind.file_name(),
                uncovered.len()
            ),
        }];
    }

    let mut by_dir: BTreeMap<&str, Vec<&ChangedFileCoverage>> = BTreeMap::new();
    for file in uncovered {
        by_dir.entry(parent_dir(file.path())).or_default().push(file);
    }

    by_dir
        .into_iter()
        .map(|(dir, files)| {
            let added = files
                .iter()
                .filter(|f| f.entry.status == ChangeStatus::Added)
                .count();
            let confidence = confidence(files.len(), added);
            let location = if dir.is_empty() { "the repository root" } else { dir };
            NewNodeCandidate {
                node_path: join_path(dir, kind.file_name()),
                directory: dir.to_string(),
                uncovered_files: files.iter().map(|f| f.path().to_string()).collect(),
                confidence,
                reason: format!(
                    "{} changed file(s) in {location} are not covered by any intent node ({added} added)",
                    files.len()
                ),
            }
        })
        .collect()
}

fn confidence(files: usize, added: usize) -> f64 {
    let base = match files {
        0 | 1 => 0.3,
        2 => 0.45,
        3 | 4 => 0.6,
        _ => 0.75,
    };
    let bonus = if added * 2 >= files { 0.15 } else { 0.0 };
    f64::min(base + bonus, MAX_CONFIDENCE)
}
