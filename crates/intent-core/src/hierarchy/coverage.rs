//! Nearest-ancestor coverage lookup.

use super::tree::{IntentHierarchy, IntentNode};
use crate::domain::parent_dir;

impl IntentHierarchy {
    /// The node covering `path`: the one whose directory is the longest
    /// prefix of the file's directory, root directory included.
    ///
    /// Returns `None` when the file is uncovered.
    pub fn resolve_coverage(&self, path: &str) -> Option<&IntentNode> {
        let mut dir = parent_dir(path);
        loop {
            if let Some(node) = self.by_directory(dir) {
                return Some(node);
            }
            if dir.is_empty() {
                return None;
            }
            dir = parent_dir(dir);
        }
    }
}

/// Free-function form of [`IntentHierarchy::resolve_coverage`].
pub fn resolve_coverage<'a>(path: &str, hierarchy: &'a IntentHierarchy) -> Option<&'a IntentNode> {
    hierarchy.resolve_coverage(path)
}
