//! Source/symlink pairing between the two intent file kinds.
//!
//! When a directory holds both `AGENTS.md` and `CLAUDE.md`, one of them
//! must be a symlink to the other for symlink mode to work. Two regular
//! files side by side would be two sources of truth for the same directory.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::domain::{file_name, parent_dir, IntentError, IntentFile, IntentFileKind, IntentResult};

/// A recognised pair in one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymlinkRelationship {
    pub directory: String,
    /// File holding the real content
    pub source: String,
    /// File that links to `source`
    pub symlink: String,
    pub source_kind: IntentFileKind,
}

/// Both kinds present in a directory without a recognised link between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymlinkConflict {
    pub directory: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymlinkValidation {
    pub valid: bool,
    pub relationships: Vec<SymlinkRelationship>,
    pub conflicts: Vec<SymlinkConflict>,
}

impl SymlinkValidation {
    /// Directories in conflict, in path order.
    pub fn conflicting_directories(&self) -> Vec<String> {
        self.conflicts.iter().map(|c| c.directory.clone()).collect()
    }

    pub fn relationship_for(&self, directory: &str) -> Option<&SymlinkRelationship> {
        self.relationships.iter().find(|r| r.directory == directory)
    }
}

/// Reduce a raw link target to a bare file name in `directory`.
///
/// Accepts `X`, `./X` and `<directory>/X`. Anything pointing elsewhere
/// returns `None`.
pub fn normalize_link_target<'a>(target: &'a str, directory: &str) -> Option<&'a str> {
    let target = target.trim();
    let target = target.strip_prefix("./").unwrap_or(target);
    if !target.contains('/') {
        return Some(target);
    }
    if !directory.is_empty() && parent_dir(target) == directory {
        return Some(file_name(target));
    }
    None
}

fn links_to(file: &IntentFile, other: &IntentFile) -> bool {
    file.symlink_target
        .as_deref()
        .and_then(|t| normalize_link_target(t, file.directory()))
        .is_some_and(|name| name == file_name(&other.path))
}

/// Classify every directory holding both kinds.
pub fn resolve_symlinks(files: &[IntentFile]) -> SymlinkValidation {
    let mut by_dir: BTreeMap<&str, [Option<&IntentFile>; 2]> = BTreeMap::new();
    for file in files {
        let slot = match file.kind {
            IntentFileKind::Agents => 0,
            IntentFileKind::Claude => 1,
        };
        by_dir.entry(file.directory()).or_default()[slot] = Some(file);
    }

    let mut result = SymlinkValidation::default();
    for (directory, pair) in by_dir {
        let [Some(agents), Some(claude)] = pair else {
            continue;
        };
        let relationship = if links_to(claude, agents) {
            Some((agents, claude))
        } else if links_to(agents, claude) {
            Some((claude, agents))
        } else {
            None
        };
        match relationship {
            Some((source, symlink)) => result.relationships.push(SymlinkRelationship {
                directory: directory.to_string(),
                source: source.path.clone(),
                symlink: symlink.path.clone(),
                source_kind: source.kind,
            }),
            None => result.conflicts.push(SymlinkConflict {
                directory: directory.to_string(),
                files: vec![agents.path.clone(), claude.path.clone()],
            }),
        }
    }
    result.valid = result.conflicts.is_empty();
    result
}

/// Structured validation. With symlink mode off nothing is checked and the
/// result is always valid.
pub fn validate_symlinks(files: &[IntentFile], symlink_enabled: bool) -> SymlinkValidation {
    let mut result = resolve_symlinks(files);
    if !symlink_enabled {
        result.conflicts.clear();
        result.valid = true;
        return result;
    }
    for conflict in &result.conflicts {
        warn!(directory = %conflict.directory, "both intent files exist as independent files");
    }
    result
}

/// Like [`validate_symlinks`], but fails with every conflicting directory.
pub fn ensure_symlinks_valid(
    files: &[IntentFile],
    symlink_enabled: bool,
) -> IntentResult<Vec<SymlinkRelationship>> {
    let result = validate_symlinks(files, symlink_enabled);
    if result.valid {
        Ok(result.relationships)
    } else {
        Err(IntentError::SymlinkConflict {
            directories: result.conflicting_directories(),
        })
    }
}
