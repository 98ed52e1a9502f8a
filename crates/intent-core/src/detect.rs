//! Intent file detection on a remote ref or a local checkout.

use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use ignore::WalkBuilder;
use intent_hosting::{HostingClient, TreeEntry, TreeEntryKind};
use tracing::{debug, info, warn};

use crate::domain::{FileSelection, IntentError, IntentFile, IntentFileKind, IntentResult};

/// Intent files found in a tree listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeScan {
    pub files: Vec<IntentFile>,
    /// Symlinked intent files whose targets still have to be read
    pub unresolved_links: Vec<String>,
}

fn selected(path: &str, selection: FileSelection) -> bool {
    IntentFileKind::from_path(path).is_some_and(|kind| selection.includes(kind))
}

/// Pick intent files out of a recursive tree listing.
pub fn detect_from_tree(entries: &[TreeEntry], selection: FileSelection) -> TreeScan {
    let mut scan = TreeScan::default();
    for entry in entries {
        if !selected(&entry.path, selection) {
            continue;
        }
        match entry.kind {
            TreeEntryKind::File => scan.files.extend(IntentFile::new(entry.path.clone())),
            TreeEntryKind::Symlink => scan.unresolved_links.push(entry.path.clone()),
            TreeEntryKind::Directory | TreeEntryKind::Submodule => {}
        }
    }
    scan
}

/// Detect intent files on `git_ref`, reading symlink targets concurrently.
pub async fn detect_remote<C>(
    client: &C,
    git_ref: &str,
    selection: FileSelection,
) -> IntentResult<Vec<IntentFile>>
where
    C: HostingClient + ?Sized,
{
    let entries = client.list_tree(git_ref).await?;
    let TreeScan {
        mut files,
        unresolved_links,
    } = detect_from_tree(&entries, selection);

    let links = unresolved_links.iter().map(|path| async move {
        let content = client
            .get_content(path, git_ref)
            .await?
            .ok_or_else(|| IntentError::NotFound(path.clone()))?;
        let file = IntentFile::new(path.clone())
            .ok_or_else(|| IntentError::MalformedInput(format!("{path} is not an intent file")))?;
        Ok::<_, IntentError>(match content.symlink_target {
            Some(target) => file.with_symlink_target(target),
            None => file,
        })
    });
    files.extend(try_join_all(links).await?);
    files.sort_by(|a, b| a.path.cmp(&b.path));

    info!(git_ref, count = files.len(), "detected intent files");
    Ok(files)
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

/// Detect intent files in a local checkout. Honours `.gitignore` and skips
/// hidden directories; symlinks are reported with their raw targets.
pub fn detect_local(root: &Path, selection: FileSelection) -> IntentResult<Vec<IntentFile>> {
    if !root.is_dir() {
        return Err(IntentError::NotFound(root.display().to_string()));
    }

    let mut files = Vec::new();
    let mut builder = WalkBuilder::new(root);
    builder.hidden(true).git_ignore(true).git_exclude(true);

    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "failed to read entry");
                continue;
            }
        };
        let Some(path) = relative_path(root, entry.path()) else {
            continue;
        };
        if !selected(&path, selection) {
            continue;
        }

        if entry.path_is_symlink() {
            let target: PathBuf = std::fs::read_link(entry.path())?;
            let Some(file) = IntentFile::new(path) else {
                continue;
            };
            debug!(path = %file.path, target = %target.display(), "found symlinked intent file");
            files.push(file.with_symlink_target(target.to_string_lossy()));
        } else if entry.file_type().is_some_and(|t| t.is_file()) {
            files.extend(IntentFile::new(path));
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    info!(root = %root.display(), count = files.len(), "detected local intent files");
    Ok(files)
}
