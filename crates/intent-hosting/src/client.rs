//! Hosting client trait definitions for Intent Layer
//!
//! `HostingClient` is the only way the core talks to the platform:
//! - repository contents (read, conditional create/update, conditional delete)
//! - commit parents and tree listings
//! - pull-request file lists and issue comments
//!
//! The trait is async and backend-agnostic. An in-memory fake is provided
//! for testing via the `fakes` module; `github::GitHubClient` talks REST.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HostingError;

/// Result type for hosting operations
pub type HostingResult<T> = std::result::Result<T, HostingError>;

// ---------------------------------------------------------------------------
// Repository contents
// ---------------------------------------------------------------------------

/// A file as stored on a ref.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    /// Repository-relative path
    pub path: String,
    /// Decoded UTF-8 content (empty for symlinks)
    pub content: String,
    /// Blob SHA, used as the optimistic-concurrency token on writes
    pub sha: String,
    /// Raw link target when the entry is a symlink
    pub symlink_target: Option<String>,
}

/// Commit metadata needed for reverts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    pub parents: Vec<String>,
}

impl CommitInfo {
    /// First parent, the pre-change state for a contents-API commit.
    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }
}

/// Kind of a tree entry, derived from the git file mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeEntryKind {
    File,
    Symlink,
    Directory,
    Submodule,
}

impl TreeEntryKind {
    /// Map a git mode string (`100644`, `120000`, ...) to a kind.
    pub fn from_mode(mode: &str) -> Self {
        match mode {
            "120000" => TreeEntryKind::Symlink,
            "040000" | "40000" => TreeEntryKind::Directory,
            "160000" => TreeEntryKind::Submodule,
            _ => TreeEntryKind::File,
        }
    }
}

/// One entry of a recursive tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub kind: TreeEntryKind,
    pub sha: String,
}

// ---------------------------------------------------------------------------
// Pull request diff
// ---------------------------------------------------------------------------

/// Change status of a file in a pull request, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Added,
    Modified,
    Removed,
    Renamed,
    Copied,
    Changed,
    Unchanged,
}

/// One changed file in a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    #[serde(alias = "filename")]
    pub path: String,
    pub status: ChangeStatus,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(
        default,
        alias = "previous_filename",
        skip_serializing_if = "Option::is_none"
    )]
    pub previous_path: Option<String>,
}

impl DiffEntry {
    pub fn new(path: impl Into<String>, status: ChangeStatus) -> Self {
        Self {
            path: path.into(),
            status,
            additions: 0,
            deletions: 0,
            previous_path: None,
        }
    }

    /// Set line counts.
    pub fn with_lines(mut self, additions: u64, deletions: u64) -> Self {
        self.additions = additions;
        self.deletions = deletions;
        self
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// An issue / pull-request comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub body: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// HostingClient
// ---------------------------------------------------------------------------

/// Hosting platform operations used by the core.
///
/// Guarantees expected from implementations:
/// - `get_content` returns `Ok(None)` for an absent path, never `NotFound`.
/// - `create_or_update_content` with `prior_sha = None` fails with
///   `Conflict` if the file exists; with a stale `prior_sha` it fails with
///   `Conflict`; with a `prior_sha` for an absent file it fails with `NotFound`.
/// - `delete_content` fails with `NotFound` if the file is absent.
/// - Every write returns the SHA of the commit it created.
#[async_trait]
pub trait HostingClient: Send + Sync {
    /// Read a file at a branch name or commit SHA.
    async fn get_content(&self, path: &str, git_ref: &str) -> HostingResult<Option<FileContent>>;

    /// Create or update a file on a branch, returning the new commit SHA.
    async fn create_or_update_content(
        &self,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
        prior_sha: Option<&str>,
    ) -> HostingResult<String>;

    /// Delete a file on a branch, returning the new commit SHA.
    async fn delete_content(
        &self,
        path: &str,
        message: &str,
        branch: &str,
        prior_sha: &str,
    ) -> HostingResult<String>;

    /// Fetch a commit and its parents.
    async fn get_commit(&self, sha: &str) -> HostingResult<CommitInfo>;

    /// Recursive tree listing of a ref (blobs and links only).
    async fn list_tree(&self, git_ref: &str) -> HostingResult<Vec<TreeEntry>>;

    /// Changed files of a pull request.
    async fn list_pull_request_files(&self, pr_number: u64) -> HostingResult<Vec<DiffEntry>>;

    /// All comments on a pull request, oldest first.
    async fn list_comments(&self, pr_number: u64) -> HostingResult<Vec<Comment>>;

    /// A single comment by id.
    async fn get_comment(&self, comment_id: u64) -> HostingResult<Comment>;

    /// Post a new comment.
    async fn create_comment(&self, pr_number: u64, body: &str) -> HostingResult<Comment>;

    /// Replace a comment body.
    async fn update_comment(&self, comment_id: u64, body: &str) -> HostingResult<Comment>;
}

#[async_trait]
impl<T: HostingClient + ?Sized> HostingClient for Arc<T> {
    async fn get_content(&self, path: &str, git_ref: &str) -> HostingResult<Option<FileContent>> {
        (**self).get_content(path, git_ref).await
    }

    async fn create_or_update_content(
        &self,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
        prior_sha: Option<&str>,
    ) -> HostingResult<String> {
        (**self)
            .create_or_update_content(path, content, message, branch, prior_sha)
            .await
    }

    async fn delete_content(
        &self,
        path: &str,
        message: &str,
        branch: &str,
        prior_sha: &str,
    ) -> HostingResult<String> {
        (**self)
            .delete_content(path, message, branch, prior_sha)
            .await
    }

    async fn get_commit(&self, sha: &str) -> HostingResult<CommitInfo> {
        (**self).get_commit(sha).await
    }

    async fn list_tree(&self, git_ref: &str) -> HostingResult<Vec<TreeEntry>> {
        (**self).list_tree(git_ref).await
    }

    async fn list_pull_request_files(&self, pr_number: u64) -> HostingResult<Vec<DiffEntry>> {
        (**self).list_pull_request_files(pr_number).await
    }

    async fn list_comments(&self, pr_number: u64) -> HostingResult<Vec<Comment>> {
        (**self).list_comments(pr_number).await
    }

    async fn get_comment(&self, comment_id: u64) -> HostingResult<Comment> {
        (**self).get_comment(comment_id).await
    }

    async fn create_comment(&self, pr_number: u64, body: &str) -> HostingResult<Comment> {
        (**self).create_comment(pr_number, body).await
    }

    async fn update_comment(&self, comment_id: u64, body: &str) -> HostingResult<Comment> {
        (**self).update_comment(comment_id, body).await
    }
}
